mod candidate;
mod config;
mod format_detection;
mod lexicon;
mod metrics;
mod outline;
mod pipeline;
mod refine;
mod report;
mod run;
mod selection;
mod source;
mod strategy_chunks;
mod strategy_cluster;
mod strategy_fallback;
mod strategy_pattern;
mod strategy_toc;
#[cfg(test)]
mod tests;
mod validation;

pub use candidate::StrategyKind;
pub use run::run;

pub(crate) use format_detection::{FormatDetection, FormatDetector};
pub(crate) use report::SUMMARY_FILE_NAME;
pub(crate) use source::{DocumentText, PageNormalization, PdftotextSource};

use candidate::*;
use config::*;
use format_detection::*;
use lexicon::*;
use metrics::*;
use pipeline::*;
use refine::*;
use report::*;
use selection::*;
use strategy_chunks::*;
use strategy_cluster::*;
use strategy_fallback::*;
use strategy_pattern::*;
use strategy_toc::*;
use validation::*;
