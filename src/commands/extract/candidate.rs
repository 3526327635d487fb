use anyhow::{Result, bail};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::source::DocumentText;
use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    TocGuided,
    PatternBased,
    SemanticChunk,
    DensityCluster,
    #[value(skip)]
    Fallback,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TocGuided => "toc_guided",
            Self::PatternBased => "pattern_based",
            Self::SemanticChunk => "semantic_chunk",
            Self::DensityCluster => "density_cluster",
            Self::Fallback => "fallback",
        }
    }

    /// Fixed method priority used by the selection score.
    pub fn priority(self) -> f64 {
        match self {
            Self::TocGuided => 1.0,
            Self::DensityCluster => 0.9,
            Self::PatternBased => 0.8,
            Self::SemanticChunk => 0.7,
            Self::Fallback => 0.3,
        }
    }

    /// Whether candidates of this kind cover whole pages.
    pub fn is_page_aligned(self) -> bool {
        !matches!(self, Self::PatternBased)
    }
}

/// A proposed competency section. Pages are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub content: String,
    pub start_page: usize,
    pub end_page: usize,
    pub confidence_score: f64,
    pub extraction_method: StrategyKind,
    pub role_coverage: usize,
    pub contamination_level: f64,
    pub quality_score: f64,
}

impl Candidate {
    /// Builds a candidate and fills in the derived measurements from `content`.
    pub fn assess(
        ctx: &ScanContext<'_>,
        extraction_method: StrategyKind,
        content: String,
        start_page: usize,
        end_page: usize,
        confidence_score: f64,
    ) -> Self {
        let role_coverage = ctx.lexicon().role_count(&content);
        let contamination_level = ctx.metrics.contamination_level(&content);
        let quality_score = ctx.metrics.candidate_quality(&content);

        Self {
            content,
            start_page,
            end_page: end_page.max(start_page),
            confidence_score: confidence_score.clamp(0.0, 1.0),
            extraction_method,
            role_coverage,
            contamination_level,
            quality_score,
        }
    }

    pub fn page_range(&self) -> String {
        format!("{}-{}", self.start_page, self.end_page)
    }

    pub fn page_span(&self) -> usize {
        self.end_page + 1 - self.start_page
    }
}

/// What every generator reads while scanning one document.
pub struct ScanContext<'a> {
    pub doc: &'a DocumentText,
    pub metrics: &'a TextMetrics,
    pub config: &'a ExtractionConfig,
}

impl<'a> ScanContext<'a> {
    pub fn lexicon(&self) -> &'a RoleLexicon {
        self.metrics.lexicon()
    }

    pub fn thresholds(&self) -> &'a GeneratorThresholds {
        &self.config.generators
    }

    pub fn ensure_pages(&self, kind: StrategyKind) -> Result<()> {
        if self.doc.page_count() == 0 {
            bail!("{} strategy cannot scan {}: document has no pages", kind.as_str(), self.doc.name);
        }
        Ok(())
    }
}

pub trait CandidateGenerator {
    fn kind(&self) -> StrategyKind;
    fn generate(&self, ctx: &ScanContext<'_>) -> Result<Vec<Candidate>>;
}

/// The primary generators in configured order, each kind at most once.
pub fn build_primary_generators(kinds: &[StrategyKind]) -> Result<Vec<Box<dyn CandidateGenerator>>> {
    let mut generators: Vec<Box<dyn CandidateGenerator>> = Vec::new();
    let mut seen = Vec::new();
    for kind in kinds {
        if seen.contains(kind) {
            continue;
        }
        seen.push(*kind);

        let generator: Box<dyn CandidateGenerator> = match kind {
            StrategyKind::TocGuided => Box::new(TocGuidedGenerator),
            StrategyKind::PatternBased => Box::new(PatternGenerator::new()?),
            StrategyKind::SemanticChunk => Box::new(SemanticChunkGenerator),
            StrategyKind::DensityCluster => Box::new(DensityClusterGenerator),
            StrategyKind::Fallback => bail!("fallback cannot be configured as a primary strategy"),
        };
        generators.push(generator);
    }

    Ok(generators)
}

/// Runs every primary generator and concatenates their output. A failing
/// generator contributes nothing. The fallback runs only when the primaries
/// produced no candidate at all.
pub fn generate_candidates(
    primaries: &[Box<dyn CandidateGenerator>],
    fallback: &dyn CandidateGenerator,
    ctx: &ScanContext<'_>,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for generator in primaries {
        let produced = run_generator(generator.as_ref(), ctx);
        candidates.extend(produced);
    }

    if candidates.is_empty() {
        debug!(document = %ctx.doc.name, "primary strategies found nothing, running fallback");
        candidates = run_generator(fallback, ctx);
    }

    info!(
        document = %ctx.doc.name,
        candidates = candidates.len(),
        "candidate generation finished"
    );
    candidates
}

fn run_generator(generator: &dyn CandidateGenerator, ctx: &ScanContext<'_>) -> Vec<Candidate> {
    match generator.generate(ctx) {
        Ok(candidates) => {
            debug!(
                document = %ctx.doc.name,
                strategy = generator.kind().as_str(),
                candidates = candidates.len(),
                "strategy finished"
            );
            candidates
        }
        Err(error) => {
            warn!(
                document = %ctx.doc.name,
                strategy = generator.kind().as_str(),
                error = %error,
                "strategy failed"
            );
            Vec::new()
        }
    }
}
