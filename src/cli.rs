use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::commands::extract::StrategyKind;

#[derive(Parser, Debug)]
#[command(
    name = "canmeds",
    version,
    about = "Locate, extract and grade CanMEDS competency sections in accreditation PDFs"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Extract(ExtractArgs),
    Detect(DetectArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long)]
    pub input_dir: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// A single PDF or a directory of PDFs.
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value = "extracted_competencies")]
    pub output_dir: PathBuf,

    /// JSON file overriding any subset of the extraction thresholds.
    #[arg(long)]
    pub config_path: Option<PathBuf>,

    #[arg(long)]
    pub summary_path: Option<PathBuf>,

    #[arg(long)]
    pub max_pages_per_doc: Option<usize>,

    /// Restrict the primary strategies; the fallback always stays available.
    #[arg(long = "strategy", value_enum)]
    pub strategies: Vec<StrategyKind>,
}

#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value_t = 10)]
    pub sample_pages: usize,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "extracted_competencies")]
    pub output_dir: PathBuf,
}
