use std::fs;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::extract::SUMMARY_FILE_NAME;
use crate::model::BatchSummary;

pub fn run(args: StatusArgs) -> Result<()> {
    let summary_path = args.output_dir.join(SUMMARY_FILE_NAME);

    info!(output_dir = %args.output_dir.display(), "status requested");

    if !summary_path.exists() {
        warn!(path = %summary_path.display(), "extraction summary missing");
        return Ok(());
    }

    let raw = fs::read(&summary_path)
        .with_context(|| format!("failed to read {}", summary_path.display()))?;
    let summary: BatchSummary = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", summary_path.display()))?;

    info!(
        run_id = %summary.run_id,
        started_at = %summary.started_at,
        completed_at = %summary.completed_at,
        input = %summary.input_path,
        pdftotext = %summary.tool_versions.pdftotext.clone().unwrap_or_default(),
        pdftohtml = %summary.tool_versions.pdftohtml.clone().unwrap_or_default(),
        "loaded extraction summary"
    );
    info!(
        total = summary.total_documents,
        successful = summary.successful_extractions,
        failed = summary.failed_extractions,
        extraction_rate = %summary.extraction_rate,
        excellent_rate = %summary.excellent_rate,
        supreme_rate = %summary.supreme_rate,
        "extraction totals"
    );

    for (tier, count) in &summary.tier_counts {
        info!(tier = %tier, documents = count, "tier count");
    }
    for (format, count) in &summary.format_counts {
        info!(format = %format, documents = count, "format count");
    }

    for result in summary.results.iter().filter(|result| !result.extraction_successful) {
        warn!(
            document = %result.document,
            reason = %result.failure_reason.clone().unwrap_or_default(),
            "failed document"
        );
    }

    Ok(())
}
