use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::ExtractArgs;
use crate::model::{ExtractionReport, ToolVersions};
use crate::util::{
    ensure_directory, now_utc_string, resolve_pdf_inputs, sha256_file, utc_compact_string,
    write_json_pretty,
};

use super::source::{PdftotextSource, command_version_optional};
use super::*;

pub fn run(args: ExtractArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let mut config = ExtractionConfig::load(args.config_path.as_deref())?;
    if !args.strategies.is_empty() {
        config.strategies.primary = args.strategies.clone();
    }
    let extractor = Extractor::new(config)?;

    let pdf_paths = resolve_pdf_inputs(&args.input)?;
    if pdf_paths.is_empty() {
        warn!(input = %args.input.display(), "no PDFs found");
    }
    ensure_directory(&args.output_dir)?;

    info!(
        input = %args.input.display(),
        output_dir = %args.output_dir.display(),
        documents = pdf_paths.len(),
        strategies = ?extractor.config().strategies.primary,
        run_id = %run_id,
        "starting extraction"
    );

    let tool_versions = collect_tool_versions();
    let mut results = Vec::with_capacity(pdf_paths.len());
    for pdf_path in &pdf_paths {
        results.push(process_pdf(&extractor, pdf_path, &args));
    }

    let summary_path = args
        .summary_path
        .clone()
        .unwrap_or_else(|| args.output_dir.join(SUMMARY_FILE_NAME));
    let summary = build_batch_summary(
        SummaryContext {
            run_id: &run_id,
            started_at: &started_at,
            input_path: &args.input,
            output_dir: &args.output_dir,
            tool_versions,
        },
        results,
    );
    write_json_pretty(&summary_path, &summary)?;

    info!(path = %summary_path.display(), "wrote extraction summary");
    info!(
        total = summary.total_documents,
        successful = summary.successful_extractions,
        failed = summary.failed_extractions,
        extraction_rate = %summary.extraction_rate,
        "extraction completed"
    );

    Ok(())
}

/// One document end to end. Every problem, including a failed output
/// write, becomes a failure report.
fn process_pdf(extractor: &Extractor, pdf_path: &Path, args: &ExtractArgs) -> ExtractionReport {
    let source_sha256 = match sha256_file(pdf_path) {
        Ok(hash) => Some(hash),
        Err(error) => {
            warn!(path = %pdf_path.display(), error = %error, "could not hash source PDF");
            None
        }
    };

    let extraction = match PdftotextSource::open(pdf_path, args.max_pages_per_doc) {
        Ok(source) => extractor.process_document(&source),
        Err(error) => {
            let name = pdf_path
                .file_name()
                .and_then(|value| value.to_str())
                .unwrap_or("document.pdf");
            DocumentExtraction::failed(name, ExtractionFailure::SourceRead(format!("{error:#}")))
        }
    };

    let report = record_document_outputs(&extraction, pdf_path, source_sha256, &args.output_dir);
    match &report.failure_reason {
        None => info!(
            document = %report.document,
            method = report.extraction_method.as_deref().unwrap_or("unknown"),
            pages = report.pages_extracted.as_deref().unwrap_or("-"),
            tier = report.tier.as_deref().unwrap_or("-"),
            score = report.quality_score,
            "extracted competency section"
        ),
        Some(reason) => warn!(
            document = %report.document,
            reason = %reason,
            "extraction failed"
        ),
    }

    report
}

fn collect_tool_versions() -> ToolVersions {
    let versions = ToolVersions {
        pdftotext: command_version_optional("pdftotext", &["-v"]),
        pdftohtml: command_version_optional("pdftohtml", &["-v"]),
    };
    if versions.pdftotext.is_none() {
        warn!("pdftotext not found; every document will fail to load");
    }
    versions
}
