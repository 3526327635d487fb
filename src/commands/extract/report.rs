use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use tracing::warn;

use crate::model::{BatchSummary, ExtractionReport, ToolVersions};
use crate::util::{file_stem_string, now_utc_string, percentage, write_json_pretty, write_text};

use super::*;

pub const SUMMARY_FILE_NAME: &str = "extraction_summary.json";

/// Writes `<stem>_competencies.txt` (successful extractions only) and
/// `<stem>_competencies.json`, returning the report that was written.
pub fn write_document_outputs(
    extraction: &DocumentExtraction,
    source_path: &Path,
    source_sha256: Option<String>,
    output_dir: &Path,
) -> Result<ExtractionReport> {
    let stem = file_stem_string(source_path);
    let text_path = output_dir.join(format!("{stem}_competencies.txt"));
    let json_path = output_dir.join(format!("{stem}_competencies.json"));

    let mut report = build_report(extraction, source_path, source_sha256);
    if let (true, Some(winner)) = (extraction.is_successful(), extraction.winner.as_ref()) {
        write_text(&text_path, &render_text_output(&report, &winner.content))?;
        report.output_file = Some(text_path.display().to_string());
    }

    report.json_report = Some(json_path.display().to_string());
    write_json_pretty(&json_path, &report)?;
    Ok(report)
}

/// `write_document_outputs`, except that a write error becomes a failure
/// report instead of stopping the batch.
pub fn record_document_outputs(
    extraction: &DocumentExtraction,
    source_path: &Path,
    source_sha256: Option<String>,
    output_dir: &Path,
) -> ExtractionReport {
    match write_document_outputs(extraction, source_path, source_sha256.clone(), output_dir) {
        Ok(report) => report,
        Err(error) => {
            warn!(
                path = %source_path.display(),
                output_dir = %output_dir.display(),
                error = %format!("{error:#}"),
                "could not write document outputs"
            );
            let failed = DocumentExtraction {
                failure: Some(ExtractionFailure::OutputWrite(format!("{error:#}"))),
                ..extraction.clone()
            };
            build_report(&failed, source_path, source_sha256)
        }
    }
}

pub fn build_report(
    extraction: &DocumentExtraction,
    source_path: &Path,
    source_sha256: Option<String>,
) -> ExtractionReport {
    let winner = extraction.winner.as_ref();
    let validation = extraction.validation.as_ref();
    let successful = extraction.is_successful();

    let validation_text = match (&extraction.failure, validation) {
        (Some(failure), _) => format!("Extraction failed: {failure}"),
        (None, Some(validation)) => validation.description.clone(),
        (None, None) => String::new(),
    };

    ExtractionReport {
        document: extraction.document.clone(),
        source_path: source_path.display().to_string(),
        source_sha256,
        total_pages: extraction.total_pages,
        detected_format: extraction.format.format.label().to_string(),
        format_confidence: extraction.format.confidence,
        pages_extracted: winner.map(Candidate::page_range),
        extraction_method: winner.map(|winner| winner.extraction_method.as_str().to_string()),
        confidence_score: winner.map(|winner| winner.confidence_score),
        selection_score: extraction.selection_score,
        candidate_quality_score: extraction.candidate_quality_score,
        candidates_considered: extraction.candidates_considered,
        role_coverage: winner.map(|winner| winner.role_coverage),
        quality_score: validation.map(|validation| validation.quality_score).unwrap_or(0.0),
        tier: validation.map(|validation| validation.tier.to_string()),
        validation: validation_text,
        detailed_analysis: validation.map(|validation| validation.analysis.clone()),
        content_length: winner.map(|winner| winner.content.chars().count()).unwrap_or(0),
        enhancement_applied: extraction.enhancement_applied,
        extraction_successful: successful,
        failure_reason: extraction.failure.as_ref().map(|failure| failure.to_string()),
        output_file: None,
        json_report: None,
        generated_at: now_utc_string(),
    }
}

pub fn render_text_output(report: &ExtractionReport, content: &str) -> String {
    let mut rendered = String::new();
    rendered.push_str(&format!("CanMEDS Competencies Extracted from: {}\n", report.document));
    rendered.push_str(&format!(
        "Extraction Method: {}\n",
        report.extraction_method.as_deref().unwrap_or("unknown")
    ));
    rendered.push_str(&format!(
        "Pages: {}\n",
        report.pages_extracted.as_deref().unwrap_or("-")
    ));
    rendered.push_str(&format!("Detected Format: {}\n", report.detected_format));
    rendered.push_str(&format!("Validation: {}\n", report.validation));
    rendered.push_str(&"=".repeat(60));
    rendered.push_str("\n\n");
    rendered.push_str(content);
    rendered.push('\n');
    rendered
}

pub struct SummaryContext<'a> {
    pub run_id: &'a str,
    pub started_at: &'a str,
    pub input_path: &'a Path,
    pub output_dir: &'a Path,
    pub tool_versions: ToolVersions,
}

pub fn build_batch_summary(context: SummaryContext<'_>, results: Vec<ExtractionReport>) -> BatchSummary {
    let total = results.len();
    let successful = results
        .iter()
        .filter(|report| report.extraction_successful)
        .count();

    let mut tier_counts = BTreeMap::new();
    for report in results.iter().filter(|report| report.extraction_successful) {
        if let Some(tier) = &report.tier {
            *tier_counts.entry(tier.clone()).or_insert(0usize) += 1;
        }
    }
    let mut format_counts = BTreeMap::new();
    for report in &results {
        *format_counts
            .entry(report.detected_format.clone())
            .or_insert(0usize) += 1;
    }
    let tier_count = |tier: Tier| tier_counts.get(tier.as_str()).copied().unwrap_or(0);
    let excellent = tier_count(Tier::Excellent);
    let supreme = tier_count(Tier::Supreme);

    BatchSummary {
        manifest_version: 1,
        run_id: context.run_id.to_string(),
        started_at: context.started_at.to_string(),
        completed_at: now_utc_string(),
        input_path: context.input_path.display().to_string(),
        output_dir: context.output_dir.display().to_string(),
        tool_versions: context.tool_versions,
        total_documents: total,
        successful_extractions: successful,
        failed_extractions: total - successful,
        extraction_rate: percentage(successful, total),
        excellent_rate: percentage(excellent, total),
        supreme_rate: percentage(supreme, total),
        tier_counts,
        format_counts,
        results,
    }
}
