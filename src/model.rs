use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfEntry {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub pdf_count: usize,
    pub pdfs: Vec<PdfEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolVersions {
    pub pdftotext: Option<String>,
    pub pdftohtml: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetailedAnalysis {
    pub role_count: usize,
    pub roles_found: Vec<String>,
    pub competency_terms_count: usize,
    pub term_counts: BTreeMap<String, usize>,
    pub has_structured_content: bool,
    pub structure_score: f64,
    pub content_length: usize,
    pub competency_type_score: u32,
    pub contamination_pct: u32,
    pub page_range_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub document: String,
    pub source_path: String,
    pub source_sha256: Option<String>,
    pub total_pages: usize,
    pub detected_format: String,
    pub format_confidence: f64,
    pub pages_extracted: Option<String>,
    pub extraction_method: Option<String>,
    pub confidence_score: Option<f64>,
    pub selection_score: Option<f64>,
    pub candidate_quality_score: Option<f64>,
    pub candidates_considered: usize,
    pub role_coverage: Option<usize>,
    pub quality_score: f64,
    pub tier: Option<String>,
    pub validation: String,
    pub detailed_analysis: Option<DetailedAnalysis>,
    pub content_length: usize,
    pub enhancement_applied: bool,
    pub extraction_successful: bool,
    pub failure_reason: Option<String>,
    pub output_file: Option<String>,
    pub json_report: Option<String>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub manifest_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub completed_at: String,
    pub input_path: String,
    pub output_dir: String,
    pub tool_versions: ToolVersions,
    pub total_documents: usize,
    pub successful_extractions: usize,
    pub failed_extractions: usize,
    pub tier_counts: BTreeMap<String, usize>,
    /// Documents per detected format, failures included.
    pub format_counts: BTreeMap<String, usize>,
    pub extraction_rate: String,
    pub excellent_rate: String,
    pub supreme_rate: String,
    pub results: Vec<ExtractionReport>,
}
