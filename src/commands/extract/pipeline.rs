use anyhow::Result;
use thiserror::Error;
use tracing::{debug, info};

use super::source::{DocumentText, PageNormalization, PageTextProvider};
use super::*;

/// Pages sampled for format detection.
pub const FORMAT_SAMPLE_PAGES: usize = 10;

/// Why one document produced no accepted section.
#[derive(Debug, Clone, Error)]
pub enum ExtractionFailure {
    #[error("Failed to read document text: {0}")]
    SourceRead(String),

    #[error("No competency candidates found")]
    NoCandidates,

    #[error("Validation failed: {description} [{}]", .failures.join("; "))]
    Validation {
        description: String,
        quality_score: f64,
        role_count: usize,
        failures: Vec<String>,
    },

    #[error("Failed to write document outputs: {0}")]
    OutputWrite(String),
}

/// Everything learned about one document, whether or not a section was
/// accepted.
#[derive(Debug, Clone)]
pub struct DocumentExtraction {
    pub document: String,
    pub total_pages: usize,
    pub format: FormatDetection,
    pub candidates_considered: usize,
    /// Winning candidate with its final, refined content.
    pub winner: Option<Candidate>,
    pub selection_score: Option<f64>,
    pub candidate_quality_score: Option<f64>,
    pub validation: Option<ValidationResult>,
    pub enhancement_applied: bool,
    pub failure: Option<ExtractionFailure>,
}

impl DocumentExtraction {
    pub fn failed(document: &str, failure: ExtractionFailure) -> Self {
        Self {
            document: document.to_string(),
            total_pages: 0,
            format: FormatDetection {
                format: DocumentFormat::Unknown,
                confidence: 0.0,
                scores: Default::default(),
                indicators: Vec::new(),
            },
            candidates_considered: 0,
            winner: None,
            selection_score: None,
            candidate_quality_score: None,
            validation: None,
            enhancement_applied: false,
            failure: Some(failure),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.failure.is_none()
    }

    pub fn tier(&self) -> Option<Tier> {
        self.validation.as_ref().map(|validation| validation.tier)
    }
}

/// The locate, extract and validate pipeline. Built once per run; every
/// component is read-only while documents are processed.
pub struct Extractor {
    config: ExtractionConfig,
    metrics: TextMetrics,
    primaries: Vec<Box<dyn CandidateGenerator>>,
    fallback: FallbackGenerator,
    scorer: CandidateScorer,
    refiner: ContentRefiner,
    validator: QualityValidator,
    detector: FormatDetector,
    normalization: PageNormalization,
}

impl Extractor {
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            metrics: TextMetrics::new(RoleLexicon::standard())?,
            primaries: build_primary_generators(&config.strategies.primary)?,
            fallback: FallbackGenerator,
            scorer: CandidateScorer::new(config.scoring.clone()),
            refiner: ContentRefiner::new(config.refiner.clone())?,
            validator: QualityValidator::new(config.validation.clone(), config.tiers.clone()),
            detector: FormatDetector::new()?,
            normalization: PageNormalization::default(),
            config,
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn process_document(&self, provider: &dyn PageTextProvider) -> DocumentExtraction {
        match DocumentText::load(provider, self.normalization) {
            Ok(doc) => self.extract(&doc),
            Err(error) => DocumentExtraction::failed(
                provider.name(),
                ExtractionFailure::SourceRead(format!("{error:#}")),
            ),
        }
    }

    pub fn extract(&self, doc: &DocumentText) -> DocumentExtraction {
        let format = self
            .detector
            .detect(&FormatDetector::sample(doc, FORMAT_SAMPLE_PAGES));
        debug!(
            document = %doc.name,
            format = format.format.label(),
            confidence = format.confidence,
            "detected document format"
        );

        let mut extraction = DocumentExtraction {
            document: doc.name.clone(),
            total_pages: doc.page_count(),
            format,
            ..DocumentExtraction::failed(&doc.name, ExtractionFailure::NoCandidates)
        };

        let ctx = ScanContext {
            doc,
            metrics: &self.metrics,
            config: &self.config,
        };
        let candidates = generate_candidates(&self.primaries, &self.fallback, &ctx);
        let Some(selection) = self.scorer.select_best(candidates) else {
            return extraction;
        };
        extraction.candidates_considered = selection.considered;
        extraction.selection_score = Some(selection.score);
        extraction.candidate_quality_score = Some(selection.candidate.quality_score);

        let mut winner = selection.candidate;
        if let Some((start, end)) = tighten_boundaries(&winner, doc, self.metrics.lexicon()) {
            debug!(
                document = %doc.name,
                from = %winner.page_range(),
                to = %format!("{start}-{end}"),
                "tightened section boundaries"
            );
            winner.start_page = start;
            winner.end_page = end;
            winner.content = doc.span_text(start, end);
        }

        let mut content = self.refiner.refine(&winner.content);
        let mut validation = self.validator.validate(&self.metrics, &content, winner.page_span());
        if !validation.is_valid {
            info!(
                document = %doc.name,
                score = validation.quality_score,
                "validation rejected refined content, applying enhancement"
            );
            content = self.refiner.refine_aggressive(&content);
            validation = self.validator.validate(&self.metrics, &content, winner.page_span());
            extraction.enhancement_applied = true;
        }

        winner.role_coverage = self.metrics.lexicon().role_count(&content);
        winner.content = content;

        extraction.failure = if validation.is_valid {
            None
        } else {
            Some(ExtractionFailure::Validation {
                description: validation.description.clone(),
                quality_score: validation.quality_score,
                role_count: validation.analysis.role_count,
                failures: validation.failures.clone(),
            })
        };
        extraction.winner = Some(winner);
        extraction.validation = Some(validation);
        extraction
    }
}
