use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::DetectArgs;
use crate::commands::extract::{DocumentText, FormatDetection, FormatDetector, PageNormalization, PdftotextSource};
use crate::util::resolve_pdf_inputs;

#[derive(Debug, Serialize)]
struct DetectedDocument {
    document: String,
    format: String,
    confidence: f64,
    detection: Option<FormatDetection>,
    error: Option<String>,
}

pub fn run(args: DetectArgs) -> Result<()> {
    let pdf_paths = resolve_pdf_inputs(&args.input)?;
    let detector = FormatDetector::new()?;
    let sample_pages = args.sample_pages.max(1);

    info!(
        input = %args.input.display(),
        documents = pdf_paths.len(),
        sample_pages,
        "detecting document formats"
    );

    let mut detected = Vec::with_capacity(pdf_paths.len());
    for pdf_path in &pdf_paths {
        let document = pdf_path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or("document.pdf")
            .to_string();

        let loaded = PdftotextSource::open(pdf_path, Some(sample_pages))
            .and_then(|source| DocumentText::load(&source, PageNormalization::default()));
        match loaded {
            Ok(doc) => {
                let detection = detector.detect(&FormatDetector::sample(&doc, sample_pages));
                detected.push(DetectedDocument {
                    document,
                    format: detection.format.label().to_string(),
                    confidence: detection.confidence,
                    detection: Some(detection),
                    error: None,
                });
            }
            Err(error) => {
                warn!(path = %pdf_path.display(), error = %error, "could not read document");
                detected.push(DetectedDocument {
                    document,
                    format: "Unknown".to_string(),
                    confidence: 0.0,
                    detection: None,
                    error: Some(format!("{error:#}")),
                });
            }
        }
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &detected)
            .context("failed to serialize detection json output")?;
        writeln!(output)?;
    } else {
        for entry in &detected {
            writeln!(
                output,
                "{}\t{}\tconfidence={:.2}",
                entry.document, entry.format, entry.confidence
            )?;
            if let Some(detection) = &entry.detection {
                for indicator in &detection.indicators {
                    writeln!(output, "\t{indicator}")?;
                }
            }
            if let Some(error) = &entry.error {
                writeln!(output, "\terror: {error}")?;
            }
        }
    }
    output.flush()?;

    Ok(())
}
