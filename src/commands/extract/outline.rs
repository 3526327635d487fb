use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One bookmark of a document outline. `level` starts at 1 for top-level
/// entries; `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub level: u32,
    pub title: String,
    pub page: usize,
}

impl OutlineEntry {
    pub fn new(level: u32, title: &str, page: usize) -> Self {
        Self {
            level,
            title: title.to_string(),
            page,
        }
    }
}

pub fn extract_outline_with_pdftohtml(pdf_path: &Path) -> Result<Vec<OutlineEntry>> {
    let output = Command::new("pdftohtml")
        .arg("-xml")
        .arg("-i")
        .arg("-f")
        .arg("1")
        .arg("-l")
        .arg("1")
        .arg(pdf_path)
        .arg("-stdout")
        .output()
        .with_context(|| format!("failed to execute pdftohtml for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftohtml returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    parse_outline_xml(&String::from_utf8_lossy(&output.stdout))
}

/// Walks the nested `<outline>` blocks of pdftohtml's XML output; nesting
/// depth becomes the entry level.
pub fn parse_outline_xml(xml: &str) -> Result<Vec<OutlineEntry>> {
    let token_regex = Regex::new(r#"(?s)<outline>|</outline>|<item(?:\s+page="(\d+)")?\s*>(.*?)</item>"#)
        .context("failed to compile outline token regex")?;
    let tag_regex = Regex::new(r"<[^>]+>").context("failed to compile tag regex")?;

    let mut depth = 0u32;
    let mut entries = Vec::new();

    for captures in token_regex.captures_iter(xml) {
        let token = captures.get(0).map(|m| m.as_str()).unwrap_or_default();
        if token == "<outline>" {
            depth += 1;
            continue;
        }
        if token == "</outline>" {
            depth = depth.saturating_sub(1);
            continue;
        }

        let Some(page) = captures
            .get(1)
            .and_then(|value| value.as_str().parse::<usize>().ok())
        else {
            continue;
        };
        let raw_title = captures.get(2).map(|m| m.as_str()).unwrap_or_default();
        let title = normalize_outline_label(&tag_regex.replace_all(raw_title, " "));
        if title.is_empty() || depth == 0 {
            continue;
        }

        entries.push(OutlineEntry {
            level: depth,
            title,
            page,
        });
    }

    Ok(entries)
}

fn normalize_outline_label(raw_label: &str) -> String {
    raw_label
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace('\u{00a0}', " ")
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}
