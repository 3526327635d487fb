use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::{debug, warn};

use super::outline::{OutlineEntry, extract_outline_with_pdftohtml};

/// Page-indexed plain text for one document.
pub trait PageTextProvider {
    fn name(&self) -> &str;
    fn page_count(&self) -> usize;
    fn outline(&self) -> Result<Vec<OutlineEntry>>;
    /// `page_index` is 0-based.
    fn page_text(&self, page_index: usize) -> Result<String>;
}

/// Text layer read through poppler's `pdftotext`, outline through `pdftohtml -xml`.
#[derive(Debug)]
pub struct PdftotextSource {
    name: String,
    path: PathBuf,
    pages: Vec<String>,
}

impl PdftotextSource {
    pub fn open(path: &Path, max_pages: Option<usize>) -> Result<Self> {
        let pages = extract_pages_with_pdftotext(path, max_pages)?;
        let name = path
            .file_name()
            .and_then(|value| value.to_str())
            .unwrap_or("document.pdf")
            .to_string();

        Ok(Self {
            name,
            path: path.to_path_buf(),
            pages,
        })
    }
}

impl PageTextProvider for PdftotextSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn outline(&self) -> Result<Vec<OutlineEntry>> {
        extract_outline_with_pdftohtml(&self.path)
    }

    fn page_text(&self, page_index: usize) -> Result<String> {
        self.pages
            .get(page_index)
            .cloned()
            .with_context(|| format!("page index {} out of range for {}", page_index, self.name))
    }
}

fn extract_pages_with_pdftotext(pdf_path: &Path, max_pages: Option<usize>) -> Result<Vec<String>> {
    let mut command = Command::new("pdftotext");
    command.arg("-enc").arg("UTF-8").arg("-f").arg("1");
    if let Some(max_pages) = max_pages {
        command.arg("-l").arg(max_pages.to_string());
    }
    command.arg(pdf_path).arg("-");

    let output = command
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    while let Some(last_page) = pages.last() {
        if last_page.trim().is_empty() {
            pages.pop();
            continue;
        }
        break;
    }

    Ok(pages)
}

pub fn command_version_optional(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}

/// Pages held in memory, used for synthetic documents.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct MemorySource {
    pub name: String,
    pub pages: Vec<String>,
    pub outline: Vec<OutlineEntry>,
}

#[cfg(test)]
impl MemorySource {
    pub fn new(name: &str, pages: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            pages,
            outline: Vec::new(),
        }
    }

    pub fn with_outline(mut self, outline: Vec<OutlineEntry>) -> Self {
        self.outline = outline;
        self
    }
}

#[cfg(test)]
impl PageTextProvider for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn outline(&self) -> Result<Vec<OutlineEntry>> {
        Ok(self.outline.clone())
    }

    fn page_text(&self, page_index: usize) -> Result<String> {
        self.pages
            .get(page_index)
            .cloned()
            .with_context(|| format!("page index {page_index} out of range"))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PageNormalization {
    pub strip_running_lines: bool,
    pub merge_hyphenation: bool,
}

impl Default for PageNormalization {
    fn default() -> Self {
        Self {
            strip_running_lines: true,
            merge_hyphenation: true,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NormalizationStats {
    pub header_lines_removed: usize,
    pub footer_lines_removed: usize,
    pub dehyphenation_merges: usize,
}

/// A document's full page text plus its outline, held for one pipeline run.
#[derive(Debug, Clone)]
pub struct DocumentText {
    pub name: String,
    pages: Vec<String>,
    /// Page text as read, before running lines and hyphenation were touched.
    raw_pages: Vec<String>,
    pub outline: Vec<OutlineEntry>,
    pub stats: NormalizationStats,
}

impl DocumentText {
    pub fn load(provider: &dyn PageTextProvider, normalization: PageNormalization) -> Result<Self> {
        let page_count = provider.page_count();
        let mut pages = Vec::with_capacity(page_count);
        for index in 0..page_count {
            let text = provider
                .page_text(index)
                .with_context(|| format!("failed to read page {} of {}", index + 1, provider.name()))?;
            pages.push(text.replace('\u{0000}', ""));
        }

        let outline = match provider.outline() {
            Ok(outline) => outline,
            Err(error) => {
                warn!(document = provider.name(), error = %error, "outline unavailable");
                Vec::new()
            }
        };

        let raw_pages = pages.clone();
        let stats = normalize_pages(&mut pages, normalization);
        debug!(
            document = provider.name(),
            pages = pages.len(),
            outline_entries = outline.len(),
            header_lines_removed = stats.header_lines_removed,
            footer_lines_removed = stats.footer_lines_removed,
            dehyphenation_merges = stats.dehyphenation_merges,
            "loaded document text"
        );

        Ok(Self {
            name: provider.name().to_string(),
            pages,
            raw_pages,
            outline,
            stats,
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// 1-based page access.
    pub fn page(&self, page: usize) -> Option<&str> {
        page.checked_sub(1)
            .and_then(|index| self.pages.get(index))
            .map(String::as_str)
    }

    /// Pages `start..=end` (1-based) joined by newlines, clamped to the document.
    pub fn span_text(&self, start: usize, end: usize) -> String {
        let first = start.max(1);
        let last = end.min(self.pages.len());
        if first > last {
            return String::new();
        }

        self.pages[first - 1..last].join("\n").trim().to_string()
    }

    /// Like `span_text`, over the pages as they were read.
    pub fn raw_span_text(&self, start: usize, end: usize) -> String {
        let first = start.max(1);
        let last = end.min(self.raw_pages.len());
        if first > last {
            return String::new();
        }

        self.raw_pages[first - 1..last].join("\n").trim().to_string()
    }

    pub fn concatenated(&self) -> ConcatenatedText {
        let mut text = String::new();
        let mut page_breaks = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            page_breaks.push(text.len());
            text.push_str(page);
            text.push('\n');
        }

        ConcatenatedText { text, page_breaks }
    }
}

/// The whole document as one string with the byte offset where each page starts.
#[derive(Debug, Clone)]
pub struct ConcatenatedText {
    pub text: String,
    pub page_breaks: Vec<usize>,
}

impl ConcatenatedText {
    /// 1-based page containing byte `offset`: the last page break not after it.
    pub fn page_at(&self, offset: usize) -> usize {
        self.page_breaks
            .partition_point(|&page_start| page_start <= offset)
            .max(1)
    }
}

pub(super) fn normalize_pages(pages: &mut [String], normalization: PageNormalization) -> NormalizationStats {
    let mut stats = NormalizationStats::default();

    let (header_candidates, footer_candidates) = if normalization.strip_running_lines {
        (
            detect_repeated_edge_lines(pages, true),
            detect_repeated_edge_lines(pages, false),
        )
    } else {
        (HashSet::new(), HashSet::new())
    };

    for page in pages.iter_mut() {
        let mut lines = page
            .lines()
            .map(|line| line.to_string())
            .collect::<Vec<String>>();

        if let Some(index) = first_nonempty_line_index(&lines) {
            let candidate = normalize_edge_line(&lines[index]);
            if !candidate.is_empty() && header_candidates.contains(&candidate) {
                lines.remove(index);
                stats.header_lines_removed += 1;
            }
        }

        if let Some(index) = last_nonempty_line_index(&lines) {
            let candidate = normalize_edge_line(&lines[index]);
            if !candidate.is_empty() && footer_candidates.contains(&candidate) {
                lines.remove(index);
                stats.footer_lines_removed += 1;
            }
        }

        if normalization.merge_hyphenation {
            let (merged, merges) = merge_hyphenated_lines(lines);
            stats.dehyphenation_merges += merges;
            lines = merged;
        }

        *page = lines.join("\n");
    }

    stats
}

fn detect_repeated_edge_lines(pages: &[String], header: bool) -> HashSet<String> {
    let mut counts = HashMap::<String, usize>::new();
    for page in pages {
        let lines = page.lines().map(str::trim).collect::<Vec<&str>>();
        let candidate = if header {
            lines.iter().copied().find(|line| !line.is_empty())
        } else {
            lines.iter().rev().copied().find(|line| !line.is_empty())
        };

        let Some(candidate) = candidate else {
            continue;
        };

        let normalized = normalize_edge_line(candidate);
        if normalized.is_empty() || normalized.len() > 120 {
            continue;
        }
        *counts.entry(normalized).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .filter_map(|(candidate, count)| if count >= 3 { Some(candidate) } else { None })
        .collect()
}

/// Lower-cased, whitespace-collapsed, with digits folded so that
/// "Page 3" and "Page 4" compare equal.
fn normalize_edge_line(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .map(|character| if character.is_ascii_digit() { '#' } else { character })
        .collect()
}

fn first_nonempty_line_index(lines: &[String]) -> Option<usize> {
    lines.iter().position(|line| !line.trim().is_empty())
}

fn last_nonempty_line_index(lines: &[String]) -> Option<usize> {
    lines.iter().rposition(|line| !line.trim().is_empty())
}

pub(super) fn merge_hyphenated_lines(lines: Vec<String>) -> (Vec<String>, usize) {
    let mut merged = Vec::<String>::with_capacity(lines.len());
    let mut merges = 0usize;
    let mut index = 0usize;

    while index < lines.len() {
        let current = &lines[index];
        if let Some(next) = lines.get(index + 1) {
            if should_merge_hyphenated_pair(current, next) {
                merged.push(format!(
                    "{}{}",
                    current.trim_end().trim_end_matches('-'),
                    next.trim_start()
                ));
                merges += 1;
                index += 2;
                continue;
            }
        }

        merged.push(current.clone());
        index += 1;
    }

    (merged, merges)
}

fn should_merge_hyphenated_pair(current: &str, next: &str) -> bool {
    let left = current.trim_end();
    if !left.ends_with('-') {
        return false;
    }

    // Bullet dashes and "R1 -" style level markers are not word breaks.
    let stem = left.trim_end_matches('-');
    if stem.trim().is_empty() || stem.ends_with(char::is_whitespace) {
        return false;
    }

    let starts_with_lowercase = next
        .trim_start()
        .chars()
        .next()
        .map(|character| character.is_lowercase())
        .unwrap_or(false);
    if !starts_with_lowercase {
        return false;
    }

    stem.chars()
        .last()
        .map(|character| character.is_alphabetic())
        .unwrap_or(false)
}
