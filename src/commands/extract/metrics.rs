use anyhow::{Context, Result};
use regex::Regex;

use super::*;

/// Scoring vocabulary shared by the generators, the selector and the
/// validator. Regexes are compiled once per process.
#[derive(Debug)]
pub struct TextMetrics {
    lexicon: RoleLexicon,
    contamination_marker: Regex,
    citation_line: Regex,
    bullet_line: Regex,
    numbered_line: Regex,
    header_line: Regex,
}

impl TextMetrics {
    pub fn new(lexicon: RoleLexicon) -> Result<Self> {
        Ok(Self {
            lexicon,
            contamination_marker: Regex::new(
                r"(?i)\b(?:references?|bibliography|table\s+of\s+contents?|appendix|appendices|acknowledge?ments?)\b",
            )
            .context("failed to compile contamination marker regex")?,
            citation_line: Regex::new(r"(?i)\bet\s+al\.|\bdoi:|^\s*\[\d+\]|\b(?:19|20)\d{2};\s*\d+")
                .context("failed to compile citation regex")?,
            bullet_line: Regex::new(r"^\s*[•\-\*▪◦‣]").context("failed to compile bullet regex")?,
            numbered_line: Regex::new(r"^\s*\d+\.").context("failed to compile numbered regex")?,
            header_line: Regex::new(r"^[A-Z][A-Z\s]+:?$").context("failed to compile header regex")?,
        })
    }

    pub fn lexicon(&self) -> &RoleLexicon {
        &self.lexicon
    }

    /// Share of words sitting on reference, bibliography, contents,
    /// appendix or citation lines. Text without words counts as fully
    /// contaminated.
    pub fn contamination_level(&self, text: &str) -> f64 {
        let total_words = text.split_whitespace().count();
        if total_words == 0 {
            return 1.0;
        }

        let mut contaminated = 0usize;
        for line in text.lines() {
            if self.citation_line.is_match(line) {
                contaminated += line.split_whitespace().count();
                continue;
            }
            if let Some(found) = self.contamination_marker.find(line) {
                contaminated += line[found.start()..].split_whitespace().count();
            }
        }

        (contaminated as f64 / total_words as f64).min(1.0)
    }

    pub fn structure_score(&self, text: &str) -> f64 {
        if text.is_empty() {
            return 0.0;
        }

        let total_lines = text.split('\n').count();
        let structured = text
            .split('\n')
            .filter(|line| self.is_structured_line(line))
            .count();

        (structured as f64 / total_lines.max(1) as f64 * 4.0).min(1.0)
    }

    pub fn is_structured_line(&self, line: &str) -> bool {
        let line = line.trim_end_matches('\r');
        self.bullet_line.is_match(line)
            || self.numbered_line.is_match(line)
            || self.header_line.is_match(line)
    }

    /// 0-100: indicators present, roles present and assessment stems present.
    pub fn competency_content_score(&self, text: &str) -> f64 {
        let lower = text.to_lowercase();
        let indicators = self.lexicon.competency_terms_in_lower(&lower).len();
        let roles = self.lexicon.roles_in_lower(&lower).len();
        let stems = self.lexicon.educational_hits_lower(&lower);

        ((indicators * 8 + roles * 6 + stems * 4) as f64).min(100.0)
    }

    pub fn semantic_score(&self, text: &str) -> f64 {
        let lower = text.to_lowercase();
        let indicators = self.lexicon.competency_terms_in_lower(&lower).len();
        let roles = self.lexicon.roles_in_lower(&lower).len();
        let stems = self.lexicon.educational_hits_lower(&lower);

        ((indicators * 3 + roles * 4 + stems * 2) as f64 / 40.0).min(1.0)
    }

    /// Weighted indicator occurrences plus role synonym occurrences per word.
    pub fn page_density(&self, text: &str) -> f64 {
        let words = text.split_whitespace().count();
        if words == 0 {
            return 0.0;
        }

        let lower = text.to_lowercase();
        let hits = self.lexicon.indicator_weight_hits_lower(&lower)
            + self.lexicon.role_occurrences_lower(&lower);
        hits as f64 / words as f64
    }

    /// Secondary per-candidate quality on the 0-150 scale.
    pub fn candidate_quality(&self, text: &str) -> f64 {
        let lower = text.to_lowercase();
        let roles = self.lexicon.roles_in_lower(&lower).len();
        let terms = self.lexicon.competency_terms_in_lower(&lower).len();
        let structure = self.structure_score(text);

        (roles as f64 * 15.0 + terms as f64 * 5.0 + structure * 30.0).min(150.0)
    }
}
