use anyhow::{Context, Result};
use regex::Regex;

use super::source::DocumentText;
use super::*;

const ROLE_ALTERNATION: &str =
    r"medical\s+expert|communicator|collaborator|leader|health\s+advocate|scholar|professional";

/// Cleans the winning candidate's text. Both passes are fixed points: running
/// one twice gives the same text as running it once.
#[derive(Debug)]
pub struct ContentRefiner {
    settings: RefinerSettings,
    wide_space: Regex,
    boilerplate: Regex,
    page_marker: Regex,
    exempt_short_line: Regex,
    role_header: Regex,
    inline_role_token: Regex,
    bullet_prefix: Regex,
    numbered_prefix: Regex,
}

impl ContentRefiner {
    pub fn new(settings: RefinerSettings) -> Result<Self> {
        Ok(Self {
            settings: RefinerSettings {
                watermark_phrases: settings
                    .watermark_phrases
                    .iter()
                    .map(|phrase| phrase.to_lowercase())
                    .collect(),
                min_line_chars: settings.min_line_chars,
            },
            wide_space: Regex::new(r"[ \t]*\t[ \t]*| {2,}").context("failed to compile spacing regex")?,
            boilerplate: Regex::new(r"(?i)copyright|©|all\s+rights\s+reserved|proprietary")
                .context("failed to compile boilerplate regex")?,
            page_marker: Regex::new(r"(?i)^(?:page\s+\d+(?:\s*(?:of|/)\s*\d+)?|\d+\s*(?:of|/)\s*\d+|\d{1,4})$")
                .context("failed to compile page marker regex")?,
            exempt_short_line: Regex::new(r"(?i)^(?:\d+(?:\.\d+)*\.?|[•\-\*▪◦‣]|[rf]\d+|pgy\d+|(?:level|year)\s*\d+)")
                .context("failed to compile short line exemption regex")?,
            role_header: Regex::new(&format!(r"(?i)^(?:{ROLE_ALTERNATION})\s*(?::|$)"))
                .context("failed to compile role header regex")?,
            inline_role_token: Regex::new(&format!(r"(?i)({ROLE_ALTERNATION})\s*:"))
                .context("failed to compile inline role regex")?,
            bullet_prefix: Regex::new(r"^[•\-\*▪◦‣]\s*").context("failed to compile bullet regex")?,
            numbered_prefix: Regex::new(r"^(\d+)\.\s*([^\d.\s].*)$")
                .context("failed to compile numbering regex")?,
        })
    }

    pub fn refine(&self, content: &str) -> String {
        let lines = content
            .replace("\r\n", "\n")
            .replace('\r', "\n")
            .split('\n')
            .map(|line| self.wide_space.replace_all(line.trim(), "  ").into_owned())
            .filter(|line| !self.is_boilerplate(line))
            .filter(|line| !self.is_short_noise(line))
            .collect::<Vec<String>>();

        let mut output: Vec<String> = Vec::with_capacity(lines.len());
        for line in lines {
            let previous_blank = output.last().map(|last| last.is_empty()).unwrap_or(true);
            if line.is_empty() {
                if !previous_blank {
                    output.push(line);
                }
                continue;
            }

            if self.role_header.is_match(&line) && !previous_blank {
                output.push(String::new());
            }
            output.push(line);
        }

        output.join("\n").trim().to_string()
    }

    /// Splits inline `ROLE:` tokens onto their own upper-case line and
    /// normalizes bullets and numbering, then runs the standard pass.
    pub fn refine_aggressive(&self, content: &str) -> String {
        let mut lines = Vec::new();
        for raw_line in content.replace("\r\n", "\n").replace('\r', "\n").split('\n') {
            for segment in self.split_role_tokens(raw_line.trim()) {
                lines.push(self.normalize_markers(&segment));
            }
        }

        self.refine(&lines.join("\n"))
    }

    fn split_role_tokens(&self, line: &str) -> Vec<String> {
        let mut segments = Vec::new();
        let mut cursor = 0usize;
        for captures in self.inline_role_token.captures_iter(line) {
            let (Some(whole), Some(role)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let before = line[cursor..whole.start()].trim();
            if before.chars().any(char::is_alphanumeric) {
                segments.push(before.to_string());
            }
            let role_name = role
                .as_str()
                .split_whitespace()
                .collect::<Vec<&str>>()
                .join(" ")
                .to_uppercase();
            segments.push(format!("{role_name}:"));
            cursor = whole.end();
        }

        let rest = line[cursor..].trim();
        if !rest.is_empty() || segments.is_empty() {
            segments.push(rest.to_string());
        }
        segments
    }

    fn normalize_markers(&self, line: &str) -> String {
        if self.bullet_prefix.is_match(line) {
            return self.bullet_prefix.replace(line, "• ").into_owned();
        }
        self.numbered_prefix.replace(line, "$1. $2").into_owned()
    }

    fn is_boilerplate(&self, line: &str) -> bool {
        if line.is_empty() {
            return false;
        }
        if self.boilerplate.is_match(line) || self.page_marker.is_match(line) {
            return true;
        }
        let lower = line.to_lowercase();
        self.settings
            .watermark_phrases
            .iter()
            .any(|phrase| !phrase.is_empty() && lower.contains(phrase.as_str()))
    }

    fn is_short_noise(&self, line: &str) -> bool {
        let visible = line.chars().filter(|character| !character.is_whitespace()).count();
        visible > 0 && visible < self.settings.min_line_chars && !self.exempt_short_line.is_match(line)
    }
}

/// Drops leading and trailing pages that mention neither a role nor a
/// competency term. Returns the narrowed range when it differs.
pub fn tighten_boundaries(
    candidate: &Candidate,
    doc: &DocumentText,
    lexicon: &RoleLexicon,
) -> Option<(usize, usize)> {
    if !candidate.extraction_method.is_page_aligned() {
        return None;
    }

    let has_signal = |page: usize| {
        doc.page(page)
            .map(|text| {
                let lower = text.to_lowercase();
                !lexicon.roles_in_lower(&lower).is_empty()
                    || !lexicon.competency_terms_in_lower(&lower).is_empty()
            })
            .unwrap_or(false)
    };

    let mut start = candidate.start_page;
    let mut end = candidate.end_page.min(doc.page_count());
    while start < end && !has_signal(start) {
        start += 1;
    }
    while end > start && !has_signal(end) {
        end -= 1;
    }

    if !has_signal(start) || (start, end) == (candidate.start_page, candidate.end_page) {
        return None;
    }
    Some((start, end))
}
