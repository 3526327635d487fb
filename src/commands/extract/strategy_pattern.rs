use anyhow::{Context, Result};
use regex::Regex;

use super::*;

const SECTION_PATTERNS: &[&str] = &[
    r"(?i)(?:canmeds|can-meds)\s+(?:competenc|role|domain|framework|standard)",
    r"(?i)(?:seven|7)\s+(?:role|competenc|domain).*(?:canmeds|framework)",
    r"(?i)(?:competenc|learning\s+outcome).*(?:framework|matrix|domain|standard)",
    r"(?i)(?:medical\s+expert|communicator|collaborator|leader|health\s+advocate|scholar|professional)\s*:",
    r"(?i)(?:role\s+of\s+the|as\s+a)\s+(?:medical\s+expert|communicator|collaborator)",
    r"(?i)\d+\.\d+.*(?:competenc|skill|ability|proficiency|outcome)",
    r"(?i)(?:upon\s+completion|by\s+the\s+end|graduates?\s+(?:will|must|should))",
    r"(?i)(?:assessment\s+of|evaluation\s+of).*(?:competenc|skill|ability)",
    r"(?i)(?:training\s+objective|educational\s+objective|learning\s+goal)",
    r"(?i)(?:performance\s+indicator|assessment\s+criteri|evaluation\s+standard)",
];

/// Slack past the section cap so a boundary line straddling it still matches.
const BOUNDARY_LOOKAHEAD: usize = 256;

/// Scans the concatenated text for competency section openers and cuts each
/// section at the next structural boundary.
pub struct PatternGenerator {
    section_patterns: Vec<Regex>,
    closing_heading: Regex,
    numbered_heading: Regex,
    caps_heading: Regex,
}

impl PatternGenerator {
    pub fn new() -> Result<Self> {
        let section_patterns = SECTION_PATTERNS
            .iter()
            .map(|pattern| {
                Regex::new(pattern).with_context(|| format!("failed to compile section pattern {pattern}"))
            })
            .collect::<Result<Vec<Regex>>>()?;

        Ok(Self {
            section_patterns,
            closing_heading: Regex::new(r"(?i)\n[ \t]*(?:references?|bibliography|appendix)[ \t]*\n")
                .context("failed to compile closing heading regex")?,
            numbered_heading: Regex::new(r"\n[ \t]*\d+\.[ \t]+[A-Z][^:\n]{15,}[ \t]*\n")
                .context("failed to compile numbered heading regex")?,
            caps_heading: Regex::new(r"\n[ \t]*([A-Z][A-Z \t]{8,}):[ \t]*\n")
                .context("failed to compile caps heading regex")?,
        })
    }

    /// Byte offset (absolute) where the section opened at `start` ends.
    fn section_end(&self, ctx: &ScanContext<'_>, text: &str, start: usize) -> usize {
        let thresholds = ctx.thresholds();
        let search_end = floor_char_boundary(
            text,
            start + thresholds.pattern_max_section_chars + BOUNDARY_LOOKAHEAD,
        );
        let window = &text[start..search_end];
        let min_offset = thresholds.pattern_min_section_chars;

        let mut boundary = window.len();
        for regex in [&self.closing_heading, &self.numbered_heading] {
            if let Some(found) = regex.find_iter(window).find(|found| found.start() > min_offset) {
                boundary = boundary.min(found.start());
            }
        }

        let lexicon = ctx.lexicon();
        let caps_boundary = self.caps_heading.captures_iter(window).find_map(|captures| {
            let whole = captures.get(0)?;
            let label = captures.get(1)?.as_str();
            let names_competency = lexicon.mentions_any_role(label)
                || !lexicon.competency_terms_in(label).is_empty();
            (whole.start() > min_offset && !names_competency).then_some(whole.start())
        });
        if let Some(found) = caps_boundary {
            boundary = boundary.min(found);
        }

        floor_char_boundary(text, start + boundary.min(thresholds.pattern_max_section_chars))
    }
}

impl CandidateGenerator for PatternGenerator {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PatternBased
    }

    fn generate(&self, ctx: &ScanContext<'_>) -> Result<Vec<Candidate>> {
        ctx.ensure_pages(self.kind())?;

        let thresholds = ctx.thresholds();
        let concatenated = ctx.doc.concatenated();
        let text = concatenated.text.as_str();
        let mut candidates = Vec::new();

        'patterns: for regex in &self.section_patterns {
            let mut previous_end = 0usize;
            for found in regex.find_iter(text) {
                if candidates.len() >= thresholds.pattern_max_candidates {
                    break 'patterns;
                }

                let start = found.start();
                if start < previous_end {
                    continue;
                }

                let end = self.section_end(ctx, text, start);
                previous_end = end;

                let content = text[start..end].trim();
                if content.chars().count() < thresholds.min_content_length {
                    continue;
                }

                let lower = content.to_lowercase();
                let roles = ctx.lexicon().roles_in_lower(&lower).len();
                let terms = ctx.lexicon().competency_terms_in_lower(&lower).len();
                let confidence = 0.75 + roles as f64 * 0.05 + terms as f64 * 0.02;

                let start_page = concatenated.page_at(start);
                let end_page = concatenated.page_at(end.saturating_sub(1).max(start));
                candidates.push(Candidate::assess(
                    ctx,
                    self.kind(),
                    content.to_string(),
                    start_page,
                    end_page,
                    confidence,
                ));
            }
        }

        Ok(candidates)
    }
}

/// Largest char boundary of `text` not after `index`.
pub fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }

    let mut boundary = index;
    while !text.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}
