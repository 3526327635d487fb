use std::collections::BTreeMap;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use super::source::DocumentText;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DocumentFormat {
    AdvancedKeyEnabling,
    StandardCanmeds,
    BasicRoleBased,
    LegacyDottedToc,
    CanmedsWithoutLevels,
    Unknown,
}

impl DocumentFormat {
    pub fn label(self) -> &'static str {
        match self {
            Self::AdvancedKeyEnabling => "Advanced Key & Enabling",
            Self::StandardCanmeds => "Standard CanMEDS",
            Self::BasicRoleBased => "Basic Role-Based",
            Self::LegacyDottedToc => "Legacy Dotted TOC",
            Self::CanmedsWithoutLevels => "CanMEDS Without Levels",
            Self::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FormatDetection {
    pub format: DocumentFormat,
    pub confidence: f64,
    pub scores: BTreeMap<String, u32>,
    pub indicators: Vec<String>,
}

impl FormatDetection {
    fn unknown(scores: BTreeMap<String, u32>) -> Self {
        Self {
            format: DocumentFormat::Unknown,
            confidence: 0.0,
            scores,
            indicators: Vec::new(),
        }
    }
}

struct FormatProfile {
    format: DocumentFormat,
    patterns: Vec<(&'static str, Regex)>,
}

/// Guesses the layout family of a competency document from its opening
/// pages.
pub struct FormatDetector {
    profiles: Vec<FormatProfile>,
    level_marker: Regex,
    key_enabling: Regex,
    canmeds_mention: Regex,
    canmeds_competency: Regex,
    dotted_section: Regex,
}

const ROLE_NAMES: &str =
    r"(?:medical\s+expert|communicator|collaborator|leader|health\s+advocate|scholar|professional)";

impl FormatDetector {
    pub fn new() -> Result<Self> {
        let role_colon = format!(r"(?i){ROLE_NAMES}\s*:");
        let role_any = format!(r"(?i){ROLE_NAMES}");
        let profiles = vec![
            profile(
                DocumentFormat::AdvancedKeyEnabling,
                &[
                    ("key competencies", r"(?i)key\s+competenc"),
                    ("enabling competencies", r"(?i)enabling\s+competenc"),
                    ("level markers", r"\b(?:R[1-4]|F[1-2]|PGY[1-4])\b"),
                    ("EPAs", r"(?i)entrustable\s+professional\s+activities"),
                    ("milestones", r"(?i)milestones?"),
                    ("competency framework", r"(?i)competency\s+framework"),
                ],
            )?,
            profile(
                DocumentFormat::StandardCanmeds,
                &[
                    ("canmeds competencies", r"(?i)canmeds\s+competenc"),
                    ("role headers", role_colon.as_str()),
                    ("seven roles", r"(?i)seven\s+roles"),
                    ("competency domains", r"(?i)competency\s+domains?"),
                    ("professional competencies", r"(?i)professional\s+competenc"),
                ],
            )?,
            profile(
                DocumentFormat::BasicRoleBased,
                &[
                    ("role of the", r"(?i)role\s+of\s+the"),
                    ("as a role", r"(?i)as\s+a\s+(?:medical\s+expert|communicator|collaborator)"),
                    ("physician roles", r"(?i)physician\s+roles?"),
                    ("professional roles", r"(?i)professional\s+roles?"),
                ],
            )?,
            profile(
                DocumentFormat::LegacyDottedToc,
                &[
                    ("dotted headings", r"(?m)^\s*\d+\.\d+\s+[A-Z]"),
                    ("three-level numbering", r"(?m)^\s*\d+\.\d+\.\d+\s+"),
                    ("table of contents", r"(?i)table\s+of\s+contents?"),
                    ("numbered caps headings", r"(?m)^\s*\d+\.\s+[A-Z][A-Z \t]+$"),
                ],
            )?,
            profile(
                DocumentFormat::CanmedsWithoutLevels,
                &[
                    ("role names", role_any.as_str()),
                    ("physician competencies", r"(?i)physician\s+competenc"),
                ],
            )?,
        ];

        Ok(Self {
            profiles,
            level_marker: Regex::new(r"\b(?:R[1-4]|F[1-2]|PGY[1-4])\b")
                .context("failed to compile level marker regex")?,
            key_enabling: Regex::new(r"(?i)(?:key|enabling)\s+competenc")
                .context("failed to compile key/enabling regex")?,
            canmeds_mention: Regex::new(r"(?i)canmeds").context("failed to compile canmeds regex")?,
            canmeds_competency: Regex::new(r"(?i)canmeds\s+competenc")
                .context("failed to compile canmeds competency regex")?,
            dotted_section: Regex::new(r"(?m)^\s*\d+\.\d+").context("failed to compile dotted regex")?,
        })
    }

    /// Text of the first `sample_pages` pages.
    pub fn sample(doc: &DocumentText, sample_pages: usize) -> String {
        doc.span_text(1, sample_pages.min(doc.page_count()))
    }

    pub fn detect(&self, sample: &str) -> FormatDetection {
        let mut scores = BTreeMap::new();
        let mut indicators_by_format = Vec::new();
        let mut best: Option<(DocumentFormat, u32)> = None;
        let mut total = 0u32;

        for profile in &self.profiles {
            let mut score = 0u32;
            let mut indicators = Vec::new();
            for (label, regex) in &profile.patterns {
                let matches = regex.find_iter(sample).count();
                if matches > 0 {
                    score += matches as u32 * 10;
                    indicators.push(format!("{label} ({matches} matches)"));
                }
            }

            let (bonus, bonus_indicators) = self.format_bonus(profile.format, sample);
            score += bonus;
            indicators.extend(bonus_indicators);

            scores.insert(profile.format.label().to_string(), score);
            total += score;
            if best.map(|(_, top)| score > top).unwrap_or(true) {
                best = Some((profile.format, score));
            }
            indicators_by_format.push((profile.format, indicators));
        }

        let Some((format, top)) = best.filter(|(_, top)| *top > 0) else {
            return FormatDetection::unknown(scores);
        };

        let mut confidence = top as f64 / total as f64;
        if top > 50 {
            confidence = (confidence * 1.2).min(1.0);
        }
        let indicators = indicators_by_format
            .into_iter()
            .find(|(candidate, _)| *candidate == format)
            .map(|(_, indicators)| indicators)
            .unwrap_or_default();

        FormatDetection {
            format,
            confidence,
            scores,
            indicators,
        }
    }

    fn format_bonus(&self, format: DocumentFormat, sample: &str) -> (u32, Vec<String>) {
        let mut bonus = 0;
        let mut indicators = Vec::new();
        match format {
            DocumentFormat::AdvancedKeyEnabling => {
                let levels = self.level_marker.find_iter(sample).count();
                if levels > 5 {
                    bonus += 20;
                    indicators.push(format!("multiple level indicators ({levels})"));
                }
                let key_enabling = self.key_enabling.find_iter(sample).count();
                if key_enabling > 3 {
                    bonus += 15;
                    indicators.push(format!("key/enabling structure ({key_enabling})"));
                }
            }
            DocumentFormat::StandardCanmeds => {
                let mentions = self.canmeds_mention.find_iter(sample).count();
                if mentions > 3 {
                    bonus += 20;
                    indicators.push(format!("CanMEDS references ({mentions})"));
                }
                let lower = sample.to_lowercase();
                if lower.contains("seven roles") || lower.contains("7 roles") {
                    bonus += 15;
                    indicators.push("seven roles structure".to_string());
                }
            }
            DocumentFormat::LegacyDottedToc => {
                let sections = self.dotted_section.find_iter(sample).count();
                if sections > 10 {
                    bonus += 25;
                    indicators.push(format!("hierarchical numbering ({sections} sections)"));
                }
            }
            DocumentFormat::CanmedsWithoutLevels => {
                // "CanMEDS" that does not introduce a competency list.
                let bare = self
                    .canmeds_mention
                    .find_iter(sample)
                    .count()
                    .saturating_sub(self.canmeds_competency.find_iter(sample).count());
                if bare > 0 {
                    bonus += bare as u32 * 10;
                    indicators.push(format!("bare CanMEDS mentions ({bare})"));
                }
            }
            DocumentFormat::BasicRoleBased | DocumentFormat::Unknown => {}
        }
        (bonus, indicators)
    }
}

fn profile(format: DocumentFormat, patterns: &[(&'static str, &str)]) -> Result<FormatProfile> {
    let patterns = patterns
        .iter()
        .map(|(label, pattern)| {
            Regex::new(pattern)
                .with_context(|| format!("failed to compile {} pattern {pattern}", format.label()))
                .map(|regex| (*label, regex))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(FormatProfile { format, patterns })
}
