use std::fmt;

use serde::Serialize;

use crate::model::DetailedAnalysis;

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Tier {
    Insufficient,
    Acceptable,
    Good,
    Excellent,
    Supreme,
}

impl Tier {
    pub fn from_score(score: f64, breakpoints: &TierBreakpoints) -> Self {
        if score >= breakpoints.supreme {
            Self::Supreme
        } else if score >= breakpoints.excellent {
            Self::Excellent
        } else if score >= breakpoints.good {
            Self::Good
        } else if score >= breakpoints.acceptable {
            Self::Acceptable
        } else {
            Self::Insufficient
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insufficient => "Insufficient",
            Self::Acceptable => "Acceptable",
            Self::Good => "Good",
            Self::Excellent => "Excellent",
            Self::Supreme => "Supreme",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub quality_score: f64,
    pub tier: Tier,
    pub description: String,
    pub failures: Vec<String>,
    pub analysis: DetailedAnalysis,
}

/// The measured content properties the quality score combines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityInputs {
    pub role_count: usize,
    /// 0-100.
    pub competency: f64,
    pub structure: f64,
    pub contamination: f64,
}

/// Scores refined content on the 0-150 scale and applies the
/// length-adapted acceptance thresholds.
#[derive(Debug, Clone)]
pub struct QualityValidator {
    thresholds: ValidationThresholds,
    tiers: TierBreakpoints,
}

impl QualityValidator {
    pub fn new(thresholds: ValidationThresholds, tiers: TierBreakpoints) -> Self {
        Self { thresholds, tiers }
    }

    /// Weighted score on the tier scale. Non-decreasing in roles,
    /// competency and structure; non-increasing in contamination.
    pub fn quality_score(&self, inputs: QualityInputs) -> f64 {
        let weights = &self.thresholds;
        let role_fraction = inputs.role_count.min(Role::ALL.len()) as f64 / Role::ALL.len() as f64;
        let percent = role_fraction * weights.role_weight
            + (inputs.competency.clamp(0.0, 100.0) / 100.0) * weights.competency_weight
            + inputs.structure.clamp(0.0, 1.0) * weights.structure_weight
            + (1.0 - inputs.contamination.clamp(0.0, 1.0)) * weights.cleanliness_weight;
        percent * self.tiers.scale / 100.0
    }

    pub fn tier(&self, quality_score: f64) -> Tier {
        Tier::from_score(quality_score, &self.tiers)
    }

    pub fn validate(&self, metrics: &TextMetrics, content: &str, page_range_size: usize) -> ValidationResult {
        let lexicon = metrics.lexicon();
        let lower = content.to_lowercase();
        let roles = lexicon.roles_in_lower(&lower);
        let term_counts = lexicon.term_counts(content);
        let competency = metrics.competency_content_score(content);
        let structure = metrics.structure_score(content);
        let contamination = metrics.contamination_level(content);
        let content_length = content.chars().count();

        let quality_score = self.quality_score(QualityInputs {
            role_count: roles.len(),
            competency,
            structure,
            contamination,
        });
        let tier = self.tier(quality_score);

        let adapted = self.thresholds.for_content_length(content_length);
        let mut failures = Vec::new();
        if roles.len() < adapted.min_roles {
            failures.push(format!(
                "found {} CanMEDS roles, need at least {}",
                roles.len(),
                adapted.min_roles
            ));
        }
        if competency < adapted.min_competency {
            failures.push(format!(
                "competency content score {:.0} below {:.0}",
                competency, adapted.min_competency
            ));
        }
        if content_length < adapted.min_length {
            failures.push(format!(
                "content length {} below {}",
                content_length, adapted.min_length
            ));
        }
        if contamination > adapted.max_contamination {
            failures.push(format!(
                "contamination {:.0}% above {:.0}%",
                contamination * 100.0,
                adapted.max_contamination * 100.0
            ));
        }
        if tier == Tier::Insufficient {
            failures.push(format!(
                "quality score {:.1} below {:.0}",
                quality_score, self.tiers.acceptable
            ));
        }

        let subject = if tier == Tier::Insufficient {
            "content"
        } else {
            "CanMEDS format"
        };
        let description = format!(
            "{} {} (score: {:.1}/{:.0}, {}/{} roles)",
            tier,
            subject,
            quality_score,
            self.tiers.scale,
            roles.len(),
            Role::ALL.len()
        );

        let analysis = DetailedAnalysis {
            role_count: roles.len(),
            roles_found: roles.iter().map(|role| role.canonical_name().to_string()).collect(),
            competency_terms_count: term_counts.len(),
            term_counts,
            has_structured_content: structure > self.thresholds.structured_content_cutoff,
            structure_score: structure,
            content_length,
            competency_type_score: competency.round() as u32,
            contamination_pct: (contamination * 100.0).round() as u32,
            page_range_size,
        };

        ValidationResult {
            is_valid: failures.is_empty(),
            quality_score,
            tier,
            description,
            failures,
            analysis,
        }
    }
}
