use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use super::StrategyKind;

/// Every threshold, weight and breakpoint the pipeline uses.
///
/// Loaded once, validated, then shared read-only by every component. A JSON
/// override file may set any subset of fields; the rest keep their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub strategies: StrategySelection,
    pub generators: GeneratorThresholds,
    pub scoring: ScoringWeights,
    pub refiner: RefinerSettings,
    pub validation: ValidationThresholds,
    pub tiers: TierBreakpoints,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySelection {
    pub primary: Vec<StrategyKind>,
}

impl Default for StrategySelection {
    fn default() -> Self {
        Self {
            primary: vec![
                StrategyKind::TocGuided,
                StrategyKind::PatternBased,
                StrategyKind::SemanticChunk,
                StrategyKind::DensityCluster,
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorThresholds {
    pub min_content_length: usize,
    pub toc_header_phrases: Vec<String>,
    pub toc_default_span_pages: usize,
    pub toc_window_before: usize,
    pub toc_window_after: usize,
    pub toc_min_role_mentions: usize,
    pub toc_min_competency_terms: usize,
    pub pattern_min_section_chars: usize,
    pub pattern_max_section_chars: usize,
    pub pattern_max_candidates: usize,
    pub chunk_min_pages: usize,
    pub chunk_max_pages: usize,
    pub chunk_page_divisor: usize,
    pub semantic_threshold: f64,
    pub density_threshold: f64,
    pub cluster_min_roles_per_page: usize,
    pub cluster_min_pages: usize,
    pub fallback_edge_pages: usize,
    pub fallback_middle_radius: usize,
    pub fallback_min_content_length: usize,
}

impl Default for GeneratorThresholds {
    fn default() -> Self {
        Self {
            min_content_length: 800,
            toc_header_phrases: [
                "competenc",
                "canmeds",
                "learning outcome",
                "objective",
                "skill",
                "proficiency",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            toc_default_span_pages: 30,
            toc_window_before: 2,
            toc_window_after: 3,
            toc_min_role_mentions: 1,
            toc_min_competency_terms: 2,
            pattern_min_section_chars: 800,
            pattern_max_section_chars: 40_000,
            pattern_max_candidates: 24,
            chunk_min_pages: 3,
            chunk_max_pages: 10,
            chunk_page_divisor: 12,
            semantic_threshold: 0.65,
            density_threshold: 0.08,
            cluster_min_roles_per_page: 3,
            cluster_min_pages: 3,
            fallback_edge_pages: 25,
            fallback_middle_radius: 10,
            fallback_min_content_length: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub confidence: f64,
    pub role_coverage: f64,
    pub cleanliness: f64,
    pub method_priority: f64,
    pub content_length: f64,
    pub length_saturation_chars: usize,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            confidence: 0.25,
            role_coverage: 0.30,
            cleanliness: 0.20,
            method_priority: 0.15,
            content_length: 0.10,
            length_saturation_chars: 10_000,
        }
    }
}

impl ScoringWeights {
    fn total(&self) -> f64 {
        self.confidence
            + self.role_coverage
            + self.cleanliness
            + self.method_priority
            + self.content_length
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinerSettings {
    pub watermark_phrases: Vec<String>,
    pub min_line_chars: usize,
}

impl Default for RefinerSettings {
    fn default() -> Self {
        Self {
            watermark_phrases: vec![
                "saudi commission for health specialties".to_string(),
                "royal college of physicians and surgeons".to_string(),
            ],
            min_line_chars: 3,
        }
    }
}

/// Acceptance bar for refined content. The role and competency minimums
/// relax below the short-content cut-offs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationThresholds {
    pub short_content_chars: usize,
    pub min_roles_short: usize,
    pub min_roles: usize,
    pub brief_content_chars: usize,
    pub min_competency_brief: f64,
    pub min_competency: f64,
    pub min_length: usize,
    pub max_contamination: f64,
    pub role_weight: f64,
    pub competency_weight: f64,
    pub structure_weight: f64,
    pub cleanliness_weight: f64,
    pub structured_content_cutoff: f64,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            short_content_chars: 5_000,
            min_roles_short: 1,
            min_roles: 2,
            brief_content_chars: 3_000,
            min_competency_brief: 25.0,
            min_competency: 35.0,
            min_length: 800,
            max_contamination: 0.20,
            role_weight: 40.0,
            competency_weight: 30.0,
            structure_weight: 15.0,
            cleanliness_weight: 15.0,
            structured_content_cutoff: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptedThresholds {
    pub min_roles: usize,
    pub min_competency: f64,
    pub min_length: usize,
    pub max_contamination: f64,
}

impl ValidationThresholds {
    pub fn for_content_length(&self, content_length: usize) -> AdaptedThresholds {
        let min_roles = if content_length < self.short_content_chars {
            self.min_roles_short
        } else {
            self.min_roles
        };
        let min_competency = if content_length < self.brief_content_chars {
            self.min_competency_brief
        } else {
            self.min_competency
        };

        AdaptedThresholds {
            min_roles,
            min_competency,
            min_length: self.min_length,
            max_contamination: self.max_contamination,
        }
    }

    fn weight_total(&self) -> f64 {
        self.role_weight + self.competency_weight + self.structure_weight + self.cleanliness_weight
    }
}

/// Lower bounds (on the 0-150 scale) of each tier above Insufficient.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierBreakpoints {
    pub scale: f64,
    pub acceptable: f64,
    pub good: f64,
    pub excellent: f64,
    pub supreme: f64,
}

impl Default for TierBreakpoints {
    fn default() -> Self {
        Self {
            scale: 150.0,
            acceptable: 70.0,
            good: 100.0,
            excellent: 130.0,
            supreme: 140.0,
        }
    }
}

impl ExtractionConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = fs::read(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                serde_json::from_slice::<ExtractionConfig>(&raw)
                    .with_context(|| format!("failed to parse {}", path.display()))?
            }
            None => ExtractionConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let scoring_total = self.scoring.total();
        if (scoring_total - 1.0).abs() > 1e-6 {
            bail!("scoring weights must sum to 1.0, got {scoring_total:.6}");
        }

        let validation_total = self.validation.weight_total();
        if (validation_total - 100.0).abs() > 1e-6 {
            bail!("validation weights must sum to 100, got {validation_total:.6}");
        }

        let tiers = &self.tiers;
        let ordered = [
            0.0,
            tiers.acceptable,
            tiers.good,
            tiers.excellent,
            tiers.supreme,
            tiers.scale,
        ];
        if ordered.windows(2).any(|pair| pair[0] >= pair[1]) {
            bail!(
                "tier breakpoints must be strictly increasing within (0, {}]: {:?}",
                tiers.scale,
                &ordered[1..5]
            );
        }

        if self.strategies.primary.contains(&StrategyKind::Fallback) {
            bail!("the fallback strategy runs automatically and cannot be listed as primary");
        }
        if self.scoring.length_saturation_chars == 0 {
            bail!("scoring.length_saturation_chars must be positive");
        }
        if self.generators.chunk_min_pages == 0 || self.generators.cluster_min_pages == 0 {
            bail!("chunk and cluster page minimums must be positive");
        }

        Ok(())
    }
}
