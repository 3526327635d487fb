use tracing::debug;

use super::*;

/// Weighted composite over confidence, role coverage, cleanliness, method
/// priority and length.
#[derive(Debug, Clone)]
pub struct CandidateScorer {
    weights: ScoringWeights,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub candidate: Candidate,
    pub score: f64,
    pub considered: usize,
}

impl CandidateScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn score(&self, candidate: &Candidate) -> f64 {
        let weights = &self.weights;
        let role_fraction = candidate.role_coverage.min(Role::ALL.len()) as f64 / Role::ALL.len() as f64;
        let cleanliness = 1.0 - candidate.contamination_level.clamp(0.0, 1.0);
        let length_fraction = (candidate.content.chars().count() as f64
            / weights.length_saturation_chars as f64)
            .min(1.0);

        weights.confidence * candidate.confidence_score
            + weights.role_coverage * role_fraction
            + weights.cleanliness * cleanliness
            + weights.method_priority * candidate.extraction_method.priority()
            + weights.content_length * length_fraction
    }

    /// Highest-scoring non-empty candidate; ties keep the earlier one.
    pub fn select_best(&self, candidates: Vec<Candidate>) -> Option<Selection> {
        let considered = candidates.len();
        let mut best: Option<(Candidate, f64)> = None;

        for candidate in candidates {
            if candidate.content.trim().is_empty() {
                continue;
            }

            let score = self.score(&candidate);
            debug!(
                method = candidate.extraction_method.as_str(),
                pages = %candidate.page_range(),
                score,
                "scored candidate"
            );
            let better = best.as_ref().map(|(_, top)| score > *top).unwrap_or(true);
            if better {
                best = Some((candidate, score));
            }
        }

        best.map(|(candidate, score)| Selection {
            candidate,
            score,
            considered,
        })
    }
}
