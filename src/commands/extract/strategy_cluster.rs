use anyhow::Result;

use super::*;

/// Runs of consecutive pages that are dense in competency vocabulary or name
/// several roles.
pub struct DensityClusterGenerator;

impl CandidateGenerator for DensityClusterGenerator {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DensityCluster
    }

    fn generate(&self, ctx: &ScanContext<'_>) -> Result<Vec<Candidate>> {
        ctx.ensure_pages(self.kind())?;

        let thresholds = ctx.thresholds();
        let page_count = ctx.doc.page_count();
        let mut densities = Vec::with_capacity(page_count);
        let mut hot = Vec::with_capacity(page_count);
        for page in 1..=page_count {
            let text = ctx.doc.page(page).unwrap_or_default();
            let density = ctx.metrics.page_density(text);
            let roles = ctx.lexicon().role_count(text);
            densities.push(density);
            hot.push(density > thresholds.density_threshold || roles >= thresholds.cluster_min_roles_per_page);
        }

        let mut candidates = Vec::new();
        for (start, end) in hot_runs(&hot) {
            if end + 1 - start < thresholds.cluster_min_pages {
                continue;
            }

            let content = ctx.doc.span_text(start, end);
            if content.chars().count() < thresholds.min_content_length {
                continue;
            }

            let run = &densities[start - 1..end];
            let mean_density = run.iter().sum::<f64>() / run.len() as f64;
            let confidence = (0.5 + 1.5 * mean_density).min(0.9);
            candidates.push(Candidate::assess(ctx, self.kind(), content, start, end, confidence));
        }

        Ok(candidates)
    }
}

/// Maximal runs of `true`, as inclusive 1-based page ranges.
pub fn hot_runs(hot: &[bool]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut run_start: Option<usize> = None;
    for (index, is_hot) in hot.iter().enumerate() {
        let page = index + 1;
        match (run_start, *is_hot) {
            (None, true) => run_start = Some(page),
            (Some(start), false) => {
                runs.push((start, page - 1));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        runs.push((start, hot.len()));
    }

    runs
}
