use anyhow::Result;
use tracing::debug;

use super::*;

/// Coarse windows at the start, middle and end of the document. Only runs
/// when every primary strategy came back empty.
pub struct FallbackGenerator;

impl CandidateGenerator for FallbackGenerator {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Fallback
    }

    fn generate(&self, ctx: &ScanContext<'_>) -> Result<Vec<Candidate>> {
        ctx.ensure_pages(self.kind())?;

        let thresholds = ctx.thresholds();
        let page_count = ctx.doc.page_count();
        let mut candidates = Vec::new();

        for (start, end) in fallback_windows(
            page_count,
            thresholds.fallback_edge_pages,
            thresholds.fallback_middle_radius,
        ) {
            let content = ctx.doc.span_text(start, end);
            if content.chars().count() < thresholds.fallback_min_content_length {
                continue;
            }

            let roles = ctx.lexicon().role_count(&content);
            if roles == 0 {
                continue;
            }

            let confidence = 0.4 + roles as f64 * 0.05;
            candidates.push(Candidate::assess(ctx, self.kind(), content, start, end, confidence));
        }

        if candidates.is_empty() {
            // Running headers and footers are stripped during normalization;
            // a role named only there still counts.
            let normalized = ctx.doc.span_text(1, page_count);
            let content = if ctx.lexicon().mentions_any_role(&normalized) {
                Some(normalized)
            } else {
                let raw = ctx.doc.raw_span_text(1, page_count);
                ctx.lexicon().mentions_any_role(&raw).then_some(raw)
            };

            if let Some(content) = content {
                debug!(document = %ctx.doc.name, "no fallback window qualified, using whole document");
                candidates.push(Candidate::assess(ctx, self.kind(), content, 1, page_count, 0.3));
            }
        }

        Ok(candidates)
    }
}

/// Beginning, middle and end windows (1-based, inclusive), without repeats.
pub fn fallback_windows(page_count: usize, edge_pages: usize, middle_radius: usize) -> Vec<(usize, usize)> {
    if page_count == 0 {
        return Vec::new();
    }

    let edge = edge_pages.max(1);
    let middle = page_count / 2;
    let windows = [
        (1, edge.min(page_count)),
        (
            middle.saturating_sub(middle_radius).max(1),
            (middle + middle_radius).min(page_count),
        ),
        ((page_count + 1).saturating_sub(edge).max(1), page_count),
    ];

    let mut unique: Vec<(usize, usize)> = Vec::new();
    for window in windows {
        if window.0 <= window.1 && !unique.contains(&window) {
            unique.push(window);
        }
    }
    unique
}
