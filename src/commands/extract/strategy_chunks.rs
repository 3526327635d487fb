use anyhow::Result;

use super::*;

/// Fixed-size page chunks kept when their competency vocabulary is dense
/// enough.
pub struct SemanticChunkGenerator;

impl CandidateGenerator for SemanticChunkGenerator {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SemanticChunk
    }

    fn generate(&self, ctx: &ScanContext<'_>) -> Result<Vec<Candidate>> {
        ctx.ensure_pages(self.kind())?;

        let thresholds = ctx.thresholds();
        let page_count = ctx.doc.page_count();
        let size = chunk_size(page_count, thresholds);

        let mut candidates = Vec::new();
        let mut start = 1usize;
        while start <= page_count {
            let end = (start + size - 1).min(page_count);
            let content = ctx.doc.span_text(start, end);
            if !content.is_empty() {
                let score = ctx.metrics.semantic_score(&content);
                if score > thresholds.semantic_threshold {
                    candidates.push(Candidate::assess(ctx, self.kind(), content, start, end, score));
                }
            }
            start = end + 1;
        }

        Ok(candidates)
    }
}

pub fn chunk_size(page_count: usize, thresholds: &GeneratorThresholds) -> usize {
    let divisor = thresholds.chunk_page_divisor.max(1);
    (page_count / divisor)
        .min(thresholds.chunk_max_pages)
        .max(thresholds.chunk_min_pages)
        .max(1)
}
