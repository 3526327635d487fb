use std::collections::HashSet;

use anyhow::{Result, bail};
use tracing::debug;

use super::outline::OutlineEntry;
use super::*;

/// Follows outline entries whose titles read like a competency section.
pub struct TocGuidedGenerator;

impl CandidateGenerator for TocGuidedGenerator {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TocGuided
    }

    fn generate(&self, ctx: &ScanContext<'_>) -> Result<Vec<Candidate>> {
        ctx.ensure_pages(self.kind())?;

        let doc = ctx.doc;
        let thresholds = ctx.thresholds();
        let outline = &doc.outline;
        if let Some(entry) = outline.iter().find(|entry| entry.level == 0) {
            bail!(
                "malformed outline in {}: entry {:?} has level 0",
                doc.name,
                entry.title
            );
        }

        let page_count = doc.page_count();
        let mut seen_ranges = HashSet::new();
        let mut candidates = Vec::new();

        for (index, entry) in outline.iter().enumerate() {
            let title = entry.title.to_lowercase();
            if !thresholds
                .toc_header_phrases
                .iter()
                .any(|phrase| title.contains(phrase.as_str()))
            {
                continue;
            }

            if entry.page == 0 || entry.page > page_count {
                debug!(
                    document = %doc.name,
                    title = %entry.title,
                    page = entry.page,
                    "outline entry points outside the document"
                );
                continue;
            }

            let start = entry.page;
            let end = section_end(
                &outline[index + 1..],
                entry.level,
                start,
                page_count,
                thresholds.toc_default_span_pages,
            );
            if !seen_ranges.insert((start, end)) {
                continue;
            }

            if !window_has_competency_signal(ctx, start) {
                debug!(
                    document = %doc.name,
                    title = %entry.title,
                    page = start,
                    "outline match rejected: no competency content near target page"
                );
                continue;
            }

            let content = doc.span_text(start, end);
            if content.chars().count() < thresholds.min_content_length {
                continue;
            }

            let roles = ctx.lexicon().role_count(&content);
            let confidence = title_confidence(&title, roles);
            candidates.push(Candidate::assess(
                ctx,
                self.kind(),
                content,
                start,
                end,
                confidence,
            ));
        }

        Ok(candidates)
    }
}

/// Last page of a section: the page before the next later entry at the same
/// or a shallower level, otherwise a default span from the start.
pub fn section_end(
    later_entries: &[OutlineEntry],
    level: u32,
    start: usize,
    page_count: usize,
    default_span: usize,
) -> usize {
    later_entries
        .iter()
        .find(|entry| entry.level <= level && entry.page > start)
        .map(|entry| (entry.page - 1).max(start))
        .unwrap_or_else(|| (start + default_span.max(1) - 1).min(page_count))
        .min(page_count)
        .max(start)
}

fn window_has_competency_signal(ctx: &ScanContext<'_>, start: usize) -> bool {
    let thresholds = ctx.thresholds();
    let first = start.saturating_sub(thresholds.toc_window_before).max(1);
    let last = (start + thresholds.toc_window_after).min(ctx.doc.page_count());

    let mut role_mentions = 0usize;
    let mut term_hits = 0usize;
    for page in first..=last {
        let Some(text) = ctx.doc.page(page) else {
            continue;
        };
        let lower = text.to_lowercase();
        role_mentions += ctx.lexicon().roles_in_lower(&lower).len();
        term_hits += ctx.lexicon().competency_terms_in_lower(&lower).len();
    }

    role_mentions >= thresholds.toc_min_role_mentions
        || term_hits >= thresholds.toc_min_competency_terms
}

fn title_confidence(title_lower: &str, roles: usize) -> f64 {
    let mut confidence = 0.6;
    if title_lower.contains("competenc") {
        confidence += 0.2;
    }
    if title_lower.contains("canmeds") {
        confidence += 0.2;
    }
    if title_lower.contains("learning outcome") {
        confidence += 0.15;
    }
    confidence += (roles as f64 * 0.05).min(0.3);

    confidence.min(1.0)
}
