use std::fs;
use std::path::Path;

use crate::model::ExtractionReport;

use super::outline::{OutlineEntry, parse_outline_xml};
use super::source::{MemorySource, PageTextProvider, merge_hyphenated_lines};
use super::*;

const PROGRAM_FILLER: [(usize, &str); 7] = [
    (
        1,
        "Welcome to the internal medicine residency handbook.\nThe campus cafeteria opens at seven in the morning.\nParking permits are issued by the security office.",
    ),
    (
        2,
        "Orientation week starts on the first Monday of July.\nLockers are assigned on the second floor near the library.\nPlease bring photo identification to the badge desk.",
    ),
    (
        6,
        "PROGRAM LOGISTICS\nCall rooms are located beside the elevators on level four.\nMeal vouchers are available at the front desk.",
    ),
    (
        7,
        "Vacation requests go to the program coordinator by email.\nSick days must be reported before the shift begins.",
    ),
    (
        8,
        "The hospital shuttle runs every twenty minutes from the parking garage.\nBicycle racks are found near the north entrance.",
    ),
    (
        9,
        "Scrubs can be collected from the laundry window on weekdays.\nLost items are held at the information booth for a month.",
    ),
    (
        10,
        "Contact the program office with any questions about this handbook.\nThank you for joining the program this year.",
    ),
];

const COMPETENCY_PAGE_3: &str = "CANMEDS COMPETENCIES
The following core competencies and learning outcomes define the objectives of training.
MEDICAL EXPERT:
- Demonstrate clinical reasoning when forming a diagnosis for acute presentations.
- Perform a complete patient assessment and plan treatment using sound clinical judgment.
- Develop diagnostic skills across inpatient and ambulatory settings.
COMMUNICATOR:
- Establish rapport and show empathy during every patient interaction.
- Deliver patient education that families can act upon at home.
- Document encounters with clear and timely written communication.";

const COMPETENCY_PAGE_4: &str = "COLLABORATOR:
- Work within interprofessional teams to coordinate collaborative care.
- Request consultation and referral when the clinical question requires it.
- Negotiate shared plans during team dynamics discussions on the ward.
LEADER:
- Contribute to quality improvement projects and resource management.
- Apply principles of healthcare systems design to daily work.
- Demonstrate leadership during handover and delegation of tasks.
HEALTH ADVOCATE:
- Address social determinants of health for each patient population served.
- Support health promotion and disease prevention in the local community.";

const COMPETENCY_PAGE_5: &str = "SCHOLAR:
- Engage in lifelong learning and critical appraisal of published evidence.
- Contribute to research and the teaching of junior colleagues.
- Apply evidence-based medicine to questions that arise during rounds.
PROFESSIONAL:
- Demonstrate integrity, accountability and commitment to patients.
- Maintain confidentiality and ethical practice at all times.
- Achieve the milestones and key competencies; entrustable professional activities are reviewed twice a year.";

const TWO_ROLE_PAGE: &str = "COMMUNICATOR:
- Demonstrate active listening skills during every clinical interview.
- Build rapport with families and respond with empathy to their concerns.
- Provide patient education using plain language and teach-back.
- Explain test results and document each discussion clearly in the chart.
- Adapt communication for interpreters and for people with hearing loss.
- Deliver difficult news in a quiet setting and check understanding.
SCHOLAR:
- Develop a personal learning plan with clear learning objectives.
- Perform critical appraisal of one journal article each month.
- Contribute to teaching of junior trainees on the ward.
- Apply evidence-based guidelines to daily decisions.
- Present a scholarly activity at the annual resident day.
- Achieve the learning outcomes and core competencies listed for each year of training.
- Track skills and milestones in the electronic portfolio.";

const REFERENCE_PAGES: [&str; 3] = [
    "REFERENCES\n1. Smith J, Brown K. Cardiac output in marathon runners. Heart J. 2019;12:45-50.\n2. Lee A, et al. Renal function after dehydration. Kidney Rev. 2020;8:101-109.",
    "3. Patel R, Ng T. Sleep duration among night shift nurses. Sleep Med. 2018;4:12-19.\n4. Garcia M, et al. Iron levels in endurance athletes. Blood Rev. 2021;15:200-207.",
    "5. Chen L. Vitamin D status in northern cities. Bone J. 2017;3:33-38.\n6. Okafor B, et al. Hydration habits of office workers. Nutr Rep. 2022;9:70-75.",
];

fn document(name: &str, pages: &[&str], outline: Vec<OutlineEntry>) -> DocumentText {
    let source = MemorySource::new(name, pages.iter().map(|page| page.to_string()).collect())
        .with_outline(outline);
    DocumentText::load(&source, PageNormalization::default()).expect("load memory document")
}

fn program_handbook_pages() -> Vec<&'static str> {
    let mut pages = vec![""; 10];
    for (page, text) in PROGRAM_FILLER {
        pages[page - 1] = text;
    }
    pages[2] = COMPETENCY_PAGE_3;
    pages[3] = COMPETENCY_PAGE_4;
    pages[4] = COMPETENCY_PAGE_5;
    pages
}

fn program_handbook_outline() -> Vec<OutlineEntry> {
    vec![
        OutlineEntry::new(1, "Introduction", 1),
        OutlineEntry::new(1, "CanMEDS Competencies", 3),
        OutlineEntry::new(1, "Program Logistics", 6),
    ]
}

fn program_handbook() -> DocumentText {
    document(
        "handbook.pdf",
        &program_handbook_pages(),
        program_handbook_outline(),
    )
}

fn extractor() -> Extractor {
    Extractor::new(ExtractionConfig::default()).expect("default extractor")
}

fn metrics() -> TextMetrics {
    TextMetrics::new(RoleLexicon::standard()).expect("metrics")
}

fn candidate(content: &str, method: StrategyKind, confidence: f64, roles: usize) -> Candidate {
    Candidate {
        content: content.to_string(),
        start_page: 1,
        end_page: 1,
        confidence_score: confidence,
        extraction_method: method,
        role_coverage: roles,
        contamination_level: 0.0,
        quality_score: 0.0,
    }
}

struct UnreadableSource;

impl PageTextProvider for UnreadableSource {
    fn name(&self) -> &str {
        "locked.pdf"
    }

    fn page_count(&self) -> usize {
        2
    }

    fn outline(&self) -> anyhow::Result<Vec<OutlineEntry>> {
        Ok(Vec::new())
    }

    fn page_text(&self, page_index: usize) -> anyhow::Result<String> {
        anyhow::bail!("page {page_index} is encrypted")
    }
}

#[test]
fn toc_section_with_all_roles_is_extracted_as_supreme() {
    let extraction = extractor().extract(&program_handbook());

    assert!(extraction.is_successful(), "{:?}", extraction.failure);
    let winner = extraction.winner.as_ref().expect("winner");
    assert_eq!(winner.extraction_method, StrategyKind::TocGuided);
    assert_eq!(winner.page_range(), "3-5");
    assert!(!extraction.enhancement_applied);

    let validation = extraction.validation.as_ref().expect("validation");
    assert_eq!(validation.tier, Tier::Supreme);
    assert!((validation.quality_score - 150.0).abs() < 1e-9);
    assert_eq!(
        validation.description,
        "Supreme CanMEDS format (score: 150.0/150, 7/7 roles)"
    );
    assert_eq!(winner.role_coverage, 7);
    assert_eq!(winner.role_coverage, validation.analysis.role_count);
    assert_eq!(validation.analysis.page_range_size, 3);
    assert!(validation.analysis.has_structured_content);

    let selection_score = extraction.selection_score.expect("selection score");
    assert!(selection_score > 0.9 && selection_score < 0.93, "{selection_score}");
    assert!(extraction.candidates_considered > 1);
    assert!(winner.content.contains("\n\nCOMMUNICATOR:\n"));
}

#[test]
fn reference_only_document_reports_no_candidates() {
    let doc = document("references.pdf", &REFERENCE_PAGES, Vec::new());
    let extraction = extractor().extract(&doc);

    assert!(!extraction.is_successful());
    assert!(matches!(
        extraction.failure,
        Some(ExtractionFailure::NoCandidates)
    ));
    assert!(extraction.winner.is_none());

    let report = build_report(&extraction, Path::new("references.pdf"), None);
    assert_eq!(
        report.failure_reason.as_deref(),
        Some("No competency candidates found")
    );
    assert_eq!(
        report.validation,
        "Extraction failed: No competency candidates found"
    );
    assert_eq!(report.content_length, 0);
}

#[test]
fn short_two_role_document_passes_with_relaxed_thresholds() {
    let doc = document("short.pdf", &[TWO_ROLE_PAGE], Vec::new());
    let extraction = extractor().extract(&doc);

    assert!(extraction.is_successful(), "{:?}", extraction.failure);
    let validation = extraction.validation.as_ref().expect("validation");
    assert!(validation.tier >= Tier::Acceptable);
    assert_eq!(validation.analysis.role_count, 2);
    assert_eq!(
        extraction.winner.as_ref().map(|winner| winner.role_coverage),
        Some(2)
    );

    let thresholds = ValidationThresholds::default();
    assert_eq!(thresholds.for_content_length(1_200).min_roles, 1);
    assert_eq!(thresholds.for_content_length(6_000).min_roles, 2);
    assert_eq!(thresholds.for_content_length(1_200).min_competency, 25.0);
    assert_eq!(thresholds.for_content_length(3_000).min_competency, 35.0);
}

#[test]
fn fallback_runs_when_primaries_find_nothing_and_rejection_is_final() {
    let doc = document(
        "clinic.pdf",
        &[
            "Clinic hours run from eight until four on weekdays.\nGood communication with the front desk keeps the schedule on time.",
            "The waiting room was repainted last spring.\nNew chairs arrived in the autumn.",
        ],
        Vec::new(),
    );
    let extraction = extractor().extract(&doc);

    let winner = extraction.winner.as_ref().expect("fallback winner");
    assert_eq!(winner.extraction_method, StrategyKind::Fallback);
    // The page without any role mention is trimmed off the whole-document span.
    assert_eq!(winner.page_range(), "1-1");
    assert!(extraction.enhancement_applied);
    assert_eq!(winner.role_coverage, 1);

    match &extraction.failure {
        Some(ExtractionFailure::Validation {
            description,
            role_count,
            ..
        }) => {
            assert_eq!(*role_count, 1);
            assert!(description.contains("1/7 roles"), "{description}");
            assert!(description.starts_with("Insufficient content"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn unreadable_source_becomes_source_read_failure() {
    let extraction = extractor().process_document(&UnreadableSource);

    assert!(matches!(
        extraction.failure,
        Some(ExtractionFailure::SourceRead(_))
    ));
    assert_eq!(extraction.document, "locked.pdf");
    assert_eq!(extraction.total_pages, 0);
}

#[test]
fn malformed_outline_fails_toc_strategy_without_aborting_generation() {
    let doc = document(
        "malformed.pdf",
        &["Good communication with families matters on every ward round."],
        vec![OutlineEntry::new(0, "Competencies", 1)],
    );
    let metrics = metrics();
    let config = ExtractionConfig::default();
    let ctx = ScanContext {
        doc: &doc,
        metrics: &metrics,
        config: &config,
    };

    assert!(TocGuidedGenerator.generate(&ctx).is_err());

    let primaries: Vec<Box<dyn CandidateGenerator>> = vec![Box::new(TocGuidedGenerator)];
    let candidates = generate_candidates(&primaries, &FallbackGenerator, &ctx);
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].extraction_method, StrategyKind::Fallback);
    assert!((candidates[0].confidence_score - 0.3).abs() < 1e-9);
}

#[test]
fn toc_strategy_skips_out_of_range_and_unsupported_entries_and_dedupes_ranges() {
    let pages = program_handbook_pages();
    let metrics = metrics();
    let config = ExtractionConfig::default();

    let out_of_range = document(
        "a.pdf",
        &pages,
        vec![OutlineEntry::new(1, "Competencies", 99)],
    );
    let ctx = ScanContext {
        doc: &out_of_range,
        metrics: &metrics,
        config: &config,
    };
    assert!(TocGuidedGenerator.generate(&ctx).expect("toc").is_empty());

    let no_signal = document(
        "b.pdf",
        &pages,
        vec![OutlineEntry::new(1, "Learning Objectives", 8)],
    );
    let ctx = ScanContext {
        doc: &no_signal,
        metrics: &metrics,
        config: &config,
    };
    assert!(TocGuidedGenerator.generate(&ctx).expect("toc").is_empty());

    let duplicated = document(
        "c.pdf",
        &pages,
        vec![
            OutlineEntry::new(1, "CanMEDS Competencies", 3),
            OutlineEntry::new(2, "Competency Framework", 3),
            OutlineEntry::new(1, "Program Logistics", 6),
        ],
    );
    let ctx = ScanContext {
        doc: &duplicated,
        metrics: &metrics,
        config: &config,
    };
    let candidates = TocGuidedGenerator.generate(&ctx).expect("toc");
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].page_range(), "3-5");
    assert!((candidates[0].confidence_score - 1.0).abs() < 1e-9);
}

#[test]
fn section_end_uses_next_entry_at_same_or_shallower_level() {
    let later = vec![
        OutlineEntry::new(2, "Medical Expert", 4),
        OutlineEntry::new(1, "Assessment", 9),
    ];
    assert_eq!(section_end(&later, 1, 3, 40, 30), 8);
    assert_eq!(section_end(&later, 2, 3, 40, 30), 3);
    assert_eq!(section_end(&[], 1, 3, 40, 30), 32);
    assert_eq!(section_end(&[], 1, 35, 40, 30), 40);
}

#[test]
fn pattern_strategy_maps_offsets_back_to_pages() {
    let doc = document("short.pdf", &[TWO_ROLE_PAGE], Vec::new());
    let metrics = metrics();
    let config = ExtractionConfig::default();
    let ctx = ScanContext {
        doc: &doc,
        metrics: &metrics,
        config: &config,
    };

    let candidates = PatternGenerator::new()
        .expect("patterns")
        .generate(&ctx)
        .expect("pattern candidates");
    assert!(!candidates.is_empty());
    assert!(candidates.iter().all(|candidate| candidate.page_range() == "1-1"));
    assert!(candidates[0].content.starts_with("COMMUNICATOR:"));
    assert_eq!(candidates[0].role_coverage, 2);
}

#[test]
fn density_cluster_finds_the_competency_run() {
    let doc = program_handbook();
    let metrics = metrics();
    let config = ExtractionConfig::default();
    let ctx = ScanContext {
        doc: &doc,
        metrics: &metrics,
        config: &config,
    };

    let candidates = DensityClusterGenerator.generate(&ctx).expect("clusters");
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].page_range(), "3-5");
    assert!(candidates[0].confidence_score <= 0.9);
}

#[test]
fn window_and_run_helpers_cover_edges() {
    assert_eq!(
        fallback_windows(100, 25, 10),
        vec![(1, 25), (40, 60), (76, 100)]
    );
    assert_eq!(fallback_windows(10, 25, 10), vec![(1, 10)]);
    assert!(fallback_windows(0, 25, 10).is_empty());

    let thresholds = GeneratorThresholds::default();
    assert_eq!(chunk_size(10, &thresholds), 3);
    assert_eq!(chunk_size(60, &thresholds), 5);
    assert_eq!(chunk_size(240, &thresholds), 10);

    assert_eq!(
        hot_runs(&[true, true, false, true, true, true]),
        vec![(1, 2), (4, 6)]
    );
    assert!(hot_runs(&[false, false]).is_empty());

    assert_eq!(floor_char_boundary("aé", 2), 1);
    assert_eq!(floor_char_boundary("abc", 10), 3);
}

#[test]
fn strategies_reject_empty_documents() {
    let doc = document("empty.pdf", &[], Vec::new());
    let metrics = metrics();
    let config = ExtractionConfig::default();
    let ctx = ScanContext {
        doc: &doc,
        metrics: &metrics,
        config: &config,
    };

    assert!(SemanticChunkGenerator.generate(&ctx).is_err());
    assert!(FallbackGenerator.generate(&ctx).is_err());

    let extraction = extractor().extract(&doc);
    assert!(matches!(
        extraction.failure,
        Some(ExtractionFailure::NoCandidates)
    ));
}

#[test]
fn selector_skips_empty_content_and_keeps_first_on_ties() {
    let scorer = CandidateScorer::new(ScoringWeights::default());

    let empty = candidate("   ", StrategyKind::TocGuided, 1.0, 7);
    let weak = candidate("Communication matters.", StrategyKind::Fallback, 0.3, 1);
    let selection = scorer
        .select_best(vec![empty.clone(), weak.clone()])
        .expect("selection");
    assert_eq!(selection.candidate, weak);
    assert_eq!(selection.considered, 2);

    assert!(scorer.select_best(vec![empty]).is_none());
    assert!(scorer.select_best(Vec::new()).is_none());

    let mut first = candidate("Scholar", StrategyKind::PatternBased, 0.8, 1);
    first.start_page = 4;
    let mut second = first.clone();
    second.start_page = 9;
    let selection = scorer.select_best(vec![first, second]).expect("tie");
    assert_eq!(selection.candidate.start_page, 4);
}

#[test]
fn selection_score_combines_weighted_signals() {
    let scorer = CandidateScorer::new(ScoringWeights::default());

    let perfect = candidate(&"x".repeat(10_000), StrategyKind::TocGuided, 1.0, 7);
    assert!((scorer.score(&perfect) - 1.0).abs() < 1e-9);

    let mut dirty = candidate(&"x".repeat(5_000), StrategyKind::Fallback, 0.4, 0);
    dirty.contamination_level = 1.0;
    let expected = 0.25 * 0.4 + 0.15 * 0.3 + 0.10 * 0.5;
    assert!((scorer.score(&dirty) - expected).abs() < 1e-9);
}

#[test]
fn standard_refinement_drops_noise_and_is_idempotent() {
    let refiner = ContentRefiner::new(RefinerSettings::default()).expect("refiner");
    let messy = "Copyright 2023 Royal College\n  MEDICAL EXPERT:  Diagnose\tand treat acute illness  \nPage 3 of 10\nok\nR1\n- Perform  a focused history\n\n\n\nCOMMUNICATOR\n- Listen to families\n12\n© all rights reserved\nSaudi Commission for Health Specialties watermark";

    let refined = refiner.refine(messy);
    assert_eq!(
        refined,
        "MEDICAL EXPERT:  Diagnose  and treat acute illness\nR1\n- Perform  a focused history\n\nCOMMUNICATOR\n- Listen to families"
    );
    assert_eq!(refiner.refine(&refined), refined);
}

#[test]
fn aggressive_refinement_splits_inline_roles_and_is_idempotent() {
    let refiner = ContentRefiner::new(RefinerSettings::default()).expect("refiner");

    let inline = "Residents act as Medical Expert: they assess patients. Communicator: they listen.\n* first item\n2.Second item\n1.2 Sub item";
    let enhanced = refiner.refine_aggressive(inline);
    assert_eq!(
        enhanced,
        "Residents act as\n\nMEDICAL EXPERT:\nthey assess patients.\n\nCOMMUNICATOR:\nthey listen.\n• first item\n2. Second item\n1.2 Sub item"
    );
    assert_eq!(refiner.refine_aggressive(&enhanced), enhanced);
    assert_eq!(refiner.refine(&enhanced), enhanced);

    let handbook = program_handbook().span_text(3, 5);
    let once = refiner.refine_aggressive(&handbook);
    assert_eq!(refiner.refine_aggressive(&once), once);
}

#[test]
fn boundary_tightening_drops_pages_without_signal() {
    let doc = program_handbook();
    let lexicon = RoleLexicon::standard();

    let mut chunk = candidate("placeholder", StrategyKind::SemanticChunk, 0.8, 7);
    chunk.start_page = 1;
    chunk.end_page = 6;
    assert_eq!(tighten_boundaries(&chunk, &doc, &lexicon), Some((3, 5)));

    chunk.start_page = 3;
    chunk.end_page = 5;
    assert_eq!(tighten_boundaries(&chunk, &doc, &lexicon), None);

    let mut pattern = chunk.clone();
    pattern.extraction_method = StrategyKind::PatternBased;
    pattern.start_page = 1;
    pattern.end_page = 6;
    assert_eq!(tighten_boundaries(&pattern, &doc, &lexicon), None);
}

#[test]
fn tiers_are_monotonic_in_score() {
    let breakpoints = TierBreakpoints::default();
    assert_eq!(Tier::from_score(69.9, &breakpoints), Tier::Insufficient);
    assert_eq!(Tier::from_score(70.0, &breakpoints), Tier::Acceptable);
    assert_eq!(Tier::from_score(100.0, &breakpoints), Tier::Good);
    assert_eq!(Tier::from_score(130.0, &breakpoints), Tier::Excellent);
    assert_eq!(Tier::from_score(140.0, &breakpoints), Tier::Supreme);

    let mut previous = Tier::Insufficient;
    for step in 0..=300 {
        let tier = Tier::from_score(step as f64 * 0.5, &breakpoints);
        assert!(tier >= previous);
        previous = tier;
    }
    assert_eq!(previous, Tier::Supreme);
}

#[test]
fn metrics_measure_contamination_and_structure() {
    let metrics = metrics();

    assert_eq!(metrics.contamination_level(""), 1.0);
    let mixed = "Demonstrate skills\nReferences\nSmith J, et al. Heart. 2019;12:45";
    assert!((metrics.contamination_level(mixed) - 7.0 / 9.0).abs() < 1e-9);
    assert_eq!(metrics.contamination_level("Demonstrate clinical skills"), 0.0);

    assert_eq!(metrics.structure_score("MEDICAL EXPERT:\n- one\n- two\nplain"), 1.0);
    assert_eq!(metrics.structure_score("plain text only"), 0.0);
    assert_eq!(metrics.structure_score(""), 0.0);

    assert_eq!(metrics.semantic_score(""), 0.0);
    assert_eq!(metrics.page_density("   "), 0.0);
    assert!(metrics.candidate_quality(COMPETENCY_PAGE_3) <= 150.0);
}

#[test]
fn lexicon_resolves_synonyms_to_canonical_roles() {
    let lexicon = RoleLexicon::standard();

    assert_eq!(
        lexicon.roles_in("Strong leadership and management of the unit"),
        vec![Role::Leader]
    );
    assert_eq!(lexicon.roles_in("The ward manager"), vec![Role::Leader]);
    assert!(lexicon.roles_in("The cafeteria opens at seven").is_empty());
    assert_eq!(lexicon.role_count(COMPETENCY_PAGE_4), 4);

    assert!(lexicon.is_role_name("  Health   Advocate: "));
    assert!(!lexicon.is_role_name("Advocacy"));

    let counts = lexicon.term_counts("Competencies, and more competencies.");
    assert_eq!(counts.get("competencies"), Some(&2));
    assert_eq!(Role::Leader.to_string(), "LEADER");
}

#[test]
fn format_detector_recognizes_key_and_enabling_layout() {
    let detector = FormatDetector::new().expect("detector");

    let sample = "Key competencies R1\nEnabling competencies R2\nKey competencies R3\nEnabling competencies R4\nKey competencies F1\nEnabling competencies PGY2\nMilestones are reviewed each block.";
    let detection = detector.detect(sample);
    assert_eq!(detection.format, DocumentFormat::AdvancedKeyEnabling);
    assert!((detection.confidence - 1.0).abs() < 1e-9);
    assert_eq!(detection.scores.get("Advanced Key & Enabling"), Some(&165));

    let unknown = detector.detect("The cafeteria opens at seven.");
    assert_eq!(unknown.format, DocumentFormat::Unknown);
    assert_eq!(unknown.confidence, 0.0);
}

#[test]
fn config_validation_rejects_inconsistent_settings() {
    assert!(ExtractionConfig::default().validate().is_ok());

    let mut weights = ExtractionConfig::default();
    weights.scoring.confidence = 0.5;
    assert!(weights.validate().is_err());

    let mut tiers = ExtractionConfig::default();
    tiers.tiers.good = 60.0;
    assert!(tiers.validate().is_err());

    let mut strategies = ExtractionConfig::default();
    strategies.strategies.primary.push(StrategyKind::Fallback);
    assert!(strategies.validate().is_err());
    assert!(Extractor::new(strategies).is_err());
}

#[test]
fn config_file_overrides_only_named_fields() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("thresholds.json");
    fs::write(
        &path,
        r#"{"tiers": {"excellent": 135.0}, "strategies": {"primary": ["toc_guided", "density_cluster"]}}"#,
    )
    .expect("write config");

    let config = ExtractionConfig::load(Some(path.as_path())).expect("load config");
    assert_eq!(config.tiers.excellent, 135.0);
    assert_eq!(config.tiers.supreme, 140.0);
    assert_eq!(config.scoring.role_coverage, 0.30);
    assert_eq!(
        config.strategies.primary,
        vec![StrategyKind::TocGuided, StrategyKind::DensityCluster]
    );

    fs::write(&path, r#"{"tiers": {"supreme": 120.0}}"#).expect("write config");
    assert!(ExtractionConfig::load(Some(path.as_path())).is_err());
}

#[test]
fn document_outputs_are_written_for_success_and_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let extractor = extractor();

    let success = extractor.extract(&program_handbook());
    let report = write_document_outputs(
        &success,
        Path::new("/data/program_a.pdf"),
        Some("abc123".to_string()),
        dir.path(),
    )
    .expect("write success outputs");

    let text_path = dir.path().join("program_a_competencies.txt");
    let json_path = dir.path().join("program_a_competencies.json");
    let text = fs::read_to_string(&text_path).expect("text output");
    assert!(text.starts_with("CanMEDS Competencies Extracted from: handbook.pdf\n"));
    assert!(text.contains("Extraction Method: toc_guided\n"));
    assert!(text.contains("Pages: 3-5\n"));
    assert!(text.contains("PROFESSIONAL:"));

    let stored: ExtractionReport =
        serde_json::from_slice(&fs::read(&json_path).expect("json output")).expect("parse report");
    assert!(stored.extraction_successful);
    assert_eq!(stored.tier.as_deref(), Some("Supreme"));
    assert_eq!(stored.source_sha256.as_deref(), Some("abc123"));
    assert_eq!(
        stored.role_coverage,
        stored.detailed_analysis.as_ref().map(|analysis| analysis.role_count)
    );
    assert_eq!(stored.output_file, report.output_file);

    let failure = extractor.extract(&document("refs.pdf", &REFERENCE_PAGES, Vec::new()));
    let failed = write_document_outputs(&failure, Path::new("/data/refs.pdf"), None, dir.path())
        .expect("write failure outputs");
    assert!(!dir.path().join("refs_competencies.txt").exists());
    assert!(dir.path().join("refs_competencies.json").exists());
    assert!(failed.output_file.is_none());
    assert!(!failed.extraction_successful);
}

#[test]
fn batch_summary_counts_tiers_and_rates() {
    let extractor = extractor();
    let success = build_report(
        &extractor.extract(&program_handbook()),
        Path::new("a.pdf"),
        None,
    );
    let failure = build_report(
        &extractor.extract(&document("refs.pdf", &REFERENCE_PAGES, Vec::new())),
        Path::new("refs.pdf"),
        None,
    );

    let summary = build_batch_summary(
        SummaryContext {
            run_id: "run-test",
            started_at: "2026-01-01T00:00:00Z",
            input_path: Path::new("pdfs"),
            output_dir: Path::new("out"),
            tool_versions: crate::model::ToolVersions {
                pdftotext: None,
                pdftohtml: None,
            },
        },
        vec![success, failure],
    );

    assert_eq!(summary.total_documents, 2);
    assert_eq!(summary.successful_extractions, 1);
    assert_eq!(summary.failed_extractions, 1);
    assert_eq!(summary.tier_counts.get("Supreme"), Some(&1));
    assert_eq!(summary.extraction_rate, "50.0%");
    assert_eq!(summary.supreme_rate, "50.0%");
    assert_eq!(summary.excellent_rate, "0.0%");
}

#[test]
fn normalization_strips_running_lines_and_merges_hyphens() {
    let doc = document(
        "running.pdf",
        &[
            "Residency Handbook\nBody one text\nPage 1",
            "Residency Handbook\nBody two text\nPage 2",
            "Residency Handbook\nBody three text\nPage 3",
        ],
        Vec::new(),
    );
    assert_eq!(doc.stats.header_lines_removed, 3);
    assert_eq!(doc.stats.footer_lines_removed, 3);
    assert_eq!(doc.page(1), Some("Body one text"));
    assert_eq!(doc.page(4), None);
    assert_eq!(doc.page(0), None);

    let (merged, merges) = merge_hyphenated_lines(vec![
        "Demonstrate clinical exam-".to_string(),
        "ination skills".to_string(),
        "- bullet -".to_string(),
        "Next line".to_string(),
    ]);
    assert_eq!(merges, 1);
    assert_eq!(merged[0], "Demonstrate clinical examination skills");
    assert_eq!(merged[1], "- bullet -");
}

#[test]
fn concatenated_text_maps_offsets_to_pages() {
    let doc = document("pages.pdf", &["abc", "de", "f"], Vec::new());
    let concatenated = doc.concatenated();

    assert_eq!(concatenated.text, "abc\nde\nf\n");
    assert_eq!(concatenated.page_breaks, vec![0, 4, 7]);
    assert_eq!(concatenated.page_at(0), 1);
    assert_eq!(concatenated.page_at(3), 1);
    assert_eq!(concatenated.page_at(4), 2);
    assert_eq!(concatenated.page_at(8), 3);

    assert_eq!(doc.span_text(2, 3), "de\nf");
    assert_eq!(doc.span_text(3, 9), "f");
    assert_eq!(doc.span_text(4, 2), "");
}

#[test]
fn outline_xml_nesting_sets_levels() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<pdf2xml producer="poppler" version="23.02.0">
<page number="1" position="absolute" top="0" left="0" height="1188" width="918">
</page>
<outline>
<item page="1">Introduction</item>
<outline>
<item page="3">CanMEDS &amp; Competencies</item>
<item>Untargeted</item>
</outline>
<item page="6">Program   Logistics</item>
</outline>
</pdf2xml>"#;

    let entries = parse_outline_xml(xml).expect("parse outline");
    assert_eq!(
        entries,
        vec![
            OutlineEntry::new(1, "Introduction", 1),
            OutlineEntry::new(2, "CanMEDS & Competencies", 3),
            OutlineEntry::new(1, "Program Logistics", 6),
        ]
    );
    assert!(parse_outline_xml("<pdf2xml></pdf2xml>").expect("empty").is_empty());
}

#[test]
fn role_named_only_in_running_header_still_yields_fallback_candidate() {
    let doc = document(
        "faculty.pdf",
        &[
            "Faculty of Education\nThe lecture hall is on the ground floor.\nDoors open at eight.",
            "Faculty of Education\nThe library closes at nine on Fridays.\nQuiet rooms can be booked online.",
            "Faculty of Education\nLockers are rented by the semester.\nKeys are returned at the front desk.",
            "Faculty of Education\nThe shuttle stops outside the main gate.\nTimetables are posted near the stairs.",
        ],
        Vec::new(),
    );
    let metrics = metrics();
    assert_eq!(doc.stats.header_lines_removed, 4);
    assert!(!metrics.lexicon().mentions_any_role(&doc.span_text(1, 4)));
    assert!(metrics.lexicon().mentions_any_role(&doc.raw_span_text(1, 4)));

    let config = ExtractionConfig::default();
    let ctx = ScanContext {
        doc: &doc,
        metrics: &metrics,
        config: &config,
    };
    let candidates = FallbackGenerator.generate(&ctx).expect("fallback");
    assert_eq!(candidates.len(), 1);
    assert!(candidates[0].content.contains("Faculty of Education"));
    assert_eq!(candidates[0].role_coverage, 1);

    let extraction = extractor().extract(&doc);
    let winner = extraction.winner.as_ref().expect("fallback winner");
    assert_eq!(winner.extraction_method, StrategyKind::Fallback);
    assert!(matches!(
        extraction.failure,
        Some(ExtractionFailure::Validation { .. })
    ));

    let report = build_report(&extraction, Path::new("faculty.pdf"), None);
    assert!(!report.extraction_successful);
    assert_eq!(report.content_length, winner.content.chars().count());
    assert!(report.content_length > 0);
}

#[test]
fn output_write_failure_is_reported_and_later_documents_still_written() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir(dir.path().join("program_a_competencies.json")).expect("blocking dir");
    let extractor = extractor();

    let blocked = record_document_outputs(
        &extractor.extract(&program_handbook()),
        Path::new("/data/program_a.pdf"),
        None,
        dir.path(),
    );
    assert!(!blocked.extraction_successful);
    assert!(
        blocked
            .failure_reason
            .as_deref()
            .unwrap_or_default()
            .starts_with("Failed to write document outputs"),
        "{:?}",
        blocked.failure_reason
    );
    assert!(blocked.validation.starts_with("Extraction failed: "));
    assert!(blocked.output_file.is_none());
    assert_eq!(blocked.tier.as_deref(), Some("Supreme"));

    let next = record_document_outputs(
        &extractor.extract(&document("refs.pdf", &REFERENCE_PAGES, Vec::new())),
        Path::new("/data/refs.pdf"),
        None,
        dir.path(),
    );
    assert!(dir.path().join("refs_competencies.json").exists());
    assert!(next.json_report.is_some());

    let summary = build_batch_summary(
        SummaryContext {
            run_id: "run-test",
            started_at: "2026-01-01T00:00:00Z",
            input_path: Path::new("pdfs"),
            output_dir: dir.path(),
            tool_versions: crate::model::ToolVersions {
                pdftotext: None,
                pdftohtml: None,
            },
        },
        vec![blocked, next],
    );
    assert_eq!(summary.total_documents, 2);
    assert_eq!(summary.failed_extractions, 2);
    assert!(summary.tier_counts.is_empty());
    assert_eq!(summary.format_counts.values().sum::<usize>(), 2);
}

#[test]
fn validator_tier_never_drops_when_one_input_improves() {
    let validator = QualityValidator::new(ValidationThresholds::default(), TierBreakpoints::default());
    let base = QualityInputs {
        role_count: 3,
        competency: 40.0,
        structure: 0.3,
        contamination: 0.1,
    };
    let assert_non_decreasing = |label: &str, variants: Vec<QualityInputs>| {
        let tiers = variants
            .into_iter()
            .map(|inputs| validator.tier(validator.quality_score(inputs)))
            .collect::<Vec<Tier>>();
        assert!(
            tiers.windows(2).all(|pair| pair[0] <= pair[1]),
            "{label}: {tiers:?}"
        );
    };

    assert_non_decreasing(
        "roles",
        (0..=7)
            .map(|role_count| QualityInputs { role_count, ..base })
            .collect(),
    );
    assert_non_decreasing(
        "competency",
        (0..=100)
            .map(|step| QualityInputs {
                competency: step as f64,
                ..base
            })
            .collect(),
    );
    assert_non_decreasing(
        "structure",
        (0..=20)
            .map(|step| QualityInputs {
                structure: step as f64 / 20.0,
                ..base
            })
            .collect(),
    );
    assert_non_decreasing(
        "cleanliness",
        (0..=20)
            .map(|step| QualityInputs {
                contamination: 1.0 - step as f64 / 20.0,
                ..base
            })
            .collect(),
    );

    let best = QualityInputs {
        role_count: 7,
        competency: 100.0,
        structure: 1.0,
        contamination: 0.0,
    };
    assert!((validator.quality_score(best) - 150.0).abs() < 1e-9);
    assert_eq!(validator.tier(validator.quality_score(best)), Tier::Supreme);
}
