use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// The seven CanMEDS roles. The order here is the reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Role {
    MedicalExpert,
    Communicator,
    Collaborator,
    Leader,
    HealthAdvocate,
    Scholar,
    Professional,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::MedicalExpert,
        Role::Communicator,
        Role::Collaborator,
        Role::Leader,
        Role::HealthAdvocate,
        Role::Scholar,
        Role::Professional,
    ];

    pub fn canonical_name(self) -> &'static str {
        match self {
            Self::MedicalExpert => "MEDICAL EXPERT",
            Self::Communicator => "COMMUNICATOR",
            Self::Collaborator => "COLLABORATOR",
            Self::Leader => "LEADER",
            Self::HealthAdvocate => "HEALTH ADVOCATE",
            Self::Scholar => "SCHOLAR",
            Self::Professional => "PROFESSIONAL",
        }
    }

    fn synonyms(self) -> &'static [&'static str] {
        match self {
            Self::MedicalExpert => &[
                "medical expert",
                "clinical expertise",
                "medical knowledge",
                "clinical competence",
                "diagnosis",
                "treatment",
                "clinical skills",
                "medical competencies",
                "clinical proficiency",
                "patient assessment",
                "clinical reasoning",
                "medical practice",
                "clinical judgment",
                "clinical care",
                "medical intervention",
                "therapeutic management",
                "clinical decision",
                "patient care",
                "medical assessment",
                "clinical evaluation",
                "diagnostic skills",
            ],
            Self::Communicator => &[
                "communicator",
                "communication",
                "patient interaction",
                "interpersonal skills",
                "listening skills",
                "empathy",
                "patient counseling",
                "rapport",
                "patient education",
                "interviewing skills",
                "counselling",
                "interpersonal competence",
                "social skills",
            ],
            Self::Collaborator => &[
                "collaborator",
                "collaboration",
                "teamwork",
                "multidisciplinary",
                "interdisciplinary",
                "team member",
                "interprofessional",
                "team-based care",
                "collaborative care",
                "consultation",
                "referral",
                "team dynamics",
                "cooperative care",
                "team participation",
                "collaborative practice",
            ],
            Self::Leader => &[
                "leader",
                "leadership",
                "manager",
                "management",
                "administration",
                "supervision",
                "quality improvement",
                "healthcare delivery",
                "resource management",
                "organizational skills",
                "delegation",
                "quality assurance",
                "healthcare systems",
                "change management",
                "strategic planning",
            ],
            Self::HealthAdvocate => &[
                "health advocate",
                "advocacy",
                "public health",
                "community health",
                "population health",
                "health promotion",
                "disease prevention",
                "social determinants",
                "health policy",
                "patient advocacy",
                "health equity",
                "community engagement",
                "social responsibility",
                "community outreach",
                "social justice",
            ],
            Self::Scholar => &[
                "scholar",
                "scholarship",
                "research",
                "education",
                "teaching",
                "learning",
                "evidence-based",
                "lifelong learning",
                "academic",
                "scholarly activity",
                "critical appraisal",
                "knowledge translation",
                "mentoring",
                "scientific inquiry",
            ],
            Self::Professional => &[
                "professional",
                "professionalism",
                "ethics",
                "integrity",
                "accountability",
                "responsibility",
                "commitment",
                "respect",
                "confidentiality",
                "self-regulation",
                "ethical practice",
                "moral principles",
            ],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorTier {
    Primary,
    Secondary,
    Contextual,
}

impl IndicatorTier {
    pub fn weight(self) -> usize {
        match self {
            Self::Primary => 3,
            Self::Secondary => 2,
            Self::Contextual => 1,
        }
    }
}

const PRIMARY_INDICATORS: &[&str] = &[
    "competencies",
    "competency",
    "learning outcomes",
    "objectives",
    "competency framework",
    "canmeds competencies",
    "professional competencies",
    "core competencies",
];

const SECONDARY_INDICATORS: &[&str] = &[
    "milestones",
    "entrustable professional activities",
    "epas",
    "competency domains",
    "skills",
    "abilities",
    "capabilities",
    "proficiencies",
    "performance indicators",
    "learning goals",
    "training objectives",
    "expected outcomes",
    "key competencies",
    "enabling competencies",
];

const CONTEXTUAL_INDICATORS: &[&str] = &[
    "competency-based",
    "competency assessment",
    "competency development",
    "competency evaluation",
    "competency requirements",
    "competency standards",
];

const EDUCATIONAL_STEMS: &[&str] = &[
    "assess",
    "evaluat",
    "demonstrat",
    "develop",
    "achiev",
    "perform",
    "complet",
];

/// Role synonyms plus the competency vocabulary every scorer shares.
///
/// Built once per process and handed to each component by reference. All
/// terms are stored lower-case; callers match against lower-cased text.
#[derive(Debug, Clone)]
pub struct RoleLexicon {
    roles: Vec<(Role, Vec<String>)>,
    indicators: Vec<(String, IndicatorTier)>,
    educational_stems: Vec<String>,
}

impl Default for RoleLexicon {
    fn default() -> Self {
        Self::standard()
    }
}

impl RoleLexicon {
    pub fn standard() -> Self {
        let roles = Role::ALL
            .iter()
            .map(|role| {
                let synonyms = role
                    .synonyms()
                    .iter()
                    .map(|term| term.to_lowercase())
                    .collect::<Vec<String>>();
                (*role, synonyms)
            })
            .collect();

        let tiers = [
            (PRIMARY_INDICATORS, IndicatorTier::Primary),
            (SECONDARY_INDICATORS, IndicatorTier::Secondary),
            (CONTEXTUAL_INDICATORS, IndicatorTier::Contextual),
        ];
        let indicators = tiers
            .iter()
            .flat_map(|(terms, tier)| terms.iter().map(|term| (term.to_lowercase(), *tier)))
            .collect();

        Self {
            roles,
            indicators,
            educational_stems: EDUCATIONAL_STEMS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn roles_in(&self, text: &str) -> Vec<Role> {
        let lower = text.to_lowercase();
        self.roles_in_lower(&lower)
    }

    pub fn roles_in_lower(&self, lower: &str) -> Vec<Role> {
        self.roles
            .iter()
            .filter(|(_, synonyms)| synonyms.iter().any(|term| lower.contains(term.as_str())))
            .map(|(role, _)| *role)
            .collect()
    }

    pub fn role_count(&self, text: &str) -> usize {
        self.roles_in(text).len()
    }

    pub fn mentions_any_role(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.roles
            .iter()
            .any(|(_, synonyms)| synonyms.iter().any(|term| lower.contains(term.as_str())))
    }

    /// Synonym occurrences across all roles, overlapping phrases counted
    /// separately.
    pub fn role_occurrences_lower(&self, lower: &str) -> usize {
        self.roles
            .iter()
            .flat_map(|(_, synonyms)| synonyms.iter())
            .map(|term| lower.matches(term.as_str()).count())
            .sum()
    }

    pub fn competency_terms_in(&self, text: &str) -> Vec<&str> {
        let lower = text.to_lowercase();
        self.competency_terms_in_lower(&lower)
    }

    pub fn competency_terms_in_lower(&self, lower: &str) -> Vec<&str> {
        self.indicators
            .iter()
            .filter(|(term, _)| lower.contains(term.as_str()))
            .map(|(term, _)| term.as_str())
            .collect()
    }

    pub fn term_counts(&self, text: &str) -> BTreeMap<String, usize> {
        let lower = text.to_lowercase();
        self.indicators
            .iter()
            .filter_map(|(term, _)| {
                let count = lower.matches(term.as_str()).count();
                (count > 0).then(|| (term.clone(), count))
            })
            .collect()
    }

    /// Weighted count of indicator occurrences (primary 3, secondary 2,
    /// contextual 1).
    pub fn indicator_weight_hits_lower(&self, lower: &str) -> usize {
        self.indicators
            .iter()
            .map(|(term, tier)| lower.matches(term.as_str()).count() * tier.weight())
            .sum()
    }

    pub fn educational_hits_lower(&self, lower: &str) -> usize {
        self.educational_stems
            .iter()
            .filter(|stem| lower.contains(stem.as_str()))
            .count()
    }

    pub fn is_role_name(&self, phrase: &str) -> bool {
        let normalized = phrase
            .trim()
            .trim_end_matches(':')
            .split_whitespace()
            .collect::<Vec<&str>>()
            .join(" ");
        Role::ALL
            .iter()
            .any(|role| role.canonical_name().eq_ignore_ascii_case(&normalized))
    }
}
