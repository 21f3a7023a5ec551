//! Hard eligibility constraints between a teacher and a job.
//!
//! Each constraint is binary. Missing teacher data fails the constraint
//! (fail-closed) so eligibility is never overstated.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::core::{JobPosting, TeacherProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Certification,
    Experience,
    Visa,
}

impl ConstraintKind {
    pub const ALL: [Self; 3] = [Self::Certification, Self::Experience, Self::Visa];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Certification => "certification",
            Self::Experience => "experience",
            Self::Visa => "visa",
        }
    }
}

/// Outcome of evaluating every hard constraint for one (teacher, job) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintReport {
    pub checks: BTreeMap<ConstraintKind, bool>,
    /// Share of passed constraints, 0-100, two decimals.
    pub constraint_match: f64,
}

impl ConstraintReport {
    #[must_use]
    pub fn from_checks(checks: BTreeMap<ConstraintKind, bool>) -> Self {
        let constraint_match = constraint_match(&checks);
        Self {
            checks,
            constraint_match,
        }
    }

    #[must_use]
    pub fn passed(&self, kind: ConstraintKind) -> bool {
        self.checks.get(&kind).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.checks.values().filter(|passed| **passed).count()
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.values().all(|passed| *passed)
    }
}

/// `passed / evaluated × 100`, rounded to two decimals. An empty set has
/// nothing to fail and scores 100.
fn constraint_match(checks: &BTreeMap<ConstraintKind, bool>) -> f64 {
    if checks.is_empty() {
        return 100.0;
    }
    let passed = checks.values().filter(|passed| **passed).count();
    #[allow(clippy::cast_precision_loss)]
    let ratio = passed as f64 / checks.len() as f64;
    (ratio * 10_000.0).round() / 100.0
}

/// Work-visa requirements for one country.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VisaRule {
    /// Normalised citizenships that qualify. Empty means any citizenship.
    #[serde(default)]
    pub eligible_citizenships: Vec<String>,
    #[serde(default)]
    pub requires_degree: bool,
    #[serde(default)]
    pub min_years_experience: u32,
    #[serde(default)]
    pub max_age: Option<u32>,
}

const NATIVE_ENGLISH: [&str; 7] = [
    "united states",
    "united kingdom",
    "canada",
    "australia",
    "new zealand",
    "ireland",
    "south africa",
];

/// Visa rules keyed by normalised country name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisaRules {
    rules: HashMap<String, VisaRule>,
}

impl Default for VisaRules {
    fn default() -> Self {
        let native: Vec<String> = NATIVE_ENGLISH.iter().map(ToString::to_string).collect();
        let degree_only = VisaRule {
            requires_degree: true,
            ..VisaRule::default()
        };

        Self::empty()
            .with_rule(
                "south korea",
                VisaRule {
                    eligible_citizenships: native.clone(),
                    requires_degree: true,
                    ..VisaRule::default()
                },
            )
            .with_rule(
                "china",
                VisaRule {
                    eligible_citizenships: native,
                    requires_degree: true,
                    min_years_experience: 2,
                    max_age: Some(60),
                },
            )
            .with_rule("japan", degree_only.clone())
            .with_rule("taiwan", degree_only.clone())
            .with_rule("vietnam", degree_only.clone())
            .with_rule("united arab emirates", degree_only.clone())
            .with_rule("saudi arabia", degree_only)
    }
}

impl VisaRules {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_rule(mut self, country: &str, mut rule: VisaRule) -> Self {
        rule.eligible_citizenships = rule
            .eligible_citizenships
            .iter()
            .map(|c| normalize_country(c))
            .collect();
        self.rules.insert(normalize_country(country), rule);
        self
    }

    #[must_use]
    pub fn rule_for(&self, country: &str) -> Option<&VisaRule> {
        self.rules.get(&normalize_country(country))
    }
}

/// Lowercase, collapse whitespace and map common aliases.
#[must_use]
pub fn normalize_country(raw: &str) -> String {
    let collapsed = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .replace('.', "");
    let canonical = match collapsed.as_str() {
        "us" | "usa" | "united states of america" | "america" => "united states",
        "uk" | "great britain" | "britain" | "england" | "scotland" | "wales" => "united kingdom",
        "korea" | "republic of korea" | "rok" => "south korea",
        "uae" | "emirates" => "united arab emirates",
        "prc" | "mainland china" | "people's republic of china" => "china",
        "viet nam" => "vietnam",
        "ksa" => "saudi arabia",
        "nz" => "new zealand",
        "rsa" => "south africa",
        other => other,
    };
    canonical.to_string()
}

#[derive(Debug, Clone, Default)]
pub struct ConstraintEvaluator {
    visa_rules: VisaRules,
}

impl ConstraintEvaluator {
    #[must_use]
    pub fn new(visa_rules: VisaRules) -> Self {
        Self { visa_rules }
    }

    /// Evaluate every hard constraint for a (teacher, job) pair.
    #[must_use]
    pub fn evaluate(&self, teacher: &TeacherProfile, job: &JobPosting) -> ConstraintReport {
        let mut checks = BTreeMap::new();
        checks.insert(ConstraintKind::Certification, certification_met(teacher, job));
        checks.insert(ConstraintKind::Experience, experience_met(teacher, job));
        checks.insert(ConstraintKind::Visa, self.visa_eligible(teacher, job));
        ConstraintReport::from_checks(checks)
    }

    fn visa_eligible(&self, teacher: &TeacherProfile, job: &JobPosting) -> bool {
        let Some(citizenship) = teacher.citizenship.as_deref() else {
            return false;
        };
        let citizenship = normalize_country(citizenship);
        if citizenship.is_empty() {
            return false;
        }
        if citizenship == normalize_country(&job.country) {
            return true;
        }
        if !job.visa_sponsorship {
            return false;
        }

        let Some(rule) = self.visa_rules.rule_for(&job.country) else {
            return true;
        };

        if !rule.eligible_citizenships.is_empty()
            && !rule.eligible_citizenships.contains(&citizenship)
        {
            return false;
        }
        if rule.requires_degree && teacher.has_degree != Some(true) {
            return false;
        }
        if rule.min_years_experience > 0
            && teacher
                .years_experience
                .is_none_or(|years| years < rule.min_years_experience)
        {
            return false;
        }
        match rule.max_age {
            Some(max_age) => teacher.age.is_some_and(|age| age <= max_age),
            None => true,
        }
    }
}

fn certification_met(teacher: &TeacherProfile, job: &JobPosting) -> bool {
    job.required_certifications.iter().all(|required| {
        teacher
            .certifications
            .iter()
            .any(|held| held.trim().eq_ignore_ascii_case(required.trim()))
    })
}

fn experience_met(teacher: &TeacherProfile, job: &JobPosting) -> bool {
    match job.min_years_experience {
        None | Some(0) => true,
        Some(minimum) => teacher.years_experience.is_some_and(|years| years >= minimum),
    }
}
