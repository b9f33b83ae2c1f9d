use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// The five logical sections of the wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    PersonalInformation,
    ProfessionalBackground,
    TeachingInformation,
    Documents,
    #[serde(alias = "review-submit", alias = "review-and-submit", alias = "consents")]
    Review,
}

impl StepId {
    pub const ALL: [StepId; 5] = [
        StepId::PersonalInformation,
        StepId::ProfessionalBackground,
        StepId::TeachingInformation,
        StepId::Documents,
        StepId::Review,
    ];

    pub const fn index(self) -> usize {
        match self {
            StepId::PersonalInformation => 0,
            StepId::ProfessionalBackground => 1,
            StepId::TeachingInformation => 2,
            StepId::Documents => 3,
            StepId::Review => 4,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        StepId::ALL.get(index).copied()
    }

    pub const fn slug(self) -> &'static str {
        match self {
            StepId::PersonalInformation => "personal-information",
            StepId::ProfessionalBackground => "professional-background",
            StepId::TeachingInformation => "teaching-information",
            StepId::Documents => "documents",
            StepId::Review => "review",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            StepId::PersonalInformation => "Personal Information",
            StepId::ProfessionalBackground => "Professional Background",
            StepId::TeachingInformation => "Teaching Information",
            StepId::Documents => "Documents",
            StepId::Review => "Review & Submit",
        }
    }
}

/// Derived view of a step, recomputed by the validators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepState {
    pub id: StepId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub completion_percentage: u8,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl StepState {
    pub fn new(id: StepId) -> Self {
        Self {
            id,
            title: id.title().to_string(),
            is_completed: false,
            is_valid: false,
            completion_percentage: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            last_updated: None,
        }
    }
}

pub fn default_steps() -> Vec<StepState> {
    StepId::ALL.into_iter().map(StepState::new).collect()
}

/// Rebuild the step list in canonical order, keeping whatever derived state lines up.
///
/// Older snapshots stored the final step under a different id and some lost entries
/// entirely; both are healed here so `steps[4]` is always `review`.
pub fn fix_step_ids(steps: Vec<StepState>) -> Vec<StepState> {
    let mut healed = default_steps();
    for (index, mut step) in steps.into_iter().enumerate() {
        let Some(expected) = StepId::from_index(index) else {
            warn!(index, "dropping surplus step from stored state");
            continue;
        };
        if step.id != expected {
            warn!(
                found = step.id.slug(),
                expected = expected.slug(),
                "correcting stored step id"
            );
            step.id = expected;
        }
        step.title = expected.title().to_string();
        healed[index] = step;
    }
    healed
}
