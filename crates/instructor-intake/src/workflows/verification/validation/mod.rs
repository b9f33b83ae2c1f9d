mod gate;
pub(crate) mod rules;

pub use gate::{AlwaysProceed, GatePolicy, RequireValidStep, StepGate};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{ApplicationDocument, Consents};
use super::steps::{StepId, StepState};

/// Result of validating one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub completion_percentage: u8,
}

impl StepValidation {
    pub(crate) fn from_parts(errors: Vec<String>, warnings: Vec<String>, completion: u8) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            completion_percentage: completion.min(100),
        }
    }

    /// Write this result into the derived step view.
    pub fn write_into(&self, step: &mut StepState, now: DateTime<Utc>) {
        step.is_valid = self.is_valid;
        step.is_completed = self.is_valid;
        step.completion_percentage = self.completion_percentage;
        step.errors = self.errors.clone();
        step.warnings = self.warnings.clone();
        step.last_updated = Some(now);
    }
}

/// Validate a single step against the current document.
pub fn validate_step(step: StepId, document: &ApplicationDocument) -> StepValidation {
    match step {
        StepId::PersonalInformation => rules::personal_information(&document.personal_info),
        StepId::ProfessionalBackground => {
            rules::professional_background(&document.professional_background)
        }
        StepId::TeachingInformation => rules::teaching_information(&document.teaching_information),
        StepId::Documents => rules::documents(&document.documents),
        StepId::Review => rules::review(&document.consents),
    }
}

/// Aggregate outcome of a multi-step check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validate every content step. Consents are deliberately left to
/// [`validate_consents_for_submission`].
pub fn validate_document(document: &ApplicationDocument) -> ValidationReport {
    let errors = rules::all_sections(document)
        .into_iter()
        .flat_map(|outcome| outcome.errors)
        .collect();
    ValidationReport::from_errors(errors)
}

/// The consent gate applied right before submission.
pub fn validate_consents_for_submission(consents: &Consents) -> ValidationReport {
    ValidationReport::from_errors(rules::review(consents).errors)
}

/// Mean of the step completion percentages, clamped to `0..=100`.
pub fn overall_progress(steps: &[StepState]) -> f32 {
    if steps.is_empty() {
        return 0.0;
    }
    let total: f32 = steps
        .iter()
        .map(|step| f32::from(step.completion_percentage))
        .sum();
    (total / steps.len() as f32).clamp(0.0, 100.0)
}
