use std::fmt::Debug;
use std::sync::Arc;

use super::super::domain::ApplicationDocument;
use super::super::steps::StepState;
use super::validate_step;

/// Decides whether the wizard may move forward from the current step.
pub trait StepGate: Debug + Send + Sync {
    fn can_proceed(&self, current: &StepState, document: &ApplicationDocument) -> bool;
}

/// Never blocks forward navigation.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysProceed;

impl StepGate for AlwaysProceed {
    fn can_proceed(&self, _current: &StepState, _document: &ApplicationDocument) -> bool {
        true
    }
}

/// Blocks until the current step validates. The document is checked directly so a
/// pending debounced revalidation cannot let a stale view through.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequireValidStep;

impl StepGate for RequireValidStep {
    fn can_proceed(&self, current: &StepState, document: &ApplicationDocument) -> bool {
        validate_step(current.id, document).is_valid
    }
}

/// Configuration-level selector for the built-in gates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GatePolicy {
    Always,
    #[default]
    RequireValid,
}

impl GatePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "always" | "open" | "off" => Some(Self::Always),
            "require-valid" | "require_valid" | "strict" => Some(Self::RequireValid),
            _ => None,
        }
    }

    pub fn build(self) -> Arc<dyn StepGate> {
        match self {
            GatePolicy::Always => Arc::new(AlwaysProceed),
            GatePolicy::RequireValid => Arc::new(RequireValidStep),
        }
    }
}
