use std::sync::Arc;

use super::common::*;
use crate::config::EngineConfig;
use crate::workflows::verification::persistence::{LocalStorage, MemoryStorage};
use crate::workflows::verification::steps::StepId;
use crate::workflows::verification::store::{Collaborators, StoreError, VerificationStore};
use crate::workflows::verification::validation::AlwaysProceed;

#[test]
fn incomplete_steps_block_forward_navigation() {
    let h = harness();
    assert!(!h.store.can_proceed());

    let err = h.store.next_step().expect_err("blocked");

    let StoreError::StepIncomplete { step, errors } = &err else {
        panic!("expected a gated step, got {err:?}");
    };
    assert_eq!(*step, StepId::PersonalInformation);
    assert!(!errors.is_empty());
    assert_eq!(h.store.current_step(), StepId::PersonalInformation);
    let state = h.store.snapshot();
    assert_eq!(
        state.ui.errors.get(StepId::PersonalInformation.slug()),
        Some(errors)
    );
    assert!(h.notifier.titles().contains(&"Step incomplete".to_string()));
}

#[test]
fn valid_steps_advance_in_order() {
    let h = harness();
    fill_content_steps(&h.store);

    let visited: Vec<StepId> = (0..4)
        .map(|_| h.store.next_step().expect("advance"))
        .collect();

    assert_eq!(
        visited,
        vec![
            StepId::ProfessionalBackground,
            StepId::TeachingInformation,
            StepId::Documents,
            StepId::Review,
        ]
    );
    assert_eq!(h.store.current_step(), StepId::Review);
}

#[test]
fn the_review_step_is_a_fixed_point() {
    let h = harness();
    accept_mandatory_consents(&h.store);
    h.store.go_to_step(StepId::Review);

    assert_eq!(h.store.next_step().expect("stays"), StepId::Review);
    assert_eq!(h.store.snapshot().current_step, StepId::Review.index());
}

#[test]
fn previous_step_stops_at_the_first_step() {
    let h = harness();
    h.store.go_to_step(StepId::TeachingInformation);

    assert_eq!(h.store.previous_step(), StepId::ProfessionalBackground);
    assert_eq!(h.store.previous_step(), StepId::PersonalInformation);
    assert_eq!(h.store.previous_step(), StepId::PersonalInformation);
}

#[test]
fn direct_jumps_ignore_the_gate() {
    let h = harness();

    assert_eq!(h.store.go_to_step(StepId::Documents), StepId::Documents);
    assert_eq!(h.store.current_step(), StepId::Documents);
    assert!(!h.store.view().can_proceed);
}

#[test]
fn permissive_gates_allow_skipping_ahead() {
    let storage = Arc::new(MemoryStorage::new());
    let h = harness();
    let store = VerificationStore::with_gate(
        Collaborators {
            remote: h.remote.clone(),
            uploads: h.uploads.clone(),
            notifier: h.notifier.clone(),
            storage: storage as Arc<dyn LocalStorage>,
        },
        EngineConfig::default(),
        Arc::new(AlwaysProceed),
    );

    assert!(store.can_proceed());
    assert_eq!(store.next_step().expect("open gate"), StepId::ProfessionalBackground);
    assert!(store.snapshot().ui.errors.is_empty());
}

#[test]
fn progress_tracks_completed_work() {
    let h = harness();
    let initial = h.store.overall_progress();
    assert!(initial < 100.0);

    h.store
        .update_personal_info(complete_personal_info())
        .expect("personal info");
    let partial = h.store.overall_progress();
    assert!(partial > initial && partial < 100.0);

    fill_content_steps(&h.store);
    accept_mandatory_consents(&h.store);
    h.store.flush_validation();

    assert!((h.store.overall_progress() - 100.0).abs() < f32::EPSILON);
    assert!((h.store.view().overall_progress - 100.0).abs() < f32::EPSILON);
}
