use scriptorium_core::{ForeshadowingStatus, RunState};
use std::str::FromStr;
use strum::IntoEnumIterator;

#[test]
fn test_status_only_moves_forward() {
    let ordered: Vec<_> = ForeshadowingStatus::iter().collect();
    for (i, from) in ordered.iter().enumerate() {
        for (j, to) in ordered.iter().enumerate() {
            assert_eq!(from.can_advance_to(*to), j > i, "{from} -> {to}");
        }
    }
}

#[test]
fn test_status_parses_case_insensitively() {
    assert_eq!(
        ForeshadowingStatus::from_str("Partially_Resolved").unwrap(),
        ForeshadowingStatus::PartiallyResolved
    );
    assert!(ForeshadowingStatus::from_str("forgotten").is_err());
}

#[test]
fn test_open_statuses() {
    assert!(ForeshadowingStatus::Planted.is_open());
    assert!(ForeshadowingStatus::PartiallyResolved.is_open());
    assert!(!ForeshadowingStatus::Resolved.is_open());
    assert!(!ForeshadowingStatus::Abandoned.is_open());
}

#[test]
fn test_run_state_terminality() {
    assert!(!RunState::Idle.is_terminal());
    assert!(!RunState::Paused.is_terminal());
    assert!(RunState::Completed.is_terminal());
    assert!(RunState::Cancelled.is_terminal());
    assert!(RunState::Error.is_terminal());
    assert!(RunState::Paused.is_live());
}
