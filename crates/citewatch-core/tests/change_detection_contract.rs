//! Contract Test: Change Detection
//!
//! This test verifies when the engine notifies and when it persists.
//!
//! Constraints verified:
//! - A notification fires iff the count is strictly above the stored one,
//!   or nothing was ever stored
//! - The stored count only advances after a delivered notification
//! - A lower count never lowers the stored watermark
//!
//! If this test fails, users either miss increases or get spammed.

mod common;

use citewatch_core::engine::CycleOutcome;
use citewatch_core::error::FetchError;
use citewatch_core::traits::Observation;
use common::*;

#[tokio::test]
async fn first_observation_notifies_and_persists() {
    let source = ScriptedCountSource::counts(&[42]);
    let notifier = RecordingNotifier::new();
    let store = FlakyStateStore::new(None);
    let engine = engine_with(&source, &notifier, &store);

    let outcome = engine.run_cycle().await;

    assert_eq!(
        outcome,
        CycleOutcome::Notified {
            previous: None,
            current: 42
        }
    );
    assert_eq!(notifier.delivered_counts(), vec![(None, 42)]);
    assert_eq!(store.value(), Some(42));
}

#[tokio::test]
async fn first_observation_of_zero_still_notifies() {
    let source = ScriptedCountSource::counts(&[0]);
    let notifier = RecordingNotifier::new();
    let store = FlakyStateStore::new(None);
    let engine = engine_with(&source, &notifier, &store);

    engine.run_cycle().await;

    assert_eq!(notifier.delivered_counts(), vec![(None, 0)]);
    assert_eq!(store.value(), Some(0));
}

#[tokio::test]
async fn unchanged_count_does_nothing() {
    let source = ScriptedCountSource::counts(&[42]);
    let notifier = RecordingNotifier::new();
    let store = FlakyStateStore::new(Some(42));
    let engine = engine_with(&source, &notifier, &store);

    let outcome = engine.run_cycle().await;

    assert_eq!(outcome, CycleOutcome::Unchanged { count: 42 });
    assert!(notifier.attempts().is_empty());
    assert_eq!(store.write_call_count(), 0);
    assert_eq!(store.value(), Some(42));
}

#[tokio::test]
async fn increase_notifies_with_previous_and_persists() {
    let source = ScriptedCountSource::counts(&[50]);
    let notifier = RecordingNotifier::new();
    let store = FlakyStateStore::new(Some(42));
    let engine = engine_with(&source, &notifier, &store);

    let outcome = engine.run_cycle().await;

    assert_eq!(
        outcome,
        CycleOutcome::Notified {
            previous: Some(42),
            current: 50
        }
    );
    let delivered = notifier.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].delta(), 8);
    assert_eq!(store.value(), Some(50));
}

#[tokio::test]
async fn decrease_keeps_watermark_and_stays_silent() {
    let source = ScriptedCountSource::counts(&[45]);
    let notifier = RecordingNotifier::new();
    let store = FlakyStateStore::new(Some(50));
    let engine = engine_with(&source, &notifier, &store);

    let outcome = engine.run_cycle().await;

    assert_eq!(
        outcome,
        CycleOutcome::Decreased {
            stored: 50,
            observed: 45
        }
    );
    assert!(notifier.attempts().is_empty());
    assert_eq!(store.write_call_count(), 0);
    assert_eq!(store.value(), Some(50));
}

#[tokio::test]
async fn values_between_current_and_watermark_are_ignored() {
    // After a dip to 45, climbing back to 48 is still below the watermark of 50
    let source = ScriptedCountSource::counts(&[45, 48, 51]);
    let notifier = RecordingNotifier::new();
    let store = FlakyStateStore::new(Some(50));
    let engine = engine_with(&source, &notifier, &store);

    for _ in 0..3 {
        engine.run_cycle().await;
    }

    assert_eq!(notifier.delivered_counts(), vec![(Some(50), 51)]);
    assert_eq!(store.value(), Some(51));
}

#[tokio::test]
async fn repeated_value_after_persist_notifies_once() {
    let source = ScriptedCountSource::counts(&[42, 42, 42, 42]);
    let notifier = RecordingNotifier::new();
    let store = FlakyStateStore::new(None);
    let engine = engine_with(&source, &notifier, &store);

    for _ in 0..4 {
        engine.run_cycle().await;
    }

    assert_eq!(notifier.delivered_counts(), vec![(None, 42)]);
    assert_eq!(store.write_call_count(), 1);
}

#[tokio::test]
async fn notifications_track_a_sequence_of_counts() {
    let counts = [10u64, 10, 12, 11, 12, 15, 15, 3, 16];
    let source = ScriptedCountSource::counts(&counts);
    let notifier = RecordingNotifier::new();
    let store = FlakyStateStore::new(None);
    let engine = engine_with(&source, &notifier, &store);

    // Reference model: notify iff above the last persisted value or nothing persisted
    let mut persisted: Option<u64> = None;
    let mut expected = Vec::new();
    for &count in &counts {
        if persisted.is_none_or(|p| count > p) {
            expected.push((persisted, count));
            persisted = Some(count);
        }
    }

    for _ in 0..counts.len() {
        engine.run_cycle().await;
    }

    assert_eq!(notifier.delivered_counts(), expected);
    assert_eq!(store.value(), persisted);
    assert_eq!(store.value(), Some(16));
}

#[tokio::test]
async fn resolved_author_name_labels_the_message() {
    let source = ScriptedCountSource::new(vec![Ok(
        Observation::new(7).with_author_name("Ada Lovelace")
    )]);
    let notifier = RecordingNotifier::new();
    let store = FlakyStateStore::new(Some(5));
    let engine = engine_with(&source, &notifier, &store);

    engine.run_cycle().await;

    let delivered = notifier.delivered();
    assert_eq!(delivered[0].author_label, "Ada Lovelace");
    assert_eq!(delivered[0].query, "ID: qc6CJjYAAAAJ");
    assert_eq!(delivered[0].subject(), "Citation Increase for Ada Lovelace (+2)");
}

#[tokio::test]
async fn missing_author_name_falls_back_to_selector_value() {
    let source = ScriptedCountSource::counts(&[7]);
    let notifier = RecordingNotifier::new();
    let store = FlakyStateStore::new(Some(5));
    let engine = engine_with(&source, &notifier, &store);

    engine.run_cycle().await;

    assert_eq!(notifier.delivered()[0].author_label, "qc6CJjYAAAAJ");
}

#[tokio::test]
async fn not_found_touches_nothing() {
    let source = ScriptedCountSource::new(vec![Err(FetchError::not_found("no such profile"))]);
    let notifier = RecordingNotifier::new();
    let store = FlakyStateStore::new(Some(42));
    let engine = engine_with(&source, &notifier, &store);

    let outcome = engine.run_cycle().await;

    assert_eq!(
        outcome,
        CycleOutcome::FetchFailed {
            error: FetchError::not_found("no such profile")
        }
    );
    assert!(notifier.attempts().is_empty());
    assert_eq!(store.write_call_count(), 0);
    assert_eq!(store.value(), Some(42));
}
