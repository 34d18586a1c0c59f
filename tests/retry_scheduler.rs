//! Retry Scheduler coverage (spec §8 P4): the number of times
//! `thumbnail.retry` schedules a new attempt for one `media_id` stays
//! within `THUMBNAIL_RETRY_MAX_ATTEMPTS`; the call after the budget is
//! exhausted permanently disables retry instead of scheduling again.

mod common;

use mediavault_core::domain::task_record::THUMBNAIL_RETRY_MAX_ATTEMPTS;
use mediavault_core::operations::post_processing::retry_scheduler;

#[tokio::test]
async fn stops_scheduling_once_max_attempts_is_reached() {
    let harness = common::Harness::new().await;
    let media_id = 1i64;
    let blockers = serde_json::json!({"reason": "completed playback missing"});

    for attempt in 1..=THUMBNAIL_RETRY_MAX_ATTEMPTS {
        let outcome = retry_scheduler::schedule(&harness.ctx, media_id, false, blockers.clone())
            .await
            .expect("schedule runs");
        assert!(outcome.scheduled, "attempt {attempt} should still be within budget");
        assert_eq!(outcome.attempts, attempt);
    }

    let final_outcome = retry_scheduler::schedule(&harness.ctx, media_id, false, blockers.clone())
        .await
        .expect("schedule runs");
    assert!(!final_outcome.scheduled);
    assert_eq!(final_outcome.reason.as_deref(), Some("max_attempts"));

    let submissions = harness.task_runner.submissions.lock().unwrap();
    assert_eq!(submissions.len(), THUMBNAIL_RETRY_MAX_ATTEMPTS as usize);
}
