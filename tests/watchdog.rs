//! Selection Watchdog coverage (spec §5): a `running` selection whose
//! heartbeat has gone stale is reclaimed back to `enqueued` (or failed once
//! it has exhausted `lock_max_attempts`), and a long-stalled `enqueued`
//! selection is republished.

mod common;

use chrono::Duration as ChronoDuration;
use mediavault_core::infrastructure::database::entities::{picker_selection, picker_session};
use mediavault_core::operations::watchdog;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};

async fn seed_session(harness: &common::Harness) -> picker_session::Model {
    let now = harness.ctx.clock.now();
    let active = picker_session::ActiveModel {
        session_id: Set(format!("test-{}", uuid::Uuid::new_v4())),
        status: Set("processing".to_string()),
        account_id: Set(None),
        selected_count: Set(0),
        stats: Set(serde_json::json!({})),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    active.insert(harness.ctx.db.as_ref()).await.unwrap()
}

#[tokio::test]
async fn reclaims_a_stale_lock_back_to_enqueued() {
    let harness = common::Harness::new().await;
    let session = seed_session(&harness).await;
    let now = harness.ctx.clock.now();

    let active = picker_selection::ActiveModel {
        session_id: Set(session.id),
        local_file_path: Set(Some("/tmp/stale.png".to_string())),
        status: Set("running".to_string()),
        attempts: Set(0),
        locked_by: Set(Some("worker-1".to_string())),
        lock_heartbeat_at: Set(Some(now)),
        ..Default::default()
    };
    active.insert(harness.ctx.db.as_ref()).await.unwrap();

    harness.clock.advance(ChronoDuration::seconds(
        harness.ctx.config.watchdog.lock_heartbeat_timeout_secs + 10,
    ));

    let outcome = watchdog::sweep(&harness.ctx).await.expect("sweep runs");
    assert_eq!(outcome.reclaimed, 1);
    assert_eq!(outcome.failed, 0);

    let rows = picker_selection::Entity::find().all(harness.ctx.db.as_ref()).await.unwrap();
    assert_eq!(rows[0].status, "enqueued");
    assert_eq!(rows[0].attempts, 1);
    assert!(rows[0].locked_by.is_none());
}

#[tokio::test]
async fn fails_a_stale_lock_once_attempts_exhaust_the_budget() {
    let harness = common::Harness::new().await;
    let session = seed_session(&harness).await;
    let now = harness.ctx.clock.now();
    let max_attempts = harness.ctx.config.watchdog.lock_max_attempts as i32;

    let active = picker_selection::ActiveModel {
        session_id: Set(session.id),
        local_file_path: Set(Some("/tmp/stale.png".to_string())),
        status: Set("running".to_string()),
        attempts: Set(max_attempts - 1),
        locked_by: Set(Some("worker-1".to_string())),
        lock_heartbeat_at: Set(Some(now)),
        ..Default::default()
    };
    active.insert(harness.ctx.db.as_ref()).await.unwrap();

    harness.clock.advance(ChronoDuration::seconds(
        harness.ctx.config.watchdog.lock_heartbeat_timeout_secs + 10,
    ));

    let outcome = watchdog::sweep(&harness.ctx).await.expect("sweep runs");
    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.reclaimed, 0);

    let rows = picker_selection::Entity::find().all(harness.ctx.db.as_ref()).await.unwrap();
    assert_eq!(rows[0].status, "failed");
    assert_eq!(rows[0].error.as_deref(), Some("watchdog_timeout"));
}

#[tokio::test]
async fn republishes_a_long_stalled_enqueued_selection() {
    let harness = common::Harness::new().await;
    let session = seed_session(&harness).await;
    let now = harness.ctx.clock.now();

    let active = picker_selection::ActiveModel {
        session_id: Set(session.id),
        local_file_path: Set(Some("/tmp/stalled.png".to_string())),
        status: Set("enqueued".to_string()),
        attempts: Set(0),
        enqueued_at: Set(Some(now)),
        ..Default::default()
    };
    active.insert(harness.ctx.db.as_ref()).await.unwrap();

    harness.clock.advance(ChronoDuration::seconds(
        harness.ctx.config.watchdog.stalled_enqueued_timeout_secs + 10,
    ));

    let outcome = watchdog::sweep(&harness.ctx).await.expect("sweep runs");
    assert_eq!(outcome.republished, 1);
}
