//! Collaborator injection (spec §9 REDESIGN FLAG, SPEC_FULL §2.4).
//! Generalizes `core-new/src/context.rs`'s `CoreContext`, which threads
//! `events`, `device`, `libraries`, `volumes` through every operation
//! instead of reaching into process-global state.

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::Config;
use crate::infrastructure::clock::Clock;
use crate::infrastructure::logging::EventLog;
use crate::infrastructure::task_runner::TaskRunner;
use crate::infrastructure::transcoder::Transcoder;

#[derive(Clone)]
pub struct IngestContext {
    pub db: Arc<DatabaseConnection>,
    pub clock: Arc<dyn Clock>,
    pub task_runner: Arc<dyn TaskRunner>,
    pub events: Arc<dyn EventLog>,
    pub transcoder: Arc<dyn Transcoder>,
    pub config: Config,
}

impl IngestContext {
    pub fn new(
        db: Arc<DatabaseConnection>,
        clock: Arc<dyn Clock>,
        task_runner: Arc<dyn TaskRunner>,
        events: Arc<dyn EventLog>,
        transcoder: Arc<dyn Transcoder>,
        config: Config,
    ) -> Self {
        Self {
            db,
            clock,
            task_runner,
            events,
            transcoder,
            config,
        }
    }
}
