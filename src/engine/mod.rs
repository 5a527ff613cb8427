//! The playback session resume engine.
//!
//! One `ResumeEngine` call does the whole cycle synchronously: read the
//! store, plan the launch, generate the control script, run the player to
//! exit, reconcile the exit report, persist the new session. Single active
//! session by design; callers serialize launches.

pub mod planner;
pub mod playlist;
pub mod script;
pub mod supervisor;

use crate::error::Result;
use crate::model::{now_rfc3339, EngineConfig, LaunchPlan, PlayIntent, RunOutcome, SessionRecord};
use crate::storage;
use tracing::warn;

pub struct ResumeEngine {
    cfg: EngineConfig,
}

impl ResumeEngine {
    pub fn new(cfg: EngineConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// The stored session, with corruption downgraded to "absent" plus a
    /// warning. Only an intact record is worth resuming.
    pub fn stored_session(&self) -> Option<SessionRecord> {
        match storage::load_session(&self.cfg.cache_file) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable session store");
                None
            }
        }
    }

    /// Build the launch plan for `intent` without running anything.
    /// Planning alone never mutates the store.
    pub fn plan(&self, intent: &PlayIntent) -> Result<LaunchPlan> {
        let stored = self.stored_session();
        planner::plan(&self.cfg, intent, stored.as_ref())
    }

    /// Plan, run the player to exit, and persist the captured session.
    ///
    /// Persistence failure is reported but does not undo the run: playback
    /// happened, and the prior record on disk stays intact.
    pub async fn play(&self, intent: &PlayIntent) -> Result<RunOutcome> {
        let plan = self.plan(intent)?;
        let mut outcome = supervisor::run(&plan, self.cfg.output_capture_bytes).await?;
        outcome.session.updated_at = now_rfc3339();
        storage::save_session(&self.cfg.cache_file, &outcome.session)?;
        Ok(outcome)
    }
}
