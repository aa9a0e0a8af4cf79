use std::sync::Arc;

use super::{authorize, DEFAULT_LIST_LIMIT};
use crate::error::ServiceResult;
use crate::AppState;
use retail_core::{Action, Actor, ResourceScope, WorkLog};

pub struct WorkLogService {
    state: Arc<AppState>,
}

impl WorkLogService {
    pub fn new(state: Arc<AppState>) -> Self {
        WorkLogService { state }
    }

    /// Newest first. Admins see everything, managers their store, cashiers
    /// their own entries.
    pub async fn list_work_logs(
        &self,
        actor: &Actor,
        store_id: Option<i64>,
        limit: Option<u32>,
    ) -> ServiceResult<Vec<WorkLog>> {
        let filter = authorize(actor, Action::ViewWorkLogs, &ResourceScope::optional_store(store_id))?
            .with_requested_store(store_id);

        Ok(self
            .state
            .db
            .work_logs()
            .list(filter, limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .await?)
    }
}
