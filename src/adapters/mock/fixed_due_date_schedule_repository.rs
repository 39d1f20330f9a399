use crate::domain::FixedDueDateSchedules;
use crate::domain::value_objects::ScheduleId;
use crate::ports::fixed_due_date_schedule_repository::{
    FixedDueDateScheduleRepository as FixedDueDateScheduleRepositoryTrait, Result,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// FixedDueDateScheduleRepositoryのモック実装
///
/// 登録したスケジュールをIDで返す。
pub struct FixedDueDateScheduleRepository {
    schedules: Mutex<HashMap<ScheduleId, FixedDueDateSchedules>>,
}

impl FixedDueDateScheduleRepository {
    pub fn new() -> Self {
        Self {
            schedules: Mutex::new(HashMap::new()),
        }
    }

    /// スケジュールを登録する（IDを持たないものは無視）
    pub fn add_schedules(&self, schedules: FixedDueDateSchedules) {
        if let Some(id) = schedules.id() {
            self.schedules
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(id, schedules);
        }
    }
}

impl Default for FixedDueDateScheduleRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FixedDueDateScheduleRepositoryTrait for FixedDueDateScheduleRepository {
    async fn find_by_id(&self, schedule_id: ScheduleId) -> Result<Option<FixedDueDateSchedules>> {
        let schedules = self.schedules.lock().map_err(|e| e.to_string())?;
        Ok(schedules.get(&schedule_id).cloned())
    }
}
