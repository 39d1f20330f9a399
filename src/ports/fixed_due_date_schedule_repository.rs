use crate::domain::FixedDueDateSchedules;
use crate::domain::value_objects::ScheduleId;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 固定返却期限スケジュールの取得ポート
#[async_trait]
pub trait FixedDueDateScheduleRepository: Send + Sync {
    /// IDでスケジュールを取得する
    ///
    /// 存在しない場合は`None`。呼び出し側は`FixedDueDateSchedules::none()`として扱う。
    async fn find_by_id(&self, schedule_id: ScheduleId) -> Result<Option<FixedDueDateSchedules>>;
}
