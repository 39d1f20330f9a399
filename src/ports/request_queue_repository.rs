use crate::domain::RequestQueue;
use crate::domain::value_objects::ItemId;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 資料ごとの予約キューの取得ポート
#[async_trait]
pub trait RequestQueueRepository: Send + Sync {
    /// 資料の予約キューを取得する（予約が無ければ空のキュー）
    async fn get_queue_for_item(&self, item_id: ItemId) -> Result<RequestQueue>;
}
