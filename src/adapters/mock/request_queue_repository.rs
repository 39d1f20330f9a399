use crate::domain::Request;
use crate::domain::RequestQueue;
use crate::domain::value_objects::ItemId;
use crate::ports::request_queue_repository::{
    RequestQueueRepository as RequestQueueRepositoryTrait, Result,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// RequestQueueRepositoryのモック実装
///
/// 予約を資料IDごとに保持し、取得時に位置順のキューを組み立てる。
pub struct RequestQueueRepository {
    requests: Mutex<HashMap<ItemId, Vec<Request>>>,
}

impl RequestQueueRepository {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// 予約を登録する
    pub fn add_request(&self, request: Request) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(request.item_id)
            .or_default()
            .push(request);
    }
}

impl Default for RequestQueueRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestQueueRepositoryTrait for RequestQueueRepository {
    async fn get_queue_for_item(&self, item_id: ItemId) -> Result<RequestQueue> {
        let requests = self.requests.lock().map_err(|e| e.to_string())?;
        let for_item = requests.get(&item_id).cloned().unwrap_or_default();
        Ok(RequestQueue::new(for_item))
    }
}
