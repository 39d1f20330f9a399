use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::errors::{CirculationErrorKind, ValidationError, ValidationErrors};
use super::{ItemId, RequestId, UserId};

/// 予約種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestType {
    Hold,
    Recall,
    Page,
}

impl RequestType {
    /// キューに入った時点で資料状態の再評価が必要か
    ///
    /// 取り置き（Hold）とリコール（Recall）は貸出中の資料に対する予約なので必要。
    /// 書庫出納（Page）は貸出可能な資料に対するもので不要。
    pub fn changes_item_status(&self) -> bool {
        matches!(self, RequestType::Hold | RequestType::Recall)
    }
}

/// 予約状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    #[serde(rename = "Open - Not yet filled")]
    OpenNotYetFilled,
    #[serde(rename = "Open - Awaiting pickup")]
    OpenAwaitingPickup,
    #[serde(rename = "Open - In transit")]
    OpenInTransit,
    #[serde(rename = "Open - Awaiting delivery")]
    OpenAwaitingDelivery,
    #[serde(rename = "Closed - Filled")]
    ClosedFilled,
    #[serde(rename = "Closed - Cancelled")]
    ClosedCancelled,
    #[serde(rename = "Closed - Unfilled")]
    ClosedUnfilled,
    #[serde(rename = "Closed - Pickup expired")]
    ClosedPickupExpired,
}

impl RequestStatus {
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            RequestStatus::OpenNotYetFilled
                | RequestStatus::OpenAwaitingPickup
                | RequestStatus::OpenInTransit
                | RequestStatus::OpenAwaitingDelivery
        )
    }

    /// 提供処理が始まっているか（受取待ち・輸送中・配送待ち）
    pub fn fulfillment_begun(&self) -> bool {
        matches!(
            self,
            RequestStatus::OpenAwaitingPickup
                | RequestStatus::OpenInTransit
                | RequestStatus::OpenAwaitingDelivery
        )
    }
}

/// 予約
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: RequestId,
    pub item_id: ItemId,
    pub requester_id: UserId,
    pub request_type: RequestType,
    pub status: RequestStatus,
    /// キュー内の位置（1始まり）
    pub position: u32,
}

impl Request {
    pub fn new(item_id: ItemId, requester_id: UserId, request_type: RequestType) -> Self {
        Self {
            id: RequestId::new(),
            item_id,
            requester_id,
            request_type,
            status: RequestStatus::OpenNotYetFilled,
            position: 0,
        }
    }

    pub fn is_open_recall(&self) -> bool {
        self.request_type == RequestType::Recall && self.status.is_open()
    }
}

/// 並べ替え要求の1件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub id: RequestId,
    pub new_position: u32,
}

/// 資料ごとの予約キュー
///
/// 位置の昇順に保持し、位置は常に1..=nの連番。
/// 更新エンジンからは読み取り専用で参照される。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Request>", into = "Vec<Request>")]
pub struct RequestQueue {
    requests: Vec<Request>,
}

impl From<Vec<Request>> for RequestQueue {
    fn from(requests: Vec<Request>) -> Self {
        RequestQueue::new(requests)
    }
}

impl From<RequestQueue> for Vec<Request> {
    fn from(queue: RequestQueue) -> Self {
        queue.requests
    }
}

impl RequestQueue {
    /// 既存の予約からキューを作る（位置の順に並べる）
    pub fn new(mut requests: Vec<Request>) -> Self {
        requests.sort_by_key(|request| request.position);
        Self { requests }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn size(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    pub fn contains(&self, request_id: RequestId) -> bool {
        self.requests.iter().any(|request| request.id == request_id)
    }

    /// 先頭（最優先）の予約
    pub fn highest_priority(&self) -> Option<&Request> {
        self.requests.first()
    }

    pub fn has_open_requests(&self) -> bool {
        self.requests.iter().any(|request| request.status.is_open())
    }

    /// 有効なリコール予約（最も位置が前のもの）
    pub fn open_recall_request(&self) -> Option<&Request> {
        self.requests.iter().find(|request| request.is_open_recall())
    }

    pub fn has_open_recall_request(&self) -> bool {
        self.open_recall_request().is_some()
    }

    /// 予約を末尾に追加したキューを返す
    pub fn add(mut self, mut request: Request) -> Self {
        request.position = self.next_position();
        self.requests.push(request);
        self
    }

    /// 予約を取り除き、後続の位置を詰めたキューを返す
    pub fn remove(mut self, request_id: RequestId) -> Self {
        self.requests.retain(|request| request.id != request_id);
        self.renumber();
        self
    }

    /// 職員の指定どおりに並べ替えたキューを返す
    ///
    /// # エラー
    /// - すべての予約がちょうど1回ずつ指定されていない
    /// - 位置が1..=nの連番になっていない
    /// - 先頭の書庫出納予約を先頭から動かそうとしている
    /// - 提供処理が始まった先頭の予約を先頭から動かそうとしている
    pub fn reorder(&self, reordered: &[ReorderRequest]) -> Result<Self, ValidationErrors> {
        self.validate_same_requests(reordered)?;
        validate_sequential_positions(reordered)?;

        let new_positions: HashMap<RequestId, u32> = reordered
            .iter()
            .map(|reorder| (reorder.id, reorder.new_position))
            .collect();

        if let Some(first) = self.highest_priority() {
            let stays_first = new_positions.get(&first.id) == Some(&1);
            if !stays_first && first.request_type == RequestType::Page {
                return Err(reorder_error("Page requests can not be displaced from position 1.").into());
            }
            if !stays_first && first.status.fulfillment_begun() {
                return Err(reorder_error(
                    "Requests can not be displaced from position 1 when fulfillment begun.",
                )
                .into());
            }
        }

        let requests = self
            .requests
            .iter()
            .map(|request| Request {
                position: new_positions.get(&request.id).copied().unwrap_or(request.position),
                ..request.clone()
            })
            .collect();

        Ok(RequestQueue::new(requests))
    }

    fn validate_same_requests(&self, reordered: &[ReorderRequest]) -> Result<(), ValidationErrors> {
        let existing: HashSet<RequestId> = self.requests.iter().map(|request| request.id).collect();
        let provided: HashSet<RequestId> = reordered.iter().map(|reorder| reorder.id).collect();

        if reordered.len() != self.requests.len() || existing != provided {
            return Err(reorder_error(
                "There is inconsistency between provided reordered queue and item queue.",
            )
            .into());
        }
        Ok(())
    }

    fn next_position(&self) -> u32 {
        self.requests
            .last()
            .map(|request| request.position.saturating_add(1))
            .unwrap_or(1)
    }

    fn renumber(&mut self) {
        for (position, request) in (1u32..).zip(self.requests.iter_mut()) {
            request.position = position;
        }
    }
}

fn validate_sequential_positions(reordered: &[ReorderRequest]) -> Result<(), ValidationErrors> {
    let mut positions: Vec<u32> = reordered.iter().map(|reorder| reorder.new_position).collect();
    positions.sort_unstable();

    let sequential = positions
        .iter()
        .zip(1u32..)
        .all(|(position, expected)| *position == expected);

    if !sequential {
        return Err(reorder_error("Positions must have sequential order.").into());
    }
    Ok(())
}

fn reorder_error(reason: &str) -> ValidationError {
    ValidationError::new(CirculationErrorKind::InvalidQueueReorder, reason)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_of(request_type: RequestType, status: RequestStatus, item_id: ItemId) -> Request {
        Request {
            status,
            ..Request::new(item_id, UserId::new(), request_type)
        }
    }

    fn queue_of(requests: Vec<Request>) -> RequestQueue {
        requests
            .into_iter()
            .fold(RequestQueue::empty(), |queue, request| queue.add(request))
    }

    fn positions(queue: &RequestQueue) -> Vec<(RequestId, u32)> {
        queue.requests().iter().map(|r| (r.id, r.position)).collect()
    }

    #[test]
    fn test_changes_item_status() {
        assert!(RequestType::Hold.changes_item_status());
        assert!(RequestType::Recall.changes_item_status());
        assert!(!RequestType::Page.changes_item_status());
    }

    #[test]
    fn test_add_appends_at_next_position() {
        let item_id = ItemId::new();
        let queue = queue_of(vec![
            request_of(RequestType::Hold, RequestStatus::OpenNotYetFilled, item_id),
            request_of(RequestType::Recall, RequestStatus::OpenNotYetFilled, item_id),
        ]);

        assert_eq!(queue.size(), 2);
        let found: Vec<u32> = queue.requests().iter().map(|r| r.position).collect();
        assert_eq!(found, vec![1, 2]);
    }

    #[test]
    fn test_add_after_last_possible_position_does_not_overflow() {
        let item_id = ItemId::new();
        let last = Request {
            position: u32::MAX,
            ..Request::new(item_id, UserId::new(), RequestType::Hold)
        };
        let queue = RequestQueue::new(vec![last]);

        let queue = queue.add(Request::new(item_id, UserId::new(), RequestType::Page));

        assert_eq!(queue.size(), 2);
        assert_eq!(queue.requests()[1].position, u32::MAX);
    }

    #[test]
    fn test_remove_first_request_renumbers_remaining() {
        let item_id = ItemId::new();
        let first = request_of(RequestType::Hold, RequestStatus::OpenNotYetFilled, item_id);
        let second = request_of(RequestType::Hold, RequestStatus::OpenNotYetFilled, item_id);
        let third = request_of(RequestType::Recall, RequestStatus::OpenNotYetFilled, item_id);
        let (first_id, second_id, third_id) = (first.id, second.id, third.id);

        let queue = queue_of(vec![first, second, third]).remove(first_id);

        assert_eq!(queue.size(), 2);
        assert!(!queue.contains(first_id));
        assert_eq!(positions(&queue), vec![(second_id, 1), (third_id, 2)]);
    }

    #[test]
    fn test_remove_only_request_leaves_empty_queue() {
        let request = request_of(RequestType::Hold, RequestStatus::OpenNotYetFilled, ItemId::new());
        let id = request.id;
        let queue = queue_of(vec![request]).remove(id);
        assert_eq!(queue.size(), 0);
        assert!(queue.highest_priority().is_none());
    }

    #[test]
    fn test_new_orders_by_position() {
        let item_id = ItemId::new();
        let mut later = request_of(RequestType::Hold, RequestStatus::OpenNotYetFilled, item_id);
        later.position = 2;
        let mut earlier = request_of(RequestType::Recall, RequestStatus::OpenNotYetFilled, item_id);
        earlier.position = 1;
        let earlier_id = earlier.id;

        let queue = RequestQueue::new(vec![later, earlier]);
        assert_eq!(queue.highest_priority().map(|r| r.id), Some(earlier_id));
    }

    #[test]
    fn test_open_recall_anywhere_in_queue() {
        let item_id = ItemId::new();
        let queue = queue_of(vec![
            request_of(RequestType::Hold, RequestStatus::OpenNotYetFilled, item_id),
            request_of(RequestType::Recall, RequestStatus::OpenNotYetFilled, item_id),
        ]);
        assert!(queue.has_open_recall_request());
    }

    #[test]
    fn test_closed_recall_is_not_open() {
        let item_id = ItemId::new();
        let queue = queue_of(vec![request_of(
            RequestType::Recall,
            RequestStatus::ClosedCancelled,
            item_id,
        )]);
        assert!(!queue.has_open_recall_request());
        assert!(!queue.has_open_requests());
    }

    #[test]
    fn test_reorder_moves_requests() {
        let item_id = ItemId::new();
        let first = request_of(RequestType::Hold, RequestStatus::OpenNotYetFilled, item_id);
        let second = request_of(RequestType::Recall, RequestStatus::OpenNotYetFilled, item_id);
        let (first_id, second_id) = (first.id, second.id);
        let queue = queue_of(vec![first, second]);

        let reordered = queue
            .reorder(&[
                ReorderRequest { id: first_id, new_position: 2 },
                ReorderRequest { id: second_id, new_position: 1 },
            ])
            .unwrap();

        assert_eq!(positions(&reordered), vec![(second_id, 1), (first_id, 2)]);
        // 元のキューは変わらない
        assert_eq!(positions(&queue), vec![(first_id, 1), (second_id, 2)]);
    }

    #[test]
    fn test_reorder_rejects_missing_request() {
        let item_id = ItemId::new();
        let first = request_of(RequestType::Hold, RequestStatus::OpenNotYetFilled, item_id);
        let second = request_of(RequestType::Recall, RequestStatus::OpenNotYetFilled, item_id);
        let second_id = second.id;
        let queue = queue_of(vec![first, second]);

        let errors = queue
            .reorder(&[ReorderRequest { id: second_id, new_position: 1 }])
            .unwrap_err();
        assert!(errors.has_reason(
            "There is inconsistency between provided reordered queue and item queue."
        ));
    }

    #[test]
    fn test_reorder_rejects_gaps_in_positions() {
        let item_id = ItemId::new();
        let first = request_of(RequestType::Hold, RequestStatus::OpenNotYetFilled, item_id);
        let second = request_of(RequestType::Recall, RequestStatus::OpenNotYetFilled, item_id);
        let (first_id, second_id) = (first.id, second.id);
        let queue = queue_of(vec![first, second]);

        let errors = queue
            .reorder(&[
                ReorderRequest { id: first_id, new_position: 1 },
                ReorderRequest { id: second_id, new_position: 3 },
            ])
            .unwrap_err();
        assert!(errors.has_reason("Positions must have sequential order."));
    }

    #[test]
    fn test_reorder_keeps_page_request_first() {
        let item_id = ItemId::new();
        let page = request_of(RequestType::Page, RequestStatus::OpenNotYetFilled, item_id);
        let hold = request_of(RequestType::Hold, RequestStatus::OpenNotYetFilled, item_id);
        let (page_id, hold_id) = (page.id, hold.id);
        let queue = queue_of(vec![page, hold]);

        let errors = queue
            .reorder(&[
                ReorderRequest { id: page_id, new_position: 2 },
                ReorderRequest { id: hold_id, new_position: 1 },
            ])
            .unwrap_err();
        assert!(errors.has_reason("Page requests can not be displaced from position 1."));
    }

    #[test]
    fn test_reorder_keeps_request_in_fulfillment_first() {
        let item_id = ItemId::new();
        let awaiting = request_of(RequestType::Hold, RequestStatus::OpenAwaitingPickup, item_id);
        let recall = request_of(RequestType::Recall, RequestStatus::OpenNotYetFilled, item_id);
        let (awaiting_id, recall_id) = (awaiting.id, recall.id);
        let queue = queue_of(vec![awaiting, recall]);

        let errors = queue
            .reorder(&[
                ReorderRequest { id: awaiting_id, new_position: 2 },
                ReorderRequest { id: recall_id, new_position: 1 },
            ])
            .unwrap_err();
        assert!(errors.has_reason(
            "Requests can not be displaced from position 1 when fulfillment begun."
        ));
        assert!(errors.has_kind(CirculationErrorKind::InvalidQueueReorder));
    }

    #[test]
    fn test_deserialize_queue_from_request_list() {
        let queue: RequestQueue = serde_json::from_value(serde_json::json!([
            {
                "id": "4e8b3a7c-5a71-4c36-9c5c-6b0f0a7c2d41",
                "itemId": "9428231b-dd31-4f70-8406-fe22fbdeabc2",
                "requesterId": "ab579dc3-219b-4f5b-8068-ab1c7a55c402",
                "requestType": "Recall",
                "status": "Open - Not yet filled",
                "position": 2
            },
            {
                "id": "0b6a3c8f-92a1-4f0e-8b9a-2d7c5e4f1a30",
                "itemId": "9428231b-dd31-4f70-8406-fe22fbdeabc2",
                "requesterId": "be579dc3-219b-4f5b-8068-ab1c7a55c402",
                "requestType": "Hold",
                "status": "Open - Awaiting pickup",
                "position": 1
            }
        ]))
        .unwrap();

        assert_eq!(queue.size(), 2);
        assert_eq!(
            queue.highest_priority().map(|r| r.request_type),
            Some(RequestType::Hold)
        );
        assert!(queue.has_open_recall_request());
    }
}
