use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::loan_policy::LoanPolicy;
use super::{ItemId, LoanId, LoanPolicyId, RenewalCount, UserId};

/// 貸出状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    Open,
    Closed,
}

impl LoanStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, LoanStatus::Open)
    }
}

/// 貸出に対して最後に行われた操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanAction {
    #[serde(rename = "checkedout")]
    CheckedOut,
    #[serde(rename = "renewed")]
    Renewed,
    #[serde(rename = "renewedThroughOverride")]
    RenewedThroughOverride,
    #[serde(rename = "recallrequested")]
    RecallRequested,
}

/// 貸出のスナップショット
///
/// 計算エンジンは受け取ったLoanを変更しない。
/// 貸出・更新・リコールはすべて新しいLoanを返す。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    // 識別子
    pub id: LoanId,

    // 他の集約への参照（IDのみ）
    pub item_id: ItemId,
    pub user_id: UserId,

    // 貸出管理の責務
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub status: LoanStatus,
    #[serde(default)]
    pub renewal_count: RenewalCount,
    #[serde(default)]
    pub loan_policy_id: Option<LoanPolicyId>,

    // 最後の操作
    #[serde(default)]
    pub action: Option<LoanAction>,
    #[serde(default)]
    pub action_comment: Option<String>,
    #[serde(default)]
    pub due_date_changed_by_recall: bool,
}

impl Loan {
    /// 貸出前のスナップショットを作る（返却期限は貸出日時で仮置き）
    pub fn new(item_id: ItemId, user_id: UserId, loan_date: DateTime<Utc>) -> Self {
        Self {
            id: LoanId::new(),
            item_id,
            user_id,
            loan_date,
            due_date: loan_date,
            status: LoanStatus::Open,
            renewal_count: RenewalCount::new(),
            loan_policy_id: None,
            action: None,
            action_comment: None,
            due_date_changed_by_recall: false,
        }
    }

    /// 貸出として確定したLoanを返す
    pub fn check_out(&self, due_date: DateTime<Utc>, policy_id: LoanPolicyId) -> Self {
        Self {
            due_date,
            loan_policy_id: Some(policy_id),
            action: Some(LoanAction::CheckedOut),
            action_comment: None,
            ..self.clone()
        }
    }

    /// 更新後のLoanを返す
    ///
    /// 更新回数を1増やし、コメントは消す。
    pub fn renew(&self, due_date: DateTime<Utc>, policy_id: LoanPolicyId) -> Self {
        Self {
            due_date,
            loan_policy_id: Some(policy_id),
            renewal_count: self.renewal_count.increment(),
            action: Some(LoanAction::Renewed),
            action_comment: None,
            ..self.clone()
        }
    }

    /// 職員のオーバーライドによる更新後のLoanを返す
    pub fn override_renewal(
        &self,
        due_date: DateTime<Utc>,
        policy_id: LoanPolicyId,
        comment: &str,
    ) -> Self {
        Self {
            due_date,
            loan_policy_id: Some(policy_id),
            renewal_count: self.renewal_count.increment(),
            action: Some(LoanAction::RenewedThroughOverride),
            action_comment: Some(comment.to_string()),
            ..self.clone()
        }
    }

    /// リコールによって返却期限を変更したLoanを返す
    pub fn change_due_date_for_recall(&self, due_date: DateTime<Utc>) -> Self {
        Self {
            due_date,
            action: Some(LoanAction::RecallRequested),
            action_comment: None,
            due_date_changed_by_recall: true,
            ..self.clone()
        }
    }

    /// 延滞しているか（返却期限ちょうどは延滞ではない）
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status.is_open() && self.due_date < now
    }

    /// 猶予期間を過ぎて延滞しているか
    ///
    /// 猶予期間が無いポリシーでは`is_overdue`と同じ。
    pub fn is_overdue_after_grace(&self, policy: &LoanPolicy, now: DateTime<Utc>) -> bool {
        match policy.grace_period() {
            Some(grace) => {
                self.status.is_open() && grace.has_passed_since_date_till_now(self.due_date, now)
            }
            None => self.is_overdue(now),
        }
    }
}
