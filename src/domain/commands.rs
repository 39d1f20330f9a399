use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::loan::Loan;
use super::{ItemId, LoanPolicyId, UserId};

/// コマンド：資料を貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutItem {
    pub item_id: ItemId,
    pub user_id: UserId,
    pub loan_policy_id: LoanPolicyId,
    pub loan_date: DateTime<Utc>,
}

/// コマンド：貸出を更新する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewLoan {
    pub loan: Loan,
    pub loan_policy_id: LoanPolicyId,
    pub system_date: DateTime<Utc>,
}

/// コマンド：職員のオーバーライドで貸出を更新する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRenewLoan {
    pub loan: Loan,
    pub loan_policy_id: LoanPolicyId,
    pub system_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

/// コマンド：リコールにより返却期限を短縮する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecallLoan {
    pub loan: Loan,
    pub loan_policy_id: LoanPolicyId,
    pub system_date: DateTime<Utc>,
}
