use thiserror::Error;

use crate::domain::{CirculationFailure, LoanPolicyId, LoanPolicyRepresentationError};

/// 貸出・更新アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum CirculationApplicationError {
    /// 貸出ポリシーが存在しない
    #[error("Loan policy not found: {0:?}")]
    PolicyNotFound(LoanPolicyId),

    /// 貸出ポリシーの表現を解釈できない
    #[error("Invalid loan policy representation")]
    InvalidPolicyRepresentation(#[source] LoanPolicyRepresentationError),

    /// ドメイン層の検証エラーまたはサーバーエラー
    #[error(transparent)]
    Circulation(#[from] CirculationFailure),

    /// LoanPolicyRepositoryのエラー
    #[error("Loan policy repository error")]
    LoanPolicyRepositoryError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// FixedDueDateScheduleRepositoryのエラー
    #[error("Fixed due date schedule repository error")]
    ScheduleRepositoryError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// RequestQueueRepositoryのエラー
    #[error("Request queue repository error")]
    RequestQueueRepositoryError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CirculationApplicationError {
    /// 検証エラーの一覧（検証エラー以外は`None`）
    pub fn validation_errors(&self) -> Option<&crate::domain::ValidationErrors> {
        match self {
            CirculationApplicationError::Circulation(failure) => failure.validation_errors(),
            _ => None,
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, CirculationApplicationError>;
