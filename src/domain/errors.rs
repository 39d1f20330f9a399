use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::LoanPolicyId;

/// 検証エラーの大分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// ポリシー設定の不備（プロファイル・期間・更新基準日が不正）
    Configuration,
    /// 日付がスケジュールのどの範囲にも含まれない
    Range,
    /// 業務ルール違反（更新上限・リコール・期限が変わらない等）
    BusinessRule,
    /// リクエスト自体の不備（オーバーライドのコメント欠落等）
    Request,
}

/// 検証エラーの種別
///
/// オーバーライド可否はこの種別で判定する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CirculationErrorKind {
    /// プロファイル・期間・更新基準日の設定不備
    InvalidPolicyConfiguration,
    /// 日付が固定スケジュールの範囲外
    DateOutsideSchedules,
    /// 更新回数の上限に到達
    RenewalLimitReached,
    /// 有効なリコール予約がある
    OpenRecallRequest,
    /// 保留予約があり、ポリシーが予約付き更新を許可していない
    HoldRequestBlocksRenewal,
    /// 更新しても返却期限が延びない
    DueDateNotChanged,
    /// 貸出不可ポリシー
    ItemNotLoanable,
    /// 更新不可ポリシー
    LoanNotRenewable,
    /// オーバーライド要求の入力不備
    InvalidOverrideRequest,
    /// 予約キューの並べ替え要求の不備
    InvalidQueueReorder,
}

impl CirculationErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CirculationErrorKind::InvalidPolicyConfiguration => ErrorCategory::Configuration,
            CirculationErrorKind::DateOutsideSchedules => ErrorCategory::Range,
            CirculationErrorKind::RenewalLimitReached
            | CirculationErrorKind::OpenRecallRequest
            | CirculationErrorKind::HoldRequestBlocksRenewal
            | CirculationErrorKind::DueDateNotChanged
            | CirculationErrorKind::ItemNotLoanable
            | CirculationErrorKind::LoanNotRenewable => ErrorCategory::BusinessRule,
            CirculationErrorKind::InvalidOverrideRequest
            | CirculationErrorKind::InvalidQueueReorder => ErrorCategory::Request,
        }
    }

    /// 職員によるオーバーライドで回避できるか
    ///
    /// 設定不備とリクエスト不備は回避できない。
    pub fn is_overridable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Range | ErrorCategory::BusinessRule
        )
    }
}

/// 1件の検証エラー
///
/// 理由（人が読める文字列）とフィールド単位のパラメータを持つ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub kind: CirculationErrorKind,
    pub reason: String,
    pub parameters: BTreeMap<String, String>,
}

impl ValidationError {
    pub fn new(kind: CirculationErrorKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// パラメータを追加した新しいエラーを返す
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// 貸出ポリシーを特定するパラメータ付きのエラー
    pub fn for_policy(
        kind: CirculationErrorKind,
        reason: impl Into<String>,
        policy_id: LoanPolicyId,
        policy_name: &str,
    ) -> Self {
        Self::new(kind, reason)
            .with_parameter("loanPolicyId", policy_id.value().to_string())
            .with_parameter("loanPolicyName", policy_name)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

/// 蓄積された検証エラー
///
/// 挿入順を保持し、同一のエラーは1件にまとめる。
/// 最初のエラーで止めずにすべてのチェックを実行し、
/// 利用者が1往復ですべての問題を修正できるようにする。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// エラーを追加する（重複は無視）
    pub fn push(&mut self, error: ValidationError) {
        if !self.0.contains(&error) {
            self.0.push(error);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn has_kind(&self, kind: CirculationErrorKind) -> bool {
        self.0.iter().any(|e| e.kind == kind)
    }

    pub fn has_reason(&self, reason: &str) -> bool {
        self.0.iter().any(|e| e.reason == reason)
    }

    /// 述語を満たすエラーを取り除いた一覧を返す
    ///
    /// オーバーライド時の「回避できるエラー」の除外に使う。
    pub fn without(&self, predicate: impl Fn(&ValidationError) -> bool) -> Self {
        Self(self.0.iter().filter(|e| !predicate(e)).cloned().collect())
    }

    /// エラーが無ければ値を、あれば全件を失敗として返す（停止モード）
    pub fn into_result<T>(self, value: T) -> CirculationResult<T> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(CirculationFailure::Validation(self))
        }
    }
}

impl Extend<ValidationError> for ValidationErrors {
    fn extend<I: IntoIterator<Item = ValidationError>>(&mut self, iter: I) {
        for error in iter {
            self.push(error);
        }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reasons: Vec<&str> = self.0.iter().map(|e| e.reason.as_str()).collect();
        f.write_str(&reasons.join("; "))
    }
}

/// 貸出・更新処理の失敗
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CirculationFailure {
    /// 検証エラー（HTTP層では422に変換される）
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// 想定外のエラー。元のメッセージを理由として保持する
    #[error("server error: {0}")]
    ServerError(String),
}

impl CirculationFailure {
    /// 検証エラーの一覧（サーバーエラーの場合は空）
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            CirculationFailure::Validation(errors) => Some(errors),
            CirculationFailure::ServerError(_) => None,
        }
    }
}

impl From<ValidationError> for CirculationFailure {
    fn from(error: ValidationError) -> Self {
        CirculationFailure::Validation(ValidationErrors::from(error))
    }
}

impl From<ValidationErrors> for CirculationFailure {
    fn from(errors: ValidationErrors) -> Self {
        CirculationFailure::Validation(errors)
    }
}

/// ドメイン層の Result型
pub type CirculationResult<T> = std::result::Result<T, CirculationFailure>;

/// オーバーライドで回避を許可するエラー種別
///
/// 停止モードは空集合、職員のオーバーライド更新は
/// `renewal_override()`を使う。設定不備は常に回避不可。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideBlocks {
    permitted: Vec<CirculationErrorKind>,
}

impl OverrideBlocks {
    /// 何も回避しない（通常の更新）
    pub fn none() -> Self {
        Self::default()
    }

    /// オーバーライド更新で回避できるすべての種別
    pub fn renewal_override() -> Self {
        Self {
            permitted: vec![
                CirculationErrorKind::DateOutsideSchedules,
                CirculationErrorKind::RenewalLimitReached,
                CirculationErrorKind::OpenRecallRequest,
                CirculationErrorKind::HoldRequestBlocksRenewal,
                CirculationErrorKind::DueDateNotChanged,
                CirculationErrorKind::ItemNotLoanable,
                CirculationErrorKind::LoanNotRenewable,
            ],
        }
    }

    pub fn permits(&self, error: &ValidationError) -> bool {
        error.kind.is_overridable() && self.permitted.contains(&error.kind)
    }

    /// 回避できないエラーだけを残す
    pub fn remaining(&self, errors: &ValidationErrors) -> ValidationErrors {
        errors.without(|e| self.permits(e))
    }
}
