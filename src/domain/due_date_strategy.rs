use chrono::{DateTime, Utc};

use super::errors::{CirculationErrorKind, CirculationFailure, CirculationResult, ValidationError};
use super::fixed_due_date_schedules::FixedDueDateSchedules;
use super::period::{Period, PeriodError};
use super::LoanPolicyId;

/// 返却期限を計算する場面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueDateContext {
    CheckOut,
    Renewal,
}

impl DueDateContext {
    fn outside_schedules_reason(&self) -> &'static str {
        match self {
            DueDateContext::CheckOut => "loan date falls outside of the date ranges in the loan policy",
            DueDateContext::Renewal => "renewal date falls outside of date ranges in the loan policy",
        }
    }
}

/// エラーに付与する貸出ポリシーの識別情報
#[derive(Debug, Clone, Copy)]
pub struct PolicyReference<'p> {
    pub id: LoanPolicyId,
    pub name: &'p str,
}

impl PolicyReference<'_> {
    pub fn error(&self, kind: CirculationErrorKind, reason: impl Into<String>) -> ValidationError {
        ValidationError::for_policy(kind, reason, self.id, self.name)
    }
}

/// 返却期限の計算戦略
///
/// ポリシーのプロファイルと貸出/更新の別から`LoanPolicy`が選択する。
/// スケジュールはポリシーから借用する。
#[derive(Debug, Clone, PartialEq)]
pub enum DueDateStrategy<'p> {
    /// 基準日時 + 期間
    Rolling { period: Period },
    /// 基準日時 + 期間。ただし基準日時を含むスケジュール区間の返却期限で打ち切る
    RollingLimited {
        period: Period,
        limit_schedules: &'p FixedDueDateSchedules,
    },
    /// 基準日時を含むスケジュール区間の返却期限
    Fixed { schedules: &'p FixedDueDateSchedules },
    /// 認識できないプロファイル。常に失敗する
    Unknown { profile_id: String },
}

impl DueDateStrategy<'_> {
    /// 返却期限を計算する
    ///
    /// # 引数
    /// * `base` - 基準日時（貸出時は貸出日時、更新時は更新基準日時、固定更新時はシステム日時）
    /// * `context` - 貸出か更新か（範囲外エラーの文言が異なる）
    /// * `policy` - エラーに付与するポリシー情報
    ///
    /// # エラー
    /// - Validation: ポリシー設定の不備、またはスケジュールの範囲外（ポリシー情報付き）
    /// - ServerError: 計算結果が表現できる日時の範囲を超える
    pub fn calculate_due_date(
        &self,
        base: DateTime<Utc>,
        context: DueDateContext,
        policy: PolicyReference<'_>,
    ) -> CirculationResult<DateTime<Utc>> {
        match self {
            DueDateStrategy::Rolling { period } => roll(period, base, policy),
            DueDateStrategy::RollingLimited {
                period,
                limit_schedules,
            } => {
                let limit = limit_schedules.find_due_date_for(base).ok_or_else(|| {
                    outside_schedules(context, policy)
                })?;
                let rolled = roll(period, base, policy)?;
                Ok(rolled.min(limit))
            }
            DueDateStrategy::Fixed { schedules } => schedules
                .find_due_date_for(base)
                .ok_or_else(|| outside_schedules(context, policy).into()),
            DueDateStrategy::Unknown { profile_id } => Err(policy
                .error(
                    CirculationErrorKind::InvalidPolicyConfiguration,
                    format!("profile \"{profile_id}\" in the loan policy is not recognised"),
                )
                .into()),
        }
    }
}

fn roll(
    period: &Period,
    base: DateTime<Utc>,
    policy: PolicyReference<'_>,
) -> CirculationResult<DateTime<Utc>> {
    period.plus(base).map_err(|error| {
        let reason = match &error {
            PeriodError::OutOfRange { .. } => {
                return CirculationFailure::ServerError(error.to_string());
            }
            PeriodError::Missing => "the loan period in the loan policy is not recognised".to_string(),
            PeriodError::UnrecognisedInterval(interval) => {
                format!("the interval \"{interval}\" in the loan policy is not recognised")
            }
            PeriodError::InvalidDuration(amount) => {
                format!("the duration \"{amount}\" in the loan policy is invalid")
            }
        };
        CirculationFailure::from(
            policy.error(CirculationErrorKind::InvalidPolicyConfiguration, reason),
        )
    })
}

fn outside_schedules(context: DueDateContext, policy: PolicyReference<'_>) -> ValidationError {
    policy.error(
        CirculationErrorKind::DateOutsideSchedules,
        context.outside_schedules_reason(),
    )
}
