use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use super::due_date_strategy::{DueDateContext, DueDateStrategy, PolicyReference};
use super::errors::{
    CirculationErrorKind, CirculationFailure, CirculationResult, ValidationError, ValidationErrors,
};
use super::fixed_due_date_schedules::FixedDueDateSchedules;
use super::loan::Loan;
use super::period::{Period, PeriodError};
use super::renewal;
use super::request_queue::RequestQueue;
use super::{LoanPolicyId, ScheduleId};

const RENEW_FROM_SYSTEM_DATE: &str = "SYSTEM_DATE";
const RENEW_FROM_CURRENT_DUE_DATE: &str = "CURRENT_DUE_DATE";

const MINIMUM_GUARANTEED_LOAN_PERIOD_KEY: &str = "minimumGuaranteedLoanPeriod";
const RECALL_RETURN_INTERVAL_KEY: &str = "recallReturnInterval";

/// 貸出ポリシーの表現を解釈できない
#[derive(Debug, Error)]
#[error("loan policy representation is invalid: {0}")]
pub struct LoanPolicyRepresentationError(#[from] serde_json::Error);

/// 貸出期限のプロファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoansPolicyProfile {
    Rolling,
    Fixed,
    /// 認識できないプロファイル（元の文字列を保持）
    Unknown(String),
}

impl LoansPolicyProfile {
    /// 大文字小文字を区別せずに解釈する
    pub fn parse(profile_id: &str) -> Self {
        if profile_id.eq_ignore_ascii_case("Rolling") {
            LoansPolicyProfile::Rolling
        } else if profile_id.eq_ignore_ascii_case("Fixed") {
            LoansPolicyProfile::Fixed
        } else {
            LoansPolicyProfile::Unknown(profile_id.to_string())
        }
    }
}

/// 更新時の基準日時
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewFrom {
    SystemDate,
    CurrentDueDate,
    Unrecognised,
}

impl RenewFrom {
    pub fn parse(renew_from_id: Option<&str>) -> Self {
        match renew_from_id {
            Some(RENEW_FROM_SYSTEM_DATE) => RenewFrom::SystemDate,
            Some(RENEW_FROM_CURRENT_DUE_DATE) => RenewFrom::CurrentDueDate,
            _ => RenewFrom::Unrecognised,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoansPolicy {
    #[serde(default)]
    profile_id: Option<String>,
    #[serde(default)]
    period: Option<Period>,
    #[serde(default)]
    fixed_due_date_schedule_id: Option<ScheduleId>,
    #[serde(default)]
    closed_library_due_date_management_id: Option<String>,
    #[serde(default)]
    grace_period: Option<Period>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenewalsPolicy {
    #[serde(default)]
    unlimited: bool,
    #[serde(default)]
    number_allowed: u32,
    #[serde(default)]
    renew_from_id: Option<String>,
    #[serde(default)]
    different_period: bool,
    #[serde(default)]
    period: Option<Period>,
    #[serde(default)]
    alternate_fixed_due_date_schedule_id: Option<ScheduleId>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecallsPolicy {
    #[serde(default)]
    minimum_guaranteed_loan_period: Option<Period>,
    #[serde(default)]
    recall_return_interval: Option<Period>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HoldsPolicy {
    #[serde(default)]
    renew_items_with_request: bool,
    #[serde(default)]
    alternate_renewal_loan_period: Option<Period>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestManagement {
    #[serde(default)]
    recalls: RecallsPolicy,
    #[serde(default)]
    holds: HoldsPolicy,
}

/// 貸出ポリシー
///
/// 元の表現（JSON）から生成し、固定返却期限スケジュールは
/// `with_due_date_schedules` / `with_alternate_renewal_schedules` で後から付与する。
/// どちらも新しいポリシーを返し、元のポリシーは変わらない。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanPolicy {
    id: LoanPolicyId,
    #[serde(default)]
    name: String,
    #[serde(default = "enabled")]
    loanable: bool,
    #[serde(default = "enabled")]
    renewable: bool,
    #[serde(default)]
    loans_policy: Option<LoansPolicy>,
    #[serde(default)]
    renewals_policy: RenewalsPolicy,
    #[serde(default)]
    request_management: RequestManagement,
    #[serde(skip)]
    due_date_schedules: FixedDueDateSchedules,
    #[serde(skip)]
    alternate_renewal_schedules: FixedDueDateSchedules,
}

fn enabled() -> bool {
    true
}

impl LoanPolicy {
    /// 元の表現から生成する
    ///
    /// # エラー
    /// 必須項目（id）が無い、または型が合わない場合
    pub fn from_representation(
        representation: &serde_json::Value,
    ) -> Result<Self, LoanPolicyRepresentationError> {
        Ok(LoanPolicy::deserialize(representation)?)
    }

    /// 貸出（および期限上限）用のスケジュールを付与した新しいポリシーを返す
    pub fn with_due_date_schedules(self, schedules: FixedDueDateSchedules) -> Self {
        Self {
            due_date_schedules: schedules,
            ..self
        }
    }

    /// 更新用の代替スケジュールを付与した新しいポリシーを返す
    pub fn with_alternate_renewal_schedules(self, schedules: FixedDueDateSchedules) -> Self {
        Self {
            alternate_renewal_schedules: schedules,
            ..self
        }
    }

    pub fn id(&self) -> LoanPolicyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_loanable(&self) -> bool {
        self.loanable
    }

    pub fn is_renewable(&self) -> bool {
        self.renewable
    }

    pub fn profile(&self) -> LoansPolicyProfile {
        let profile_id = self
            .loans_policy
            .as_ref()
            .and_then(|loans| loans.profile_id.as_deref())
            .unwrap_or_default();
        LoansPolicyProfile::parse(profile_id)
    }

    pub fn is_fixed(&self) -> bool {
        self.profile() == LoansPolicyProfile::Fixed
    }

    pub fn is_rolling(&self) -> bool {
        self.profile() == LoansPolicyProfile::Rolling
    }

    pub fn fixed_due_date_schedule_id(&self) -> Option<ScheduleId> {
        self.loans_policy
            .as_ref()
            .and_then(|loans| loans.fixed_due_date_schedule_id)
    }

    pub fn alternate_fixed_due_date_schedule_id(&self) -> Option<ScheduleId> {
        self.renewals_policy.alternate_fixed_due_date_schedule_id
    }

    /// 休館日の返却期限の扱い（解釈は休館日カレンダー側）
    pub fn closed_library_due_date_management_id(&self) -> Option<&str> {
        self.loans_policy
            .as_ref()
            .and_then(|loans| loans.closed_library_due_date_management_id.as_deref())
    }

    pub fn due_date_schedules(&self) -> &FixedDueDateSchedules {
        &self.due_date_schedules
    }

    pub fn alternate_renewal_schedules(&self) -> &FixedDueDateSchedules {
        &self.alternate_renewal_schedules
    }

    pub fn grace_period(&self) -> Option<&Period> {
        self.loans_policy
            .as_ref()
            .and_then(|loans| loans.grace_period.as_ref())
    }

    pub fn renew_from(&self) -> RenewFrom {
        RenewFrom::parse(self.renewals_policy.renew_from_id.as_deref())
    }

    pub fn has_unlimited_renewals(&self) -> bool {
        self.renewals_policy.unlimited
    }

    pub fn renewal_limit(&self) -> u32 {
        self.renewals_policy.number_allowed
    }

    pub fn has_reached_renewal_limit(&self, loan: &Loan) -> bool {
        !self.has_unlimited_renewals() && loan.renewal_count.value() >= self.renewal_limit()
    }

    /// 取り置き予約があっても更新できるか
    pub fn allows_renewal_with_hold_request(&self) -> bool {
        self.request_management.holds.renew_items_with_request
    }

    pub fn has_alternate_renewal_period_for_holds(&self) -> bool {
        self.request_management
            .holds
            .alternate_renewal_loan_period
            .is_some()
    }

    /// 更新専用の期間が設定されているか
    pub fn has_renewal_period(&self) -> bool {
        self.renewals_policy.different_period && self.renewals_policy.period.is_some()
    }

    pub(crate) fn reference(&self) -> PolicyReference<'_> {
        PolicyReference {
            id: self.id,
            name: &self.name,
        }
    }

    pub(crate) fn error(&self, kind: CirculationErrorKind, reason: impl Into<String>) -> ValidationError {
        self.reference().error(kind, reason)
    }

    fn loan_period(&self) -> Period {
        self.loans_policy
            .as_ref()
            .and_then(|loans| loans.period.clone())
            .unwrap_or_else(|| Period::from_parts(None, None))
    }

    fn renewal_period(&self, with_hold_request: bool) -> Period {
        let holds_period = self
            .request_management
            .holds
            .alternate_renewal_loan_period
            .clone()
            .filter(|_| with_hold_request);

        match holds_period {
            Some(period) => period,
            None if self.renewals_policy.different_period => self
                .renewals_policy
                .period
                .clone()
                .unwrap_or_else(|| Period::from_parts(None, None)),
            None => self.loan_period(),
        }
    }

    /// 更新時のスケジュール（代替スケジュールが付与されていればそちら）
    fn renewal_schedules(&self) -> &FixedDueDateSchedules {
        if self.renewals_policy.different_period && !self.alternate_renewal_schedules.is_none() {
            &self.alternate_renewal_schedules
        } else {
            &self.due_date_schedules
        }
    }

    /// 期間型で返却期限の上限スケジュールを使うか
    ///
    /// スケジュールIDが設定されている、またはスケジュールが付与されていれば使う。
    /// 付与されたスケジュールが空でも上限として扱う（どの区間にも含まれない）。
    fn is_limited_by(&self, schedules: &FixedDueDateSchedules) -> bool {
        !schedules.is_none() || self.fixed_due_date_schedule_id().is_some()
    }

    fn unknown_profile_strategy(&self) -> DueDateStrategy<'_> {
        let profile_id = match self.profile() {
            LoansPolicyProfile::Unknown(profile_id) => profile_id,
            _ => String::new(),
        };
        DueDateStrategy::Unknown { profile_id }
    }

    /// 貸出時の計算戦略
    pub fn check_out_strategy(&self) -> DueDateStrategy<'_> {
        match self.profile() {
            LoansPolicyProfile::Rolling if self.is_limited_by(&self.due_date_schedules) => {
                DueDateStrategy::RollingLimited {
                    period: self.loan_period(),
                    limit_schedules: &self.due_date_schedules,
                }
            }
            LoansPolicyProfile::Rolling => DueDateStrategy::Rolling {
                period: self.loan_period(),
            },
            LoansPolicyProfile::Fixed => DueDateStrategy::Fixed {
                schedules: &self.due_date_schedules,
            },
            LoansPolicyProfile::Unknown(_) => self.unknown_profile_strategy(),
        }
    }

    /// 更新時の計算戦略
    pub fn renewal_strategy(&self, with_hold_request: bool) -> DueDateStrategy<'_> {
        match self.profile() {
            LoansPolicyProfile::Rolling => {
                let period = self.renewal_period(with_hold_request);
                let limit_schedules = self.renewal_schedules();
                if self.is_limited_by(limit_schedules) {
                    DueDateStrategy::RollingLimited {
                        period,
                        limit_schedules,
                    }
                } else {
                    DueDateStrategy::Rolling { period }
                }
            }
            LoansPolicyProfile::Fixed => DueDateStrategy::Fixed {
                schedules: self.renewal_schedules(),
            },
            LoansPolicyProfile::Unknown(_) => self.unknown_profile_strategy(),
        }
    }

    /// 貸出時の返却期限
    pub fn calculate_initial_due_date(&self, loan: &Loan) -> CirculationResult<DateTime<Utc>> {
        self.check_out_strategy().calculate_due_date(
            loan.loan_date,
            DueDateContext::CheckOut,
            self.reference(),
        )
    }

    /// 更新時の返却期限
    ///
    /// 期間型は更新基準日時（システム日時または現在の返却期限）から、
    /// 固定型はシステム日時を含むスケジュール区間から求める。
    pub fn calculate_renewal_due_date(
        &self,
        loan: &Loan,
        system_date: DateTime<Utc>,
        with_hold_request: bool,
    ) -> CirculationResult<DateTime<Utc>> {
        let strategy = self.renewal_strategy(with_hold_request);

        let base = match strategy {
            DueDateStrategy::Rolling { .. } | DueDateStrategy::RollingLimited { .. } => {
                match self.renew_from() {
                    RenewFrom::SystemDate => system_date,
                    RenewFrom::CurrentDueDate => loan.due_date,
                    RenewFrom::Unrecognised => {
                        return Err(self
                            .error(
                                CirculationErrorKind::InvalidPolicyConfiguration,
                                "cannot determine when to renew from",
                            )
                            .into());
                    }
                }
            }
            DueDateStrategy::Fixed { .. } | DueDateStrategy::Unknown { .. } => system_date,
        };

        strategy.calculate_due_date(base, DueDateContext::Renewal, self.reference())
    }

    /// 通常の更新（停止モード）
    pub fn renew(
        &self,
        loan: &Loan,
        system_date: DateTime<Utc>,
        request_queue: &RequestQueue,
    ) -> CirculationResult<Loan> {
        renewal::renew(self, loan, system_date, request_queue)
    }

    /// 職員によるオーバーライド更新
    pub fn override_renewal(
        &self,
        loan: &Loan,
        system_date: DateTime<Utc>,
        request_queue: &RequestQueue,
        override_due_date: Option<DateTime<Utc>>,
        comment: Option<&str>,
    ) -> CirculationResult<Loan> {
        renewal::override_renewal(
            self,
            loan,
            system_date,
            request_queue,
            override_due_date,
            comment,
        )
    }

    /// リコールによる返却期限の短縮
    ///
    /// 新しい返却期限は「貸出日時 + 最低保証期間」と「システム日時 + 返却猶予」の遅い方。
    /// 現在の返却期限より前になる場合のみ変更し、延長はしない。
    pub fn recall(&self, loan: &Loan, system_date: DateTime<Utc>) -> CirculationResult<Loan> {
        let recalls = &self.request_management.recalls;
        let mut errors = ValidationErrors::new();

        let guaranteed = self.recall_bound(
            recalls.minimum_guaranteed_loan_period.as_ref(),
            MINIMUM_GUARANTEED_LOAN_PERIOD_KEY,
            loan.loan_date,
            &mut errors,
        )?;
        let return_by = self.recall_bound(
            recalls.recall_return_interval.as_ref(),
            RECALL_RETURN_INTERVAL_KEY,
            system_date,
            &mut errors,
        )?;

        errors.into_result(())?;

        let recall_due_date = [guaranteed, return_by]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(system_date);

        if recall_due_date < loan.due_date {
            Ok(loan.change_due_date_for_recall(recall_due_date))
        } else {
            Ok(loan.clone())
        }
    }

    /// 期間が未設定なら`None`、不正ならエラーを記録して`None`
    ///
    /// 計算結果が表現できる日時の範囲を超える場合はサーバーエラー。
    fn recall_bound(
        &self,
        period: Option<&Period>,
        key: &str,
        start: DateTime<Utc>,
        errors: &mut ValidationErrors,
    ) -> CirculationResult<Option<DateTime<Utc>>> {
        let Some(period) = period else {
            return Ok(None);
        };
        match period.plus(start) {
            Ok(bound) => Ok(Some(bound)),
            Err(error) => {
                let reason = match &error {
                    PeriodError::OutOfRange { .. } => {
                        return Err(CirculationFailure::ServerError(error.to_string()));
                    }
                    PeriodError::Missing => {
                        format!("the \"{key}\" in the loan policy is not recognized")
                    }
                    PeriodError::UnrecognisedInterval(interval) => {
                        format!("the interval \"{interval}\" in \"{key}\" is not recognized")
                    }
                    PeriodError::InvalidDuration(amount) => {
                        format!("the duration \"{amount}\" in \"{key}\" is invalid")
                    }
                };
                errors.push(self.error(CirculationErrorKind::InvalidPolicyConfiguration, reason));
                Ok(None)
            }
        }
    }
}
