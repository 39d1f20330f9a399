use chrono::{DateTime, Utc};
use tracing::debug;

use super::errors::{
    CirculationErrorKind, CirculationFailure, CirculationResult, OverrideBlocks, ValidationError,
    ValidationErrors,
};
use super::loan::Loan;
use super::loan_policy::LoanPolicy;
use super::request_queue::{RequestQueue, RequestType};

const HOLD_REQUEST_BLOCKS_RENEWAL: &str =
    "Items with this loan policy cannot be renewed when there is an active, pending hold request";
const FIXED_POLICY_HAS_ALTERNATE_RENEWAL_PERIOD_FOR_HOLDS: &str =
    "Item's loan policy has fixed profile but alternative renewal period for holds is specified";
const FIXED_POLICY_HAS_ALTERNATE_RENEWAL_PERIOD: &str =
    "Item's loan policy has fixed profile but renewal period is specified";

const OVERRIDE_COMMENT_REQUIRED: &str = "Override renewal request must have a comment";
const OVERRIDE_DUE_DATE_REQUIRED_WHEN_CALCULATION_FAILS: &str =
    "New due date must be specified when due date calculation fails";
const OVERRIDE_DUE_DATE_REQUIRED_WHEN_UNCHANGED: &str =
    "New due date is required when renewal would not change the due date";
const OVERRIDE_DOES_NOT_MATCH: &str = "Override renewal does not match any of expected cases: \
    item is not renewable, reached number of renewals limit or \
    renewal date falls outside of the date ranges in the loan policy";

/// 更新可否の評価結果
///
/// すべてのチェックを実行した後のエラー一覧と、計算できた場合の新しい返却期限。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewalAssessment {
    pub errors: ValidationErrors,
    pub proposed_due_date: Option<DateTime<Utc>>,
}

/// 貸出処理
///
/// 貸出不可ポリシーなら失敗、そうでなければ貸出時の返却期限を設定したLoanを返す。
pub fn check_out(policy: &LoanPolicy, loan: &Loan) -> CirculationResult<Loan> {
    if !policy.is_loanable() {
        return Err(policy
            .error(CirculationErrorKind::ItemNotLoanable, "item is not loanable")
            .into());
    }

    let due_date = policy.calculate_initial_due_date(loan)?;
    debug!(loan_id = ?loan.id, %due_date, "calculated initial due date");
    Ok(loan.check_out(due_date, policy.id()))
}

/// 更新の可否を評価する
///
/// 途中で止めずにすべてのチェックを実行し、次の順でエラーを蓄積する：
/// 1. 更新回数の上限
/// 2. 有効なリコール予約
/// 3. 貸出不可・更新不可ポリシー
/// 4. 先頭の取り置き予約に関する制約
/// 5. 返却期限の計算（3で失敗した場合は計算しない）
/// 6. 返却期限が延びるか
///
/// 日時の計算が表現できる範囲を超えた場合は蓄積せず、サーバーエラーで即座に失敗する。
pub fn assess_renewal(
    policy: &LoanPolicy,
    loan: &Loan,
    system_date: DateTime<Utc>,
    request_queue: &RequestQueue,
) -> CirculationResult<RenewalAssessment> {
    let mut errors = ValidationErrors::new();

    if policy.has_reached_renewal_limit(loan) {
        errors.push(policy.error(
            CirculationErrorKind::RenewalLimitReached,
            "loan has reached its maximum number of renewals",
        ));
    }

    if let Some(recall) = request_queue.open_recall_request() {
        errors.push(
            ValidationError::new(
                CirculationErrorKind::OpenRecallRequest,
                "items cannot be renewed when there is an active recall request",
            )
            .with_parameter("requestId", recall.id.value().to_string()),
        );
    }

    if !policy.is_loanable() {
        errors.push(policy.error(CirculationErrorKind::ItemNotLoanable, "item is not loanable"));
    }

    if !policy.is_renewable() {
        errors.push(policy.error(CirculationErrorKind::LoanNotRenewable, "loan is not renewable"));
    }

    let with_hold_request = request_queue
        .highest_priority()
        .is_some_and(|request| request.request_type == RequestType::Hold);

    if with_hold_request {
        errors.extend(hold_request_errors(policy));
    }

    if !policy.is_loanable() || !policy.is_renewable() {
        return Ok(RenewalAssessment {
            errors,
            proposed_due_date: None,
        });
    }

    let proposed_due_date =
        match policy.calculate_renewal_due_date(loan, system_date, with_hold_request) {
            Ok(due_date) => {
                if due_date <= loan.due_date {
                    errors.push(policy.error(
                        CirculationErrorKind::DueDateNotChanged,
                        "renewal would not change the due date",
                    ));
                }
                Some(due_date)
            }
            Err(CirculationFailure::Validation(rejections)) => {
                errors.extend(rejections);
                None
            }
            Err(failure) => return Err(failure),
        };

    Ok(RenewalAssessment {
        errors,
        proposed_due_date,
    })
}

fn hold_request_errors(policy: &LoanPolicy) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !policy.allows_renewal_with_hold_request() {
        errors.push(policy.error(
            CirculationErrorKind::HoldRequestBlocksRenewal,
            HOLD_REQUEST_BLOCKS_RENEWAL,
        ));
    }

    if policy.is_fixed() {
        if policy.has_alternate_renewal_period_for_holds() {
            errors.push(policy.error(
                CirculationErrorKind::InvalidPolicyConfiguration,
                FIXED_POLICY_HAS_ALTERNATE_RENEWAL_PERIOD_FOR_HOLDS,
            ));
        }
        if policy.has_renewal_period() {
            errors.push(policy.error(
                CirculationErrorKind::InvalidPolicyConfiguration,
                FIXED_POLICY_HAS_ALTERNATE_RENEWAL_PERIOD,
            ));
        }
    }

    errors
}

/// 通常の更新（停止モード）
///
/// エラーが1件でもあれば、蓄積したすべてのエラーで失敗する。
pub fn renew(
    policy: &LoanPolicy,
    loan: &Loan,
    system_date: DateTime<Utc>,
    request_queue: &RequestQueue,
) -> CirculationResult<Loan> {
    let RenewalAssessment {
        errors,
        proposed_due_date,
    } = assess_renewal(policy, loan, system_date, request_queue)?;

    if !errors.is_empty() {
        debug!(loan_id = ?loan.id, errors = errors.len(), "renewal refused");
    }

    let due_date = OverrideBlocks::none()
        .remaining(&errors)
        .into_result(proposed_due_date)?
        .ok_or_else(|| CirculationFailure::ServerError("renewal produced no due date".to_string()))?;

    debug!(loan_id = ?loan.id, %due_date, "renewal permitted");
    Ok(loan.renew(due_date, policy.id()))
}

/// 職員によるオーバーライド更新（回避モード）
///
/// 回避できない設定不備が残っていれば失敗する。回避した上で：
/// - 貸出不可・更新不可、または返却期限を計算できない場合は指定の返却期限を使う
/// - 上限到達・リコール・取り置き・期限が延びない場合は、計算した期限が延びればそれを、
///   延びなければ指定の返却期限を使う
/// - 何も回避する必要がなければオーバーライドの対象外として失敗する
pub fn override_renewal(
    policy: &LoanPolicy,
    loan: &Loan,
    system_date: DateTime<Utc>,
    request_queue: &RequestQueue,
    override_due_date: Option<DateTime<Utc>>,
    comment: Option<&str>,
) -> CirculationResult<Loan> {
    let comment = comment
        .map(str::trim)
        .filter(|comment| !comment.is_empty())
        .ok_or_else(|| {
            ValidationError::new(
                CirculationErrorKind::InvalidOverrideRequest,
                OVERRIDE_COMMENT_REQUIRED,
            )
            .with_parameter("comment", "")
        })?;

    let assessment = assess_renewal(policy, loan, system_date, request_queue)?;
    let blocks = OverrideBlocks::renewal_override();

    let remaining = blocks.remaining(&assessment.errors);
    if !remaining.is_empty() {
        debug!(loan_id = ?loan.id, errors = remaining.len(), "override cannot bypass errors");
        return Err(remaining.into());
    }

    let errors = &assessment.errors;
    let needs_due_date_from_staff = errors.has_kind(CirculationErrorKind::ItemNotLoanable)
        || errors.has_kind(CirculationErrorKind::LoanNotRenewable)
        || assessment.proposed_due_date.is_none();

    let due_date = if needs_due_date_from_staff {
        override_due_date.ok_or_else(|| {
            ValidationError::new(
                CirculationErrorKind::InvalidOverrideRequest,
                OVERRIDE_DUE_DATE_REQUIRED_WHEN_CALCULATION_FAILS,
            )
            .with_parameter("dueDate", "")
        })?
    } else if errors.is_empty() {
        return Err(
            ValidationError::new(CirculationErrorKind::InvalidOverrideRequest, OVERRIDE_DOES_NOT_MATCH)
                .into(),
        );
    } else {
        match assessment.proposed_due_date {
            Some(proposed) if proposed > loan.due_date => proposed,
            _ => override_due_date.ok_or_else(|| {
                ValidationError::new(
                    CirculationErrorKind::InvalidOverrideRequest,
                    OVERRIDE_DUE_DATE_REQUIRED_WHEN_UNCHANGED,
                )
                .with_parameter("dueDate", "")
            })?,
        }
    };

    debug!(loan_id = ?loan.id, %due_date, "renewal overridden");
    Ok(loan.override_renewal(due_date, policy.id(), comment))
}
