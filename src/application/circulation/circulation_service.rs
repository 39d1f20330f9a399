use crate::domain::{
    self, FixedDueDateSchedules, Loan, LoanPolicy, commands::*, value_objects::*,
};
use crate::ports::*;
use std::sync::Arc;
use tracing::{info, warn};

use super::errors::{CirculationApplicationError, Result};

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、純粋な関数に依存関係を渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub loan_policy_repository: Arc<dyn LoanPolicyRepository>,
    pub schedule_repository: Arc<dyn FixedDueDateScheduleRepository>,
    pub request_queue_repository: Arc<dyn RequestQueueRepository>,
}

/// スケジュールを取得するヘルパー関数
///
/// IDが未設定、またはスケジュールが見つからない場合は`none()`を返す。
async fn load_schedules(
    repository: &Arc<dyn FixedDueDateScheduleRepository>,
    schedule_id: Option<ScheduleId>,
) -> Result<FixedDueDateSchedules> {
    let Some(schedule_id) = schedule_id else {
        return Ok(FixedDueDateSchedules::none());
    };

    let schedules = repository
        .find_by_id(schedule_id)
        .await
        .map_err(CirculationApplicationError::ScheduleRepositoryError)?;

    Ok(schedules.unwrap_or_else(|| {
        warn!(?schedule_id, "fixed due date schedule not found");
        FixedDueDateSchedules::none()
    }))
}

/// 貸出ポリシーを取得し、スケジュールを付与する
///
/// 貸出用スケジュールと更新用の代替スケジュールは並行して取得する。
///
/// # 引数
/// * `deps` - サービスの依存関係
/// * `policy_id` - 貸出ポリシーID
///
/// # 戻り値
/// スケジュール付きの貸出ポリシー
///
/// # エラー
/// - PolicyNotFound: ポリシーが存在しない
/// - InvalidPolicyRepresentation: 表現を解釈できない
/// - LoanPolicyRepositoryError / ScheduleRepositoryError: 取得失敗
pub async fn lookup_policy(deps: &ServiceDependencies, policy_id: LoanPolicyId) -> Result<LoanPolicy> {
    let representation = deps
        .loan_policy_repository
        .get_by_id(policy_id)
        .await
        .map_err(CirculationApplicationError::LoanPolicyRepositoryError)?
        .ok_or(CirculationApplicationError::PolicyNotFound(policy_id))?;

    let policy = LoanPolicy::from_representation(&representation)
        .map_err(CirculationApplicationError::InvalidPolicyRepresentation)?;

    let (due_date_schedules, alternate_renewal_schedules) = futures::try_join!(
        load_schedules(&deps.schedule_repository, policy.fixed_due_date_schedule_id()),
        load_schedules(
            &deps.schedule_repository,
            policy.alternate_fixed_due_date_schedule_id()
        ),
    )?;

    Ok(policy
        .with_due_date_schedules(due_date_schedules)
        .with_alternate_renewal_schedules(alternate_renewal_schedules))
}

/// 資料を貸し出す
///
/// ポリシーに従って貸出時の返却期限を計算した新しい貸出を返す。
pub async fn check_out_item(deps: &ServiceDependencies, cmd: CheckOutItem) -> Result<Loan> {
    info!(item_id = ?cmd.item_id, user_id = ?cmd.user_id, "checking out item");

    let policy = lookup_policy(deps, cmd.loan_policy_id).await?;
    let loan = Loan::new(cmd.item_id, cmd.user_id, cmd.loan_date);

    Ok(domain::renewal::check_out(&policy, &loan)?)
}

async fn load_policy_and_queue(
    deps: &ServiceDependencies,
    policy_id: LoanPolicyId,
    item_id: ItemId,
) -> Result<(LoanPolicy, domain::RequestQueue)> {
    let queue = async {
        deps.request_queue_repository
            .get_queue_for_item(item_id)
            .await
            .map_err(CirculationApplicationError::RequestQueueRepositoryError)
    };

    futures::try_join!(lookup_policy(deps, policy_id), queue)
}

/// 貸出を更新する（停止モード）
///
/// # エラー
/// 更新できない場合は、蓄積したすべての検証エラーを持つ`Circulation`エラー
pub async fn renew_loan(deps: &ServiceDependencies, cmd: RenewLoan) -> Result<Loan> {
    info!(loan_id = ?cmd.loan.id, "renewing loan");

    let (policy, queue) = load_policy_and_queue(deps, cmd.loan_policy_id, cmd.loan.item_id).await?;

    Ok(policy.renew(&cmd.loan, cmd.system_date, &queue)?)
}

/// 職員のオーバーライドで貸出を更新する
pub async fn override_renew_loan(deps: &ServiceDependencies, cmd: OverrideRenewLoan) -> Result<Loan> {
    info!(loan_id = ?cmd.loan.id, "overriding renewal");

    let (policy, queue) = load_policy_and_queue(deps, cmd.loan_policy_id, cmd.loan.item_id).await?;

    Ok(policy.override_renewal(
        &cmd.loan,
        cmd.system_date,
        &queue,
        cmd.due_date,
        cmd.comment.as_deref(),
    )?)
}

/// リコールにより返却期限を短縮する
pub async fn recall_loan(deps: &ServiceDependencies, cmd: RecallLoan) -> Result<Loan> {
    info!(loan_id = ?cmd.loan.id, "applying recall");

    let policy = lookup_policy(deps, cmd.loan_policy_id).await?;

    Ok(policy.recall(&cmd.loan, cmd.system_date)?)
}
