use chrono::{DateTime, Utc};
use circulation_engine::{
    adapters::mock::{
        FixedDueDateScheduleRepository as MockScheduleRepository,
        LoanPolicyRepository as MockLoanPolicyRepository,
        RequestQueueRepository as MockRequestQueueRepository,
    },
    application::circulation::{
        CirculationApplicationError, ServiceDependencies, check_out_item, override_renew_loan,
        recall_loan, renew_loan,
    },
    config::{EngineConfig, Operation},
    domain::{
        CirculationFailure, FixedDueDateSchedules, Loan, LoanPolicyId, Request,
        commands::{CheckOutItem, OverrideRenewLoan, RecallLoan, RenewLoan},
    },
};
use serde::Deserialize;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 1回の処理に必要なデータ一式
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    loan_policy: serde_json::Value,
    #[serde(default)]
    fixed_due_date_schedules: Vec<FixedDueDateSchedules>,
    loan: Loan,
    #[serde(default)]
    requests: Vec<Request>,
    #[serde(default)]
    override_due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    comment: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "circulation_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = EngineConfig::from_env()?;
    tracing::info!(input = %config.input_path.display(), operation = ?config.operation, "starting");

    let document = tokio::fs::read_to_string(&config.input_path).await?;
    let snapshot: Snapshot = serde_json::from_str(&document)?;
    let policy_id: LoanPolicyId = serde_json::from_value(
        snapshot
            .loan_policy
            .get("id")
            .cloned()
            .unwrap_or_default(),
    )?;

    // Initialize adapters
    let loan_policy_repository = Arc::new(MockLoanPolicyRepository::new());
    loan_policy_repository.add_policy(policy_id, snapshot.loan_policy);

    let schedule_repository = Arc::new(MockScheduleRepository::new());
    for schedules in snapshot.fixed_due_date_schedules {
        schedule_repository.add_schedules(schedules);
    }

    let request_queue_repository = Arc::new(MockRequestQueueRepository::new());
    for request in snapshot.requests {
        request_queue_repository.add_request(request);
    }

    let deps = ServiceDependencies {
        loan_policy_repository,
        schedule_repository,
        request_queue_repository,
    };

    let system_date = config.system_date_or_now();
    let loan = snapshot.loan;

    let result = match config.operation {
        Operation::CheckOut => {
            check_out_item(
                &deps,
                CheckOutItem {
                    item_id: loan.item_id,
                    user_id: loan.user_id,
                    loan_policy_id: policy_id,
                    loan_date: loan.loan_date,
                },
            )
            .await
        }
        Operation::Renew => {
            renew_loan(
                &deps,
                RenewLoan {
                    loan,
                    loan_policy_id: policy_id,
                    system_date,
                },
            )
            .await
        }
        Operation::OverrideRenew => {
            override_renew_loan(
                &deps,
                OverrideRenewLoan {
                    loan,
                    loan_policy_id: policy_id,
                    system_date,
                    due_date: snapshot.override_due_date,
                    comment: snapshot.comment,
                },
            )
            .await
        }
        Operation::Recall => {
            recall_loan(
                &deps,
                RecallLoan {
                    loan,
                    loan_policy_id: policy_id,
                    system_date,
                },
            )
            .await
        }
    };

    match result {
        Ok(loan) => {
            println!("{}", serde_json::to_string_pretty(&loan)?);
            Ok(())
        }
        Err(CirculationApplicationError::Circulation(CirculationFailure::Validation(errors))) => {
            tracing::warn!(%errors, "operation refused");
            let errors = serde_json::json!({ "errors": errors });
            println!("{}", serde_json::to_string_pretty(&errors)?);
            std::process::exit(1);
        }
        Err(error) => {
            tracing::error!(%error, "operation failed");
            Err(error.into())
        }
    }
}
