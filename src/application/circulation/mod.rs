mod circulation_service;
mod errors;

pub use circulation_service::{
    ServiceDependencies, check_out_item, lookup_policy, override_renew_loan, recall_loan,
    renew_loan,
};
pub use errors::{CirculationApplicationError, Result};
