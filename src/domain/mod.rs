pub mod commands;
pub mod due_date_strategy;
pub mod errors;
pub mod fixed_due_date_schedules;
pub mod loan;
pub mod loan_policy;
pub mod notice_grouping;
pub mod period;
pub mod renewal;
pub mod request_queue;
pub mod value_objects;

pub use due_date_strategy::{DueDateContext, DueDateStrategy};
pub use errors::*;
pub use fixed_due_date_schedules::{FixedDueDateSchedule, FixedDueDateSchedules, ScheduleError};
pub use loan::{Loan, LoanAction, LoanStatus};
pub use loan_policy::{LoanPolicy, LoanPolicyRepresentationError, LoansPolicyProfile, RenewFrom};
pub use period::{Interval, Period, PeriodError};
pub use request_queue::{Request, RequestQueue, RequestStatus, RequestType};
pub use value_objects::*;
