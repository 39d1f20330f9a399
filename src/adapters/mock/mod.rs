pub mod fixed_due_date_schedule_repository;
pub mod loan_policy_repository;
pub mod request_queue_repository;

pub use fixed_due_date_schedule_repository::FixedDueDateScheduleRepository;
pub use loan_policy_repository::LoanPolicyRepository;
pub use request_queue_repository::RequestQueueRepository;
