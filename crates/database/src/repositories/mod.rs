pub mod message_ledger;
pub mod user_plan_repository;

pub use message_ledger::PostgresMessageLedger;
pub use user_plan_repository::PostgresUserPlanRepository;
