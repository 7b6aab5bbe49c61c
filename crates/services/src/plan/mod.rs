pub mod classify;
pub mod ports;

pub use classify::classify_plan_type;
pub use ports::{
    PlanStoreError, PlanType, SubscriptionStatus, UserPlanRepository, UserPlanRow, UserPlanWrite,
};
