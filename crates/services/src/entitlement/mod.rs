pub mod local_counter;
pub mod ports;
pub mod service;

pub use local_counter::LocalQuotaCounter;
pub use ports::{
    utc_day_bounds, EntitlementService, PlanTier, QuotaCounter, QuotaDecision, ResolvedPlan,
    UserInspection, DAILY_LIMIT_REACHED_REASON, FREE_DAILY_MESSAGE_LIMIT,
};
pub use service::EntitlementServiceImpl;
