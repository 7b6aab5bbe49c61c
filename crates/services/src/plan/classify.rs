use super::ports::PlanType;

/// Map a payment-platform plan onto a premium plan type.
///
/// Lifetime when the identifier equals the configured lifetime plan, or when either the
/// identifier or the display name mentions "lifetime". Every other plan is recurring `pro`.
pub fn classify_plan_type(
    plan_id: Option<&str>,
    plan_name: Option<&str>,
    lifetime_plan_id: &str,
) -> PlanType {
    let mentions_lifetime = |s: &str| s.to_ascii_lowercase().contains("lifetime");

    let is_lifetime = match plan_id {
        Some(id) if !lifetime_plan_id.is_empty() && id == lifetime_plan_id => true,
        Some(id) if mentions_lifetime(id) => true,
        _ => plan_name.map(mentions_lifetime).unwrap_or(false),
    };

    if is_lifetime {
        PlanType::ProLifetime
    } else {
        PlanType::Pro
    }
}
