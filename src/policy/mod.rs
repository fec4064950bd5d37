use chrono::{DateTime, Utc};
use tracing::debug;

use crate::guard::GuardVerdict;
use crate::hours::is_open;
use crate::model::{Customer, CustomerStatus};
use crate::settings::BotSettings;

/// Which template the policy engine selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    NewCustomer,
    ReturningCustomer,
    AfterHours,
}

#[derive(Debug, Clone)]
pub struct ReplyDecision {
    pub kind: ReplyKind,
    pub text: String,
}

/// Decide whether an auto-reply is due and which template to use.
///
/// Short-circuits to `None` when the bot is inactive, the guard suppressed
/// the reply, credentials are unset, or the customer is blocked/archived.
/// Otherwise selects exactly one template: after-hours first (availability,
/// not identity, governs tone), then new-customer, then returning-customer.
/// The fallback template only stands in for an empty selected template.
pub fn decide(
    customer: &Customer,
    verdict: &GuardVerdict,
    settings: &BotSettings,
    now: DateTime<Utc>,
) -> Option<ReplyDecision> {
    if !settings.active {
        debug!("policy: bot inactive, no reply");
        return None;
    }
    if verdict.suppresses_reply() {
        debug!("policy: guard suppressed reply for {}", customer.phone_number);
        return None;
    }
    if !settings.credentials.is_set() {
        debug!("policy: outbound credentials unset, no reply");
        return None;
    }
    if customer.status != CustomerStatus::Active {
        debug!(
            "policy: customer {} is {:?}, no reply",
            customer.phone_number, customer.status
        );
        return None;
    }

    let hours = &settings.business_hours;
    let kind = if hours.enabled && !is_open(now, &hours.timezone, hours) {
        ReplyKind::AfterHours
    } else if customer.is_new {
        ReplyKind::NewCustomer
    } else {
        ReplyKind::ReturningCustomer
    };

    let template = match kind {
        ReplyKind::NewCustomer => &settings.templates.new_customer,
        ReplyKind::ReturningCustomer => &settings.templates.returning_customer,
        ReplyKind::AfterHours => &settings.templates.after_hours,
    };

    // Empty template is an error path: fall back rather than send nothing
    let text = if template.trim().is_empty() {
        settings.templates.fallback.clone()
    } else {
        template.clone()
    };
    if text.trim().is_empty() {
        debug!("policy: selected and fallback templates both empty, no reply");
        return None;
    }

    Some(ReplyDecision { kind, text })
}
