use crate::domain::ports::TemplateStore;
use crate::domain::template::{Locale, MessageType, Template};
use crate::error::Result;
use tracing::info;

/// Stock English and Swahili bodies for every message type.
pub fn default_templates() -> Vec<Template> {
    use Locale::{En, Sw};
    use MessageType::*;

    vec![
        Template::new(
            PaymentConfirmation,
            En,
            "Dear {firstName}, thank you for your payment of {amount} for {package}. Your subscription is active from {startDate} to {endDate}. For support, call {supportPhone}.",
        ),
        Template::new(
            SubscriptionReminder,
            En,
            "Hi {firstName}, your {package} subscription ends on {endDate}. Renew now to stay active!",
        ),
        Template::new(
            PaymentReminder,
            En,
            "Dear {firstName}, you have a pending balance of {remainingAmount} TZS for {package}. Please complete payment.",
        ),
        Template::new(
            MemberWelcome,
            En,
            "Dear {firstName}, welcome to {companyName}! We are excited to have you. Your fitness journey starts now. For any questions, contact us at {supportPhone}.",
        ),
        Template::new(
            LowBalanceWarning,
            En,
            "Dear {ownerName}, your SMS balance is low: {balance} credits remaining. Please top up to avoid service interruption.",
        ),
        Template::new(
            PaymentConfirmation,
            Sw,
            "Mpendwa {firstName}, asante kwa malipo yako ya {amount} kwa {package}. Usajili wako utakuwa aktif kutoka {startDate} mpaka {endDate}. Kwa msaada, piga {supportPhone}.",
        ),
        Template::new(
            SubscriptionReminder,
            Sw,
            "Habari {firstName}, usajili wako wa {package} utamalizika {endDate}. Sajili upya sasa ili kuendelea!",
        ),
        Template::new(
            PaymentReminder,
            Sw,
            "Mpendwa {firstName}, una deni la {remainingAmount} TZS kwa {package}. Tafadhali maliza malipo.",
        ),
        Template::new(
            MemberWelcome,
            Sw,
            "Karibu {firstName} katika {companyName}! Tunafurahi kukuwa nasi. Safari yako ya mazoezi imeanza sasa. Kwa maswali yoyote, wasiliana nasi kupitia {supportPhone}.",
        ),
        Template::new(
            LowBalanceWarning,
            Sw,
            "Mpendwa {ownerName}, salio lako la SMS ni chini: {balance} tu zimesalia. Tafadhali ongeza salio ili kuepuka usumbufu wa huduma.",
        ),
    ]
}

/// Inserts each default template whose `(type, locale)` slot is empty.
/// Existing rows are never overwritten. Returns how many were added.
pub async fn seed_templates(store: &dyn TemplateStore) -> Result<usize> {
    let mut added = 0;
    for template in default_templates() {
        if store.find(template.message_type, template.locale).await?.is_none() {
            store.store(template).await?;
            added += 1;
        }
    }
    if added > 0 {
        info!(added, "seeded SMS templates");
    }
    Ok(added)
}
