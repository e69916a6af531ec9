use super::credited::CreditedDispatcher;
use super::dispatcher::DispatchRequest;
use crate::domain::ledger::Credits;
use crate::domain::party::{CompanyProfile, Contact, InvoiceSummary, Target};
use crate::domain::template::{MessageType, Placeholders};
use crate::error::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tracing::{info, warn};

fn date(value: NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

fn amount(value: Decimal) -> String {
    format!("{:.2}", value)
}

/// Courtesy messages triggered by member, invoice and company operations.
///
/// Each notice runs on its own task; a failed SMS is logged and dropped so
/// the operation that triggered it is never affected.
#[derive(Clone)]
pub struct Notifier {
    credited: CreditedDispatcher,
}

impl Notifier {
    pub fn new(credited: CreditedDispatcher) -> Self {
        Self { credited }
    }

    pub fn welcome(&self, member: Contact, company: &CompanyProfile) -> JoinHandle<bool> {
        let placeholders = Placeholders::new()
            .with("firstName", member.name.clone())
            .with("companyName", company.name.clone())
            .with("supportPhone", company.phone.clone());
        self.spawn(member, MessageType::MemberWelcome, placeholders)
    }

    pub fn payment_confirmation(
        &self,
        member: Contact,
        invoice: &InvoiceSummary,
        company: &CompanyProfile,
    ) -> JoinHandle<bool> {
        let placeholders = Placeholders::new()
            .with("firstName", member.name.clone())
            .with("companyName", company.name.clone())
            .with("package", invoice.package_name.clone())
            .with("amount", amount(invoice.amount_paid))
            .with("startDate", date(invoice.start_date))
            .with("endDate", date(invoice.end_date))
            .with("supportPhone", company.phone.clone());
        self.spawn(member, MessageType::PaymentConfirmation, placeholders)
    }

    pub fn subscription_reminder(
        &self,
        member: Contact,
        invoice: &InvoiceSummary,
        company: &CompanyProfile,
    ) -> JoinHandle<bool> {
        let placeholders = Placeholders::new()
            .with("firstName", member.name.clone())
            .with("package", invoice.package_name.clone())
            .with("endDate", date(invoice.end_date))
            .with("companyName", company.name.clone())
            .with("supportPhone", company.phone.clone());
        self.spawn(member, MessageType::SubscriptionReminder, placeholders)
    }

    pub fn payment_reminder(&self, member: Contact, invoice: &InvoiceSummary) -> JoinHandle<bool> {
        let placeholders = Placeholders::new()
            .with("firstName", member.name.clone())
            .with("remainingAmount", amount(invoice.remaining_amount))
            .with("package", invoice.package_name.clone());
        self.spawn(member, MessageType::PaymentReminder, placeholders)
    }

    /// Tells the company owner the provider pool is running out.
    ///
    /// The reported figure is one lower than observed, since this warning
    /// spends a credit too. It never goes below zero.
    pub async fn low_balance_warning(&self, owner: &CompanyProfile, balance: Credits) -> Result<()> {
        let placeholders = Placeholders::new()
            .with("ownerName", owner.name.clone())
            .with("balance", amount((balance.value() - Decimal::ONE).max(Decimal::ZERO)));
        let request = DispatchRequest::new(owner.target(), MessageType::LowBalanceWarning, placeholders);
        self.credited.dispatch_billed_to_provider(request).await?;
        info!(company_id = owner.id, %balance, "low balance warning sent");
        Ok(())
    }

    fn spawn(&self, member: Contact, message_type: MessageType, placeholders: Placeholders) -> JoinHandle<bool> {
        let credited = self.credited.clone();
        tokio::spawn(async move {
            let member_id = member.id;
            let request = DispatchRequest::new(Target::Member(member), message_type, placeholders);
            match credited.dispatch_with_provider_credits(request).await {
                Ok(_) => {
                    info!(member_id, %message_type, "notice sent");
                    true
                }
                Err(e) => {
                    warn!(member_id, %message_type, error = %e, "failed to send notice");
                    false
                }
            }
        })
    }
}
