use super::delivery::DeliveryResult;
use super::party::TargetRef;
use super::template::TemplateRef;
use crate::error::{DispatchError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CampaignId(pub Uuid);

impl CampaignId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub Uuid);

impl NotificationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Pending,
    Sent,
    Failed,
}

impl CampaignStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CampaignStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Pending => "pending",
            CampaignStatus::Sent => "sent",
            CampaignStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one send as recorded on the notification and used to settle credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn from_success(success: bool) -> Self {
        if success {
            DeliveryStatus::Sent
        } else {
            DeliveryStatus::Failed
        }
    }
}

impl From<DeliveryStatus> for CampaignStatus {
    fn from(status: DeliveryStatus) -> Self {
        match status {
            DeliveryStatus::Sent => CampaignStatus::Sent,
            DeliveryStatus::Failed => CampaignStatus::Failed,
        }
    }
}

/// Bookkeeping for a single send attempt.
///
/// Starts `Pending` and moves exactly once to `Sent` or `Failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: Option<String>,
    pub target: TargetRef,
    pub template: TemplateRef,
    pub scheduled_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub executed: bool,
    pub status: CampaignStatus,
    pub description: Option<String>,
    pub error_message: Option<String>,
}

impl Campaign {
    pub fn open(target: TargetRef, template: TemplateRef) -> Self {
        Self {
            id: CampaignId::generate(),
            name: None,
            target,
            template,
            scheduled_at: Utc::now(),
            executed_at: None,
            executed: false,
            status: CampaignStatus::Pending,
            description: None,
            error_message: None,
        }
    }

    fn ensure_pending(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(DispatchError::InvalidTransition(format!(
                "campaign {} is already {}",
                self.id, self.status
            )));
        }
        Ok(())
    }

    /// Records the gateway's verdict.
    pub fn complete(&mut self, result: &DeliveryResult) -> Result<()> {
        self.ensure_pending()?;
        self.executed = true;
        self.executed_at = Some(Utc::now());
        self.status = DeliveryStatus::from_success(result.success).into();

        if result.success {
            self.description = Some(match result.request_id {
                Some(id) => format!("SMS sent successfully. Request ID: {}", id),
                None => "SMS sent successfully.".to_string(),
            });
        } else {
            self.error_message = Some(result.failure_reason());
            self.description = Some(if result.details.is_null() {
                "Failed to send SMS. Details: No details".to_string()
            } else {
                format!("Failed to send SMS. Details: {}", result.details)
            });
        }

        if let Some(id) = result.request_id {
            self.name = Some(format!("SMS-{}", id));
        }
        Ok(())
    }

    /// Marks an attempt that broke down before the gateway's verdict was recorded.
    pub fn fail(&mut self, reason: &str) -> Result<()> {
        self.ensure_pending()?;
        self.executed_at = Some(Utc::now());
        self.status = CampaignStatus::Failed;
        self.error_message = Some(reason.to_string());
        self.description = Some(format!("Failed before sending: {}", reason));
        Ok(())
    }
}

/// The message actually handed to the gateway. Written once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub campaign: CampaignId,
    pub target: TargetRef,
    pub template: TemplateRef,
    pub phone_number: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
}

impl Notification {
    pub fn record(
        campaign: &Campaign,
        phone_number: &str,
        message: &str,
        result: &DeliveryResult,
    ) -> Self {
        Self {
            id: NotificationId::generate(),
            campaign: campaign.id,
            target: campaign.target,
            template: campaign.template,
            phone_number: phone_number.to_string(),
            message: message.to_string(),
            sent_at: Utc::now(),
            status: DeliveryStatus::from_success(result.success),
            error_message: (!result.success).then(|| result.provider_message().to_string()),
        }
    }
}
