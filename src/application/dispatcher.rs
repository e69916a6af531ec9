use super::provider::ProviderClient;
use super::templates::TemplateResolver;
use super::tracker::CampaignTracker;
use crate::domain::campaign::{Campaign, CampaignId, Notification};
use crate::domain::party::Target;
use crate::domain::template::{MessageType, Placeholders, Template};
use crate::error::{DispatchError, Result};
use tracing::{error, info};

/// A request to message one target.
///
/// Both `target` and `message_type` are optional so that events read from
/// outside can be rejected by the engine with a proper error.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DispatchRequest {
    pub target: Option<Target>,
    pub message_type: Option<MessageType>,
    pub placeholders: Placeholders,
}

impl DispatchRequest {
    pub fn new(target: Target, message_type: MessageType, placeholders: Placeholders) -> Self {
        Self {
            target: Some(target),
            message_type: Some(message_type),
            placeholders,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub campaign: CampaignId,
    /// True iff the gateway accepted the message.
    pub delivered: bool,
    pub message: String,
}

/// Turns a request into a sent (or failed) SMS with its campaign record.
pub struct DispatchEngine {
    templates: TemplateResolver,
    tracker: CampaignTracker,
    provider: ProviderClient,
}

impl DispatchEngine {
    pub fn new(templates: TemplateResolver, tracker: CampaignTracker, provider: ProviderClient) -> Self {
        Self {
            templates,
            tracker,
            provider,
        }
    }

    pub fn tracker(&self) -> &CampaignTracker {
        &self.tracker
    }

    pub fn provider(&self) -> &ProviderClient {
        &self.provider
    }

    /// Sends one message.
    ///
    /// Input and template errors are returned before any campaign exists.
    /// A gateway rejection is not an error: it is recorded as a `Failed`
    /// campaign and reported through `DispatchOutcome::delivered`.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchOutcome> {
        let DispatchRequest {
            target,
            message_type,
            placeholders,
        } = request;
        let target = target.ok_or_else(|| DispatchError::InvalidInput("target is required".to_string()))?;
        let message_type = message_type
            .ok_or_else(|| DispatchError::InvalidInput("message type is required".to_string()))?;

        info!(
            target = %target.reference(),
            %message_type,
            placeholders = placeholders.len(),
            "preparing SMS"
        );

        let template = self.templates.resolve(message_type, target.locale()).await?;
        let message = template.render(&placeholders);
        let campaign = self
            .tracker
            .open(target.reference(), template.reference())
            .await?;

        match self.deliver(&target, &template, campaign.clone(), message).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(campaign = %campaign.id, target = %target.reference(), error = %e, "dispatch failed after campaign was opened");
                self.tracker.abort(campaign, &e).await;
                Err(e)
            }
        }
    }

    async fn deliver(
        &self,
        target: &Target,
        template: &Template,
        campaign: Campaign,
        message: String,
    ) -> Result<DispatchOutcome> {
        let result = self.provider.send(target.phone(), &message).await;
        let notification = Notification::record(&campaign, target.phone(), &message, &result);
        let (campaign, _) = self.tracker.close(campaign, notification, &result).await?;

        info!(
            campaign = %campaign.id,
            target = %target.reference(),
            template = %template.reference().key(),
            request_id = ?result.request_id,
            status = %campaign.status,
            "SMS {}",
            if result.success { "sent successfully" } else { "failed to send" }
        );

        Ok(DispatchOutcome {
            campaign: campaign.id,
            delivered: result.success,
            message,
        })
    }
}
