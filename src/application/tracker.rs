use crate::domain::campaign::{Campaign, CampaignId, Notification};
use crate::domain::delivery::DeliveryResult;
use crate::domain::party::TargetRef;
use crate::domain::ports::{CampaignStoreBox, NotificationStoreBox};
use crate::domain::template::TemplateRef;
use crate::error::{DispatchError, Result};
use tracing::{debug, error};

/// Persists one campaign and one notification per send attempt.
pub struct CampaignTracker {
    campaigns: CampaignStoreBox,
    notifications: NotificationStoreBox,
}

impl CampaignTracker {
    pub fn new(campaigns: CampaignStoreBox, notifications: NotificationStoreBox) -> Self {
        Self {
            campaigns,
            notifications,
        }
    }

    /// Stores a `Pending` campaign before anything goes over the network.
    pub async fn open(&self, target: TargetRef, template: TemplateRef) -> Result<Campaign> {
        let campaign = Campaign::open(target, template);
        self.campaigns.store(campaign.clone()).await?;
        debug!(campaign = %campaign.id, %target, template = %template.key(), "campaign opened");
        Ok(campaign)
    }

    /// Moves the campaign to its terminal state and persists the pair.
    ///
    /// The notification is written first, so a campaign never reads as
    /// settled while its notification is missing.
    pub async fn close(
        &self,
        mut campaign: Campaign,
        notification: Notification,
        result: &DeliveryResult,
    ) -> Result<(Campaign, Notification)> {
        campaign.complete(result)?;
        self.notifications.store(notification.clone()).await?;
        self.campaigns.store(campaign.clone()).await?;
        Ok((campaign, notification))
    }

    /// Marks a campaign failed after an error that interrupted its attempt.
    pub async fn abort(&self, mut campaign: Campaign, cause: &DispatchError) {
        let id = campaign.id;
        if let Err(e) = campaign.fail(&format!("Unexpected error: {}", cause)) {
            error!(campaign = %id, error = %e, "cannot mark campaign failed");
            return;
        }
        if let Err(e) = self.campaigns.store(campaign).await {
            error!(campaign = %id, error = %e, "failed to persist failed campaign");
        }
    }

    pub async fn campaign(&self, id: CampaignId) -> Result<Option<Campaign>> {
        self.campaigns.get(id).await
    }

    pub async fn notification(&self, campaign: CampaignId) -> Result<Option<Notification>> {
        self.notifications.for_campaign(campaign).await
    }

    pub async fn campaigns(&self) -> Result<Vec<Campaign>> {
        self.campaigns.get_all().await
    }

    pub async fn notifications(&self) -> Result<Vec<Notification>> {
        self.notifications.get_all().await
    }
}
