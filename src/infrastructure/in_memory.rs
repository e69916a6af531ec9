use crate::domain::campaign::{Campaign, CampaignId, Notification};
use crate::domain::ledger::{ProviderCreditPool, TenantVoucher};
use crate::domain::ports::{CampaignStore, CreditPoolStore, NotificationStore, TemplateStore, VoucherStore};
use crate::domain::template::{Locale, MessageType, Template};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory template table keyed by `(type, locale)`.
#[derive(Default, Clone)]
pub struct InMemoryTemplateStore {
    templates: Arc<RwLock<HashMap<(MessageType, Locale), Template>>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_templates(templates: impl IntoIterator<Item = Template>) -> Self {
        let map = templates
            .into_iter()
            .map(|t| ((t.message_type, t.locale), t))
            .collect();
        Self {
            templates: Arc::new(RwLock::new(map)),
        }
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn find(&self, message_type: MessageType, locale: Locale) -> Result<Option<Template>> {
        let templates = self.templates.read().await;
        Ok(templates.get(&(message_type, locale)).cloned())
    }

    async fn store(&self, template: Template) -> Result<()> {
        let mut templates = self.templates.write().await;
        templates.insert((template.message_type, template.locale), template);
        Ok(())
    }
}

/// A thread-safe in-memory store for campaigns.
///
/// Clones share the same map, which lets tests keep a reader handle on
/// a store that was boxed into the engine.
#[derive(Default, Clone)]
pub struct InMemoryCampaignStore {
    campaigns: Arc<RwLock<HashMap<CampaignId, Campaign>>>,
}

impl InMemoryCampaignStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CampaignStore for InMemoryCampaignStore {
    async fn store(&self, campaign: Campaign) -> Result<()> {
        let mut campaigns = self.campaigns.write().await;
        campaigns.insert(campaign.id, campaign);
        Ok(())
    }

    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        let campaigns = self.campaigns.read().await;
        Ok(campaigns.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Campaign>> {
        let campaigns = self.campaigns.read().await;
        Ok(campaigns.values().cloned().collect())
    }
}

/// A thread-safe in-memory store for notifications, indexed by campaign.
#[derive(Default, Clone)]
pub struct InMemoryNotificationStore {
    notifications: Arc<RwLock<HashMap<CampaignId, Notification>>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn store(&self, notification: Notification) -> Result<()> {
        let mut notifications = self.notifications.write().await;
        notifications.insert(notification.campaign, notification);
        Ok(())
    }

    async fn for_campaign(&self, campaign: CampaignId) -> Result<Option<Notification>> {
        let notifications = self.notifications.read().await;
        Ok(notifications.get(&campaign).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Notification>> {
        let notifications = self.notifications.read().await;
        Ok(notifications.values().cloned().collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCreditPoolStore {
    pool: Arc<RwLock<Option<ProviderCreditPool>>>,
}

impl InMemoryCreditPoolStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CreditPoolStore for InMemoryCreditPoolStore {
    async fn get(&self) -> Result<Option<ProviderCreditPool>> {
        Ok(self.pool.read().await.clone())
    }

    async fn store(&self, pool: ProviderCreditPool) -> Result<()> {
        *self.pool.write().await = Some(pool);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryVoucherStore {
    vouchers: Arc<RwLock<HashMap<u64, TenantVoucher>>>,
}

impl InMemoryVoucherStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VoucherStore for InMemoryVoucherStore {
    async fn get(&self, company_id: u64) -> Result<Option<TenantVoucher>> {
        let vouchers = self.vouchers.read().await;
        Ok(vouchers.get(&company_id).cloned())
    }

    async fn store(&self, voucher: TenantVoucher) -> Result<()> {
        let mut vouchers = self.vouchers.write().await;
        vouchers.insert(voucher.company_id, voucher);
        Ok(())
    }
}
