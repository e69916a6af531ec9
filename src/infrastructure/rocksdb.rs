use crate::domain::campaign::{Campaign, CampaignId, Notification};
use crate::domain::ledger::{ProviderCreditPool, TenantVoucher};
use crate::domain::ports::{CampaignStore, CreditPoolStore, NotificationStore, TemplateStore, VoucherStore};
use crate::domain::template::{Locale, MessageType, Template, TemplateRef};
use crate::error::{DispatchError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

/// Column Family for message templates, keyed `type:locale`.
pub const CF_TEMPLATES: &str = "templates";
/// Column Family for campaigns, keyed by campaign id.
pub const CF_CAMPAIGNS: &str = "campaigns";
/// Column Family for notifications, keyed by their campaign's id.
pub const CF_NOTIFICATIONS: &str = "notifications";
/// Column Family for the provider pool and tenant vouchers.
pub const CF_LEDGER: &str = "ledger";

const PROVIDER_POOL_KEY: &[u8] = b"provider";

fn voucher_key(company_id: u64) -> Vec<u8> {
    let mut key = b"voucher:".to_vec();
    key.extend_from_slice(&company_id.to_be_bytes());
    key
}

/// A persistent store implementation using RocksDB.
///
/// Every entity lives in its own Column Family as a JSON value, so one
/// database directory backs all five store ports.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating
    /// any missing Column Family.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_TEMPLATES, CF_CAMPAIGNS, CF_NOTIFICATIONS, CF_LEDGER]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn put<T: Serialize>(&self, family: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(family)?;
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(&cf, key, bytes)?;
        Ok(())
    }

    fn fetch<T: DeserializeOwned>(&self, family: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(family)?;
        match self.db.get_pinned_cf(&cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, family: &str) -> Result<Vec<T>> {
        let cf = self.cf(family)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(&cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }

    fn cf(&self, family: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(family).ok_or_else(|| {
            DispatchError::InternalError(Box::new(std::io::Error::other(format!(
                "{} column family not found",
                family
            ))))
        })
    }
}

#[async_trait]
impl TemplateStore for RocksDBStore {
    async fn find(&self, message_type: MessageType, locale: Locale) -> Result<Option<Template>> {
        let key = TemplateRef::new(message_type, locale).key();
        self.fetch(CF_TEMPLATES, key.as_bytes())
    }

    async fn store(&self, template: Template) -> Result<()> {
        let key = template.reference().key();
        self.put(CF_TEMPLATES, key.as_bytes(), &template)
    }
}

#[async_trait]
impl CampaignStore for RocksDBStore {
    async fn store(&self, campaign: Campaign) -> Result<()> {
        self.put(CF_CAMPAIGNS, campaign.id.0.as_bytes(), &campaign)
    }

    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        self.fetch(CF_CAMPAIGNS, id.0.as_bytes())
    }

    async fn get_all(&self) -> Result<Vec<Campaign>> {
        self.scan(CF_CAMPAIGNS)
    }
}

#[async_trait]
impl NotificationStore for RocksDBStore {
    async fn store(&self, notification: Notification) -> Result<()> {
        self.put(CF_NOTIFICATIONS, notification.campaign.0.as_bytes(), &notification)
    }

    async fn for_campaign(&self, campaign: CampaignId) -> Result<Option<Notification>> {
        self.fetch(CF_NOTIFICATIONS, campaign.0.as_bytes())
    }

    async fn get_all(&self) -> Result<Vec<Notification>> {
        self.scan(CF_NOTIFICATIONS)
    }
}

#[async_trait]
impl CreditPoolStore for RocksDBStore {
    async fn get(&self) -> Result<Option<ProviderCreditPool>> {
        self.fetch(CF_LEDGER, PROVIDER_POOL_KEY)
    }

    async fn store(&self, pool: ProviderCreditPool) -> Result<()> {
        self.put(CF_LEDGER, PROVIDER_POOL_KEY, &pool)
    }
}

#[async_trait]
impl VoucherStore for RocksDBStore {
    async fn get(&self, company_id: u64) -> Result<Option<TenantVoucher>> {
        self.fetch(CF_LEDGER, &voucher_key(company_id))
    }

    async fn store(&self, voucher: TenantVoucher) -> Result<()> {
        self.put(CF_LEDGER, &voucher_key(voucher.company_id), &voucher)
    }
}
