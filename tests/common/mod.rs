#![allow(dead_code)]

use async_trait::async_trait;
use gymsms::application::credited::CreditedDispatcher;
use gymsms::application::dispatcher::DispatchEngine;
use gymsms::application::ledger::CreditLedger;
use gymsms::application::provider::{DEFAULT_COUNTRY_CODE, ProviderClient};
use gymsms::application::templates::TemplateResolver;
use gymsms::application::tracker::CampaignTracker;
use gymsms::application::worker::{DispatchPool, PoolConfig};
use gymsms::domain::delivery::DeliveryResult;
use gymsms::domain::ledger::{Credits, LedgerPolicy, ProviderKind};
use gymsms::domain::party::{CompanyProfile, Contact, Target};
use gymsms::domain::ports::{ProviderLedgerRef, SmsGateway, VoucherLedgerRef};
use gymsms::domain::template::{Locale, Template};
use gymsms::error::{DispatchError, Result};
use gymsms::infrastructure::in_memory::{
    InMemoryCampaignStore, InMemoryCreditPoolStore, InMemoryNotificationStore, InMemoryTemplateStore,
    InMemoryVoucherStore,
};
use gymsms::infrastructure::seed::default_templates;
use rand::Rng;
use serde_json::json;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// An `SmsGateway` whose answers are decided up front by the test.
#[derive(Default)]
pub struct ScriptedGateway {
    reject_all: bool,
    rejected: HashSet<String>,
    balance: Mutex<Option<Credits>>,
    delay: Option<Duration>,
    jitter_ms: u64,
    next_request: AtomicU64,
    sent: Mutex<Vec<(String, String)>>,
}

impl ScriptedGateway {
    pub fn accepting() -> Self {
        Self {
            next_request: AtomicU64::new(1),
            ..Self::default()
        }
    }

    pub fn rejecting_all() -> Self {
        Self {
            reject_all: true,
            ..Self::accepting()
        }
    }

    /// Rejects messages to one international-form number.
    pub fn rejecting(mut self, phone: &str) -> Self {
        self.rejected.insert(phone.to_string());
        self
    }

    pub fn with_balance(self, balance: Credits) -> Self {
        *self.balance.lock().unwrap() = Some(balance);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Each send sleeps a random 0..=`max_ms` milliseconds.
    pub fn with_jitter(mut self, max_ms: u64) -> Self {
        self.jitter_ms = max_ms;
        self
    }

    pub fn set_balance(&self, balance: Option<Credits>) {
        *self.balance.lock().unwrap() = balance;
    }

    /// Every `(destination, body)` the gateway was asked to deliver.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsGateway for ScriptedGateway {
    async fn send(&self, phone_number: &str, message: &str) -> DeliveryResult {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.jitter_ms > 0 {
            let ms = rand::thread_rng().gen_range(0..=self.jitter_ms);
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        self.sent
            .lock()
            .unwrap()
            .push((phone_number.to_string(), message.to_string()));

        if self.reject_all || self.rejected.contains(phone_number) {
            return DeliveryResult {
                success: false,
                message: Some("Invalid phone number".to_string()),
                error_code: Some(114),
                details: json!({"code": 114}),
                ..DeliveryResult::default()
            };
        }
        DeliveryResult {
            success: true,
            message: Some("Message Submitted Successfully".to_string()),
            request_id: Some(self.next_request.fetch_add(1, Ordering::SeqCst)),
            valid: Some(1),
            invalid: Some(0),
            duplicates: Some(0),
            ..DeliveryResult::default()
        }
    }

    async fn fetch_balance(&self) -> Result<Credits> {
        let balance = *self.balance.lock().unwrap();
        balance.ok_or_else(|| DispatchError::BalanceCheck("gateway unreachable".to_string()))
    }
}

/// A fully wired engine over in-memory stores.
pub struct Harness {
    pub engine: Arc<DispatchEngine>,
    pub pool: DispatchPool,
    pub ledger: CreditLedger,
    pub credited: CreditedDispatcher,
    pub gateway: Arc<ScriptedGateway>,
    pub campaigns: InMemoryCampaignStore,
    pub notifications: InMemoryNotificationStore,
}

pub fn harness(gateway: ScriptedGateway) -> Harness {
    harness_with(gateway, default_templates(), PoolConfig::default())
}

pub fn harness_with(gateway: ScriptedGateway, templates: Vec<Template>, config: PoolConfig) -> Harness {
    let gateway = Arc::new(gateway);
    let campaigns = InMemoryCampaignStore::new();
    let notifications = InMemoryNotificationStore::new();

    let (ledger, _task) = CreditLedger::spawn(
        Box::new(InMemoryCreditPoolStore::new()),
        Box::new(InMemoryVoucherStore::new()),
        ProviderKind::BeemAfrica,
        LedgerPolicy::default(),
    );
    let provider_ledger: ProviderLedgerRef = Arc::new(ledger.clone());
    let voucher_ledger: VoucherLedgerRef = Arc::new(ledger.clone());

    let provider = ProviderClient::new(gateway.clone(), provider_ledger.clone(), DEFAULT_COUNTRY_CODE);
    let engine = Arc::new(DispatchEngine::new(
        TemplateResolver::new(Box::new(InMemoryTemplateStore::with_templates(templates)), Locale::En),
        CampaignTracker::new(Box::new(campaigns.clone()), Box::new(notifications.clone())),
        provider,
    ));
    let pool = DispatchPool::start(engine.clone(), config);
    let credited = CreditedDispatcher::new(pool.handle(), provider_ledger, voucher_ledger);

    Harness {
        engine,
        pool,
        ledger,
        credited,
        gateway,
        campaigns,
        notifications,
    }
}

pub fn member(id: u64, name: &str, phone: &str) -> Target {
    Target::Member(Contact::new(id, name, phone))
}

pub fn company(id: u64, name: &str, phone: &str) -> CompanyProfile {
    CompanyProfile {
        id,
        name: name.to_string(),
        phone: phone.to_string(),
        tin: Some("123-456-789".to_string()),
        locale: None,
        subscription_end: chrono::Utc::now() + chrono::Duration::days(30),
    }
}
