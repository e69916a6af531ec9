use crate::domain::campaign::DeliveryStatus;
use crate::domain::ledger::{Credits, LedgerPolicy, ProviderCreditPool, ProviderKind, SmsPackage, TenantVoucher};
use crate::domain::party::CompanyProfile;
use crate::domain::ports::{CreditPoolStoreBox, ProviderLedger, VoucherLedger, VoucherStoreBox};
use crate::error::{DispatchError, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

const LEDGER_MAILBOX: usize = 1024;

type Reply<T> = oneshot::Sender<Result<T>>;

enum LedgerCommand {
    ProviderSufficient(Reply<bool>),
    ProviderSettle(DeliveryStatus, Reply<()>),
    ProviderBalance(Reply<Option<ProviderCreditPool>>),
    ProviderResync(Credits, Reply<ProviderCreditPool>),
    VoucherSufficient(u64, Reply<bool>),
    VoucherSettle(u64, DeliveryStatus, Reply<()>),
    VoucherBalance(u64, Reply<Option<TenantVoucher>>),
    VoucherRefill(Box<(CompanyProfile, SmsPackage)>, Reply<TenantVoucher>),
}

/// Handle to the single task that owns every credit balance.
///
/// All reads and writes go through one mailbox, so each read-modify-write
/// on the pool or a voucher completes before the next one starts and no
/// decrement is lost between concurrent senders.
#[derive(Clone)]
pub struct CreditLedger {
    tx: mpsc::Sender<LedgerCommand>,
}

impl CreditLedger {
    /// Starts the ledger task. It stops once every handle is dropped.
    pub fn spawn(
        pool_store: CreditPoolStoreBox,
        voucher_store: VoucherStoreBox,
        provider: ProviderKind,
        policy: LedgerPolicy,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(LEDGER_MAILBOX);
        let actor = LedgerActor {
            pool_store,
            voucher_store,
            provider,
            policy,
        };
        let handle = tokio::spawn(actor.run(rx));
        (Self { tx }, handle)
    }

    async fn ask<T>(&self, build: impl FnOnce(Reply<T>) -> LedgerCommand) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| DispatchError::LedgerUnavailable)?;
        response.await.map_err(|_| DispatchError::LedgerUnavailable)?
    }
}

#[async_trait]
impl ProviderLedger for CreditLedger {
    async fn has_sufficient_balance(&self) -> Result<bool> {
        self.ask(LedgerCommand::ProviderSufficient).await
    }

    async fn settle(&self, outcome: DeliveryStatus) -> Result<()> {
        self.ask(|reply| LedgerCommand::ProviderSettle(outcome, reply)).await
    }

    async fn balance(&self) -> Result<Option<ProviderCreditPool>> {
        self.ask(LedgerCommand::ProviderBalance).await
    }

    async fn resync(&self, observed: Credits) -> Result<ProviderCreditPool> {
        self.ask(|reply| LedgerCommand::ProviderResync(observed, reply)).await
    }
}

#[async_trait]
impl VoucherLedger for CreditLedger {
    async fn has_sufficient_balance(&self, company_id: u64) -> Result<bool> {
        self.ask(|reply| LedgerCommand::VoucherSufficient(company_id, reply)).await
    }

    async fn settle(&self, company_id: u64, outcome: DeliveryStatus) -> Result<()> {
        self.ask(|reply| LedgerCommand::VoucherSettle(company_id, outcome, reply)).await
    }

    async fn balance(&self, company_id: u64) -> Result<Option<TenantVoucher>> {
        self.ask(|reply| LedgerCommand::VoucherBalance(company_id, reply)).await
    }

    async fn refill(&self, company: CompanyProfile, package: SmsPackage) -> Result<TenantVoucher> {
        self.ask(|reply| LedgerCommand::VoucherRefill(Box::new((company, package)), reply))
            .await
    }
}

struct LedgerActor {
    pool_store: CreditPoolStoreBox,
    voucher_store: VoucherStoreBox,
    provider: ProviderKind,
    policy: LedgerPolicy,
}

impl LedgerActor {
    async fn run(self, mut rx: mpsc::Receiver<LedgerCommand>) {
        while let Some(command) = rx.recv().await {
            // A dropped reply means the caller gave up waiting; the write
            // itself has already happened.
            match command {
                LedgerCommand::ProviderSufficient(reply) => {
                    let _ = reply.send(self.provider_sufficient().await);
                }
                LedgerCommand::ProviderSettle(outcome, reply) => {
                    let _ = reply.send(self.provider_settle(outcome).await);
                }
                LedgerCommand::ProviderBalance(reply) => {
                    let _ = reply.send(self.pool_store.get().await);
                }
                LedgerCommand::ProviderResync(observed, reply) => {
                    let _ = reply.send(self.provider_resync(observed).await);
                }
                LedgerCommand::VoucherSufficient(company_id, reply) => {
                    let _ = reply.send(self.voucher_sufficient(company_id).await);
                }
                LedgerCommand::VoucherSettle(company_id, outcome, reply) => {
                    let _ = reply.send(self.voucher_settle(company_id, outcome).await);
                }
                LedgerCommand::VoucherBalance(company_id, reply) => {
                    let _ = reply.send(self.voucher_store.get(company_id).await);
                }
                LedgerCommand::VoucherRefill(request, reply) => {
                    let (company, package) = *request;
                    let _ = reply.send(self.voucher_refill(company, package).await);
                }
            }
        }
        info!("credit ledger stopped");
    }

    async fn provider_sufficient(&self) -> Result<bool> {
        let Some(pool) = self.pool_store.get().await? else {
            warn!("no provider credit pool recorded");
            return Ok(false);
        };
        let sufficient = pool.has_sufficient_balance(&self.policy);
        if !sufficient {
            warn!(remaining = %pool.remaining, floor = %self.policy.provider_floor, "provider credit pool is low");
        }
        Ok(sufficient)
    }

    async fn provider_settle(&self, outcome: DeliveryStatus) -> Result<()> {
        let mut pool = self
            .pool_store
            .get()
            .await?
            .ok_or(DispatchError::ProviderPoolMissing)?;
        pool.settle(outcome)?;
        if outcome == DeliveryStatus::Sent {
            self.pool_store.store(pool.clone()).await?;
            info!(remaining = %pool.remaining, used = %pool.used, "provider credit settled");
        }
        Ok(())
    }

    async fn provider_resync(&self, observed: Credits) -> Result<ProviderCreditPool> {
        let pool = match self.pool_store.get().await? {
            Some(mut pool) => {
                pool.resync(observed);
                pool
            }
            None => ProviderCreditPool::new(self.provider, observed),
        };
        self.pool_store.store(pool.clone()).await?;
        info!(provider = %pool.provider, remaining = %pool.remaining, "provider credit pool resynced");
        Ok(pool)
    }

    async fn voucher_sufficient(&self, company_id: u64) -> Result<bool> {
        let Some(voucher) = self.voucher_store.get(company_id).await? else {
            warn!(company_id, "no SMS voucher found for company");
            return Ok(false);
        };
        let now = Utc::now();
        if voucher.is_low(&self.policy) {
            warn!(
                company_id,
                remaining = %voucher.remaining,
                granted = %voucher.granted,
                "company has low SMS balance"
            );
            return Ok(false);
        }
        if voucher.is_expired_at(now) {
            warn!(company_id, expires_at = %voucher.expires_at, "company SMS voucher has expired");
            return Ok(false);
        }
        Ok(true)
    }

    async fn voucher_settle(&self, company_id: u64, outcome: DeliveryStatus) -> Result<()> {
        let mut voucher = self
            .voucher_store
            .get(company_id)
            .await?
            .ok_or(DispatchError::VoucherNotFound(company_id))?;
        voucher.settle(outcome)?;
        if outcome == DeliveryStatus::Sent {
            self.voucher_store.store(voucher.clone()).await?;
            info!(company_id, remaining = %voucher.remaining, "voucher credit settled");
        }
        Ok(())
    }

    async fn voucher_refill(&self, company: CompanyProfile, package: SmsPackage) -> Result<TenantVoucher> {
        let voucher = match self.voucher_store.get(company.id).await? {
            Some(mut voucher) => {
                voucher.refill(&company, &package);
                voucher
            }
            None => TenantVoucher::issue(&company, &package),
        };
        self.voucher_store.store(voucher.clone()).await?;
        info!(
            company_id = company.id,
            package = %package.name,
            remaining = %voucher.remaining,
            "refilled SMS voucher"
        );
        Ok(voucher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::{InMemoryCreditPoolStore, InMemoryVoucherStore};
    use chrono::{DateTime, Duration};
    use rust_decimal_macros::dec;

    fn ledger() -> CreditLedger {
        let (ledger, _handle) = CreditLedger::spawn(
            Box::new(InMemoryCreditPoolStore::new()),
            Box::new(InMemoryVoucherStore::new()),
            ProviderKind::BeemAfrica,
            LedgerPolicy::default(),
        );
        ledger
    }

    fn company(subscription_end: DateTime<Utc>) -> CompanyProfile {
        CompanyProfile {
            id: 9,
            name: "Iron Gym".to_string(),
            phone: "0700000000".to_string(),
            tin: None,
            locale: None,
            subscription_end,
        }
    }

    fn package(units: rust_decimal::Decimal) -> SmsPackage {
        SmsPackage {
            name: "Basic Plan".to_string(),
            units: Credits(units),
            price: dec!(25),
            provider: ProviderKind::BeemAfrica,
        }
    }

    #[tokio::test]
    async fn test_missing_pool_is_insufficient() {
        let ledger = ledger();
        assert!(!ProviderLedger::has_sufficient_balance(&ledger).await.unwrap());
        assert!(matches!(
            ProviderLedger::settle(&ledger, DeliveryStatus::Sent).await,
            Err(DispatchError::ProviderPoolMissing)
        ));
    }

    #[tokio::test]
    async fn test_resync_creates_then_overwrites() {
        let ledger = ledger();
        ledger.resync(Credits(dec!(250))).await.unwrap();
        ProviderLedger::settle(&ledger, DeliveryStatus::Sent).await.unwrap();

        let pool = ledger.resync(Credits(dec!(99))).await.unwrap();
        assert_eq!(pool.remaining, Credits(dec!(99)));
        assert_eq!(pool.used, Credits(dec!(1)));
        assert!(!ProviderLedger::has_sufficient_balance(&ledger).await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_settlements_are_not_lost() {
        let ledger = ledger();
        ledger.resync(Credits(dec!(500))).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..200 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ProviderLedger::settle(&ledger, DeliveryStatus::Sent).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let pool = ProviderLedger::balance(&ledger).await.unwrap().unwrap();
        assert_eq!(pool.remaining, Credits(dec!(300)));
        assert_eq!(pool.used, Credits(dec!(200)));
    }

    #[tokio::test]
    async fn test_refill_creates_then_adds() {
        let ledger = ledger();
        let end = Utc::now() + Duration::days(30);

        let voucher = ledger.refill(company(end), package(dec!(500))).await.unwrap();
        assert_eq!(voucher.remaining, Credits(dec!(500)));

        for _ in 0..20 {
            VoucherLedger::settle(&ledger, 9, DeliveryStatus::Sent).await.unwrap();
        }
        let voucher = ledger.refill(company(end), package(dec!(500))).await.unwrap();
        assert_eq!(voucher.remaining, Credits(dec!(980)));
        assert_eq!(voucher.granted, Credits(dec!(500)));
    }

    #[tokio::test]
    async fn test_voucher_sufficiency() {
        let ledger = ledger();
        assert!(!VoucherLedger::has_sufficient_balance(&ledger, 9).await.unwrap());

        ledger
            .refill(company(Utc::now() + Duration::days(1)), package(dec!(10)))
            .await
            .unwrap();
        assert!(VoucherLedger::has_sufficient_balance(&ledger, 9).await.unwrap());

        ledger
            .refill(company(Utc::now() - Duration::days(1)), package(dec!(10)))
            .await
            .unwrap();
        assert!(!VoucherLedger::has_sufficient_balance(&ledger, 9).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_outcome_leaves_voucher_untouched() {
        let ledger = ledger();
        ledger
            .refill(company(Utc::now() + Duration::days(1)), package(dec!(10)))
            .await
            .unwrap();
        VoucherLedger::settle(&ledger, 9, DeliveryStatus::Failed).await.unwrap();
        let voucher = VoucherLedger::balance(&ledger, 9).await.unwrap().unwrap();
        assert_eq!(voucher.remaining, Credits(dec!(10)));
    }
}
