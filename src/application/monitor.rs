use super::dispatcher::DispatchEngine;
use super::notices::Notifier;
use crate::domain::ledger::Credits;
use crate::domain::party::CompanyProfile;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// What one monitor tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The gateway could not be asked; the last known balance stands.
    Skipped,
    Healthy(Credits),
    Warned(Credits),
    /// Balance was low but the warning itself could not be sent.
    WarningFailed(Credits),
}

/// Polls the gateway balance and warns the company owner when it runs low.
pub struct BalanceMonitor {
    engine: Arc<DispatchEngine>,
    notifier: Notifier,
    owner: CompanyProfile,
    floor: Credits,
    interval: Duration,
}

impl BalanceMonitor {
    pub fn new(
        engine: Arc<DispatchEngine>,
        notifier: Notifier,
        owner: CompanyProfile,
        floor: Credits,
        interval: Duration,
    ) -> Self {
        Self {
            engine,
            notifier,
            owner,
            floor,
            interval,
        }
    }

    pub async fn tick(&self) -> TickOutcome {
        let balance = match self.engine.provider().check_balance().await {
            Ok(balance) => balance,
            Err(e) => {
                warn!(error = %e, "scheduled balance check failed, keeping last known balance");
                return TickOutcome::Skipped;
            }
        };
        info!(%balance, "balance check executed");

        if !balance.is_positive() || balance >= self.floor {
            return TickOutcome::Healthy(balance);
        }

        match self.notifier.low_balance_warning(&self.owner, balance).await {
            Ok(()) => TickOutcome::Warned(balance),
            Err(e) => {
                error!(%balance, error = %e, "failed to send low balance warning");
                TickOutcome::WarningFailed(balance)
            }
        }
    }

    /// Ticks every interval until `shutdown` flips to true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?self.interval, floor = %self.floor, "balance monitor started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("balance monitor stopped");
    }
}
