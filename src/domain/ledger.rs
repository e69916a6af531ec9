use super::campaign::DeliveryStatus;
use super::party::CompanyProfile;
use crate::error::{DispatchError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

/// A count of SMS credits.
///
/// Wraps `rust_decimal::Decimal` because the upstream gateway reports
/// fractional balances; one message always costs exactly one credit.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Credits(pub Decimal);

impl Credits {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.normalize(), f)
    }
}

impl From<Decimal> for Credits {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl Add for Credits {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Credits {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Credits {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Credits {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Mul<Decimal> for Credits {
    type Output = Self;
    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

/// Thresholds used by both ledgers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerPolicy {
    /// The provider pool is low below this many credits.
    pub provider_floor: Credits,
    /// A voucher is low below this share of its granted count.
    pub voucher_low_ratio: Decimal,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            provider_floor: Credits(dec!(100)),
            voucher_low_ratio: dec!(0.1),
        }
    }
}

/// Upstream gateways the pool can be held with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    BeemAfrica,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::BeemAfrica => f.write_str("beem_africa"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beem_africa" | "beem" => Ok(ProviderKind::BeemAfrica),
            other => Err(format!("unsupported SMS provider '{}'", other)),
        }
    }
}

/// The single upstream gateway account shared by every tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCreditPool {
    pub provider: ProviderKind,
    pub remaining: Credits,
    pub used: Credits,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}

impl ProviderCreditPool {
    pub fn new(provider: ProviderKind, remaining: Credits) -> Self {
        Self {
            provider,
            remaining,
            used: Credits::ZERO,
            active: true,
            updated_at: Utc::now(),
        }
    }

    pub fn has_sufficient_balance(&self, policy: &LedgerPolicy) -> bool {
        self.remaining >= policy.provider_floor
    }

    /// Charges one credit for a delivered message. Failed sends are free.
    pub fn settle(&mut self, outcome: DeliveryStatus) -> Result<()> {
        if outcome != DeliveryStatus::Sent {
            return Ok(());
        }
        if self.remaining < Credits::ONE {
            return Err(DispatchError::InsufficientCredits(format!(
                "provider pool has {} credits left",
                self.remaining
            )));
        }
        self.remaining -= Credits::ONE;
        self.used += Credits::ONE;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Replaces the local view with the balance the gateway reported.
    pub fn resync(&mut self, observed: Credits) {
        self.remaining = observed;
        self.updated_at = Utc::now();
    }
}

/// A purchasable bundle of SMS credits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmsPackage {
    pub name: String,
    pub units: Credits,
    pub price: Decimal,
    pub provider: ProviderKind,
}

/// A tenant's prepaid SMS allowance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantVoucher {
    pub company_id: u64,
    pub company_name: String,
    pub company_tin: Option<String>,
    /// Units granted by the most recent package.
    pub granted: Credits,
    pub remaining: Credits,
    pub package_name: String,
    pub provider: ProviderKind,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TenantVoucher {
    /// Opens a voucher for a company's first package purchase.
    pub fn issue(company: &CompanyProfile, package: &SmsPackage) -> Self {
        let now = Utc::now();
        Self {
            company_id: company.id,
            company_name: company.name.clone(),
            company_tin: company.tin.clone(),
            granted: package.units,
            remaining: package.units,
            package_name: package.name.clone(),
            provider: package.provider,
            expires_at: company.subscription_end,
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds a package on top of what is left; consumed units stay consumed.
    pub fn refill(&mut self, company: &CompanyProfile, package: &SmsPackage) {
        self.company_name = company.name.clone();
        self.company_tin = company.tin.clone();
        self.granted = package.units;
        self.remaining += package.units;
        self.package_name = package.name.clone();
        self.provider = package.provider;
        self.expires_at = company.subscription_end;
        self.updated_at = Utc::now();
    }

    pub fn is_low(&self, policy: &LedgerPolicy) -> bool {
        self.remaining < self.granted * policy.voucher_low_ratio
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn has_sufficient_balance_at(&self, policy: &LedgerPolicy, now: DateTime<Utc>) -> bool {
        !self.is_low(policy) && !self.is_expired_at(now)
    }

    pub fn settle(&mut self, outcome: DeliveryStatus) -> Result<()> {
        if outcome != DeliveryStatus::Sent {
            return Ok(());
        }
        if self.remaining < Credits::ONE {
            return Err(DispatchError::InsufficientCredits(format!(
                "voucher for company {} has {} credits left",
                self.company_id, self.remaining
            )));
        }
        self.remaining -= Credits::ONE;
        self.updated_at = Utc::now();
        Ok(())
    }
}
