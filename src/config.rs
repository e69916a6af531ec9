use crate::application::worker::PoolConfig;
use crate::domain::ledger::{Credits, LedgerPolicy, ProviderKind};
use crate::domain::party::CompanyProfile;
use crate::domain::ports::SmsGatewayRef;
use crate::domain::template::Locale;
use crate::error::Result;
use crate::infrastructure::gateway::{
    BEEM_BALANCE_URL, BEEM_SEND_URL, DryRunGateway, GatewayConfig, build_gateway,
};
use chrono::{DateTime, Utc};
use clap::Args;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

/// Upstream SMS account.
#[derive(Debug, Clone, Args)]
pub struct GatewaySettings {
    #[arg(long, env = "GYMSMS_PROVIDER", default_value = "beem_africa")]
    pub provider: ProviderKind,

    #[arg(long, env = "GYMSMS_SEND_URL", default_value = BEEM_SEND_URL)]
    pub send_url: String,

    #[arg(long, env = "GYMSMS_BALANCE_URL", default_value = BEEM_BALANCE_URL)]
    pub balance_url: String,

    #[arg(long, env = "GYMSMS_API_KEY", default_value = "")]
    pub api_key: String,

    #[arg(long, env = "GYMSMS_API_SECRET", default_value = "", hide_env_values = true)]
    pub api_secret: String,

    /// Sender name shown on the handset.
    #[arg(long, env = "GYMSMS_SENDER_ID", default_value = "GYM")]
    pub sender_id: String,

    #[arg(long, env = "GYMSMS_HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Prefix that replaces a leading 0 in local phone numbers.
    #[arg(long, env = "GYMSMS_COUNTRY_CODE", default_value = "255")]
    pub country_code: String,

    /// Accept every message locally instead of calling the provider.
    #[arg(long, env = "GYMSMS_DRY_RUN")]
    pub dry_run: bool,

    /// Balance reported by the dry-run gateway.
    #[arg(long, env = "GYMSMS_DRY_RUN_BALANCE", default_value = "1000")]
    pub dry_run_balance: Decimal,
}

impl GatewaySettings {
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            provider: self.provider,
            send_url: self.send_url.clone(),
            balance_url: self.balance_url.clone(),
            api_key: self.api_key.clone(),
            api_secret: self.api_secret.clone(),
            sender_id: self.sender_id.clone(),
            timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }

    pub fn build(&self) -> Result<SmsGatewayRef> {
        if self.dry_run {
            return Ok(Arc::new(DryRunGateway::new(Credits(self.dry_run_balance))));
        }
        build_gateway(self.gateway_config())
    }
}

/// Everything the engine reads at start-up. Each flag falls back to a
/// `GYMSMS_*` environment variable.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    #[command(flatten)]
    pub gateway: GatewaySettings,

    /// Provider credits below which sends are refused and the owner is warned.
    #[arg(long, env = "GYMSMS_LOW_BALANCE_FLOOR", default_value = "100")]
    pub low_balance_floor: Decimal,

    /// Locale used when a target's own has no template.
    #[arg(long, env = "GYMSMS_FALLBACK_LOCALE", default_value = "en")]
    pub fallback_locale: Locale,

    #[arg(long, env = "GYMSMS_MONITOR_INTERVAL_SECS", default_value_t = 3600)]
    pub monitor_interval_secs: u64,

    #[arg(long, env = "GYMSMS_OWNER_ID", default_value_t = 1)]
    pub owner_id: u64,

    #[arg(long, env = "GYMSMS_OWNER_NAME", default_value = "Gym Owner")]
    pub owner_name: String,

    #[arg(long, env = "GYMSMS_OWNER_PHONE", default_value = "")]
    pub owner_phone: String,

    #[arg(long, env = "GYMSMS_OWNER_LOCALE")]
    pub owner_locale: Option<Locale>,

    /// End of the owner's own subscription (RFC 3339). Only voucher refills
    /// read it, so warnings work without it.
    #[arg(long, env = "GYMSMS_OWNER_SUBSCRIPTION_END")]
    pub owner_subscription_end: Option<DateTime<Utc>>,

    #[arg(long, env = "GYMSMS_WORKERS", default_value_t = 50)]
    pub workers: usize,

    #[arg(long, env = "GYMSMS_QUEUE_CAPACITY", default_value_t = 200)]
    pub queue_capacity: usize,
}

impl Settings {
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
        }
    }

    pub fn ledger_policy(&self) -> LedgerPolicy {
        LedgerPolicy {
            provider_floor: Credits(self.low_balance_floor),
            ..LedgerPolicy::default()
        }
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs.max(1))
    }

    /// The company whose owner receives low-balance warnings.
    ///
    /// The profile is only used to address and render the warning. Without
    /// `--owner-subscription-end` the subscription is treated as ending now,
    /// which would give any voucher issued from it an already expired date.
    pub fn owner(&self) -> CompanyProfile {
        CompanyProfile {
            id: self.owner_id,
            name: self.owner_name.clone(),
            phone: self.owner_phone.clone(),
            tin: None,
            locale: self.owner_locale,
            subscription_end: self.owner_subscription_end.unwrap_or_else(Utc::now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rust_decimal_macros::dec;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        settings: Settings,
    }

    #[test]
    fn test_defaults() {
        let settings = Harness::try_parse_from(["gymsms"]).unwrap().settings;
        assert_eq!(settings.pool_config(), PoolConfig::default());
        assert_eq!(settings.ledger_policy(), LedgerPolicy::default());
        assert_eq!(settings.gateway.send_url, BEEM_SEND_URL);
        assert_eq!(settings.gateway.country_code, "255");
        assert_eq!(settings.fallback_locale, Locale::En);
        assert!(!settings.gateway.dry_run);
    }

    #[test]
    fn test_flags_override_defaults() {
        let settings = Harness::try_parse_from([
            "gymsms",
            "--low-balance-floor",
            "250",
            "--workers",
            "4",
            "--owner-locale",
            "sw",
            "--http-timeout-secs",
            "5",
        ])
        .unwrap()
        .settings;
        assert_eq!(settings.ledger_policy().provider_floor, Credits(dec!(250)));
        assert_eq!(settings.pool_config().workers, 4);
        assert_eq!(settings.owner().locale, Some(Locale::Sw));
        assert_eq!(settings.gateway.gateway_config().timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_owner_profile_from_flags() {
        let settings = Harness::try_parse_from([
            "gymsms",
            "--owner-id",
            "7",
            "--owner-name",
            "Juma",
            "--owner-phone",
            "0788000111",
            "--owner-subscription-end",
            "2027-01-31T00:00:00Z",
        ])
        .unwrap()
        .settings;
        let owner = settings.owner();
        assert_eq!(owner.id, 7);
        assert_eq!(owner.name, "Juma");
        assert_eq!(owner.phone, "0788000111");
        assert!(owner.tin.is_none());
        assert_eq!(owner.subscription_end.to_rfc3339(), "2027-01-31T00:00:00+00:00");
    }

    #[test]
    fn test_owner_without_subscription_end_ends_now() {
        let before = Utc::now();
        let owner = Harness::try_parse_from(["gymsms"]).unwrap().settings.owner();
        assert!(owner.subscription_end >= before);
        assert!(owner.subscription_end <= Utc::now());
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        assert!(Harness::try_parse_from(["gymsms", "--provider", "twilio"]).is_err());
    }
}
