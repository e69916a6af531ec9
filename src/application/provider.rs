use crate::domain::delivery::DeliveryResult;
use crate::domain::ledger::Credits;
use crate::domain::ports::{ProviderLedgerRef, SmsGatewayRef};
use crate::error::{DispatchError, Result};
use tracing::{error, info, warn};

pub const DEFAULT_COUNTRY_CODE: &str = "255";

/// Puts a local or `+`-prefixed number into the gateway's international form.
///
/// Every non-digit is dropped first, `+` and separators alike. A leading
/// trunk `0` on what remains is then replaced with `country_code`.
pub fn normalize_phone(phone: &str, country_code: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    match digits.strip_prefix('0') {
        Some(local) => format!("{}{}", country_code, local),
        None => digits,
    }
}

/// Sends messages through the configured gateway and keeps the local
/// provider pool in step with the upstream balance.
pub struct ProviderClient {
    gateway: SmsGatewayRef,
    ledger: ProviderLedgerRef,
    country_code: String,
}

impl ProviderClient {
    pub fn new(gateway: SmsGatewayRef, ledger: ProviderLedgerRef, country_code: impl Into<String>) -> Self {
        Self {
            gateway,
            ledger,
            country_code: country_code.into(),
        }
    }

    /// Never fails: transport and gateway errors come back as an
    /// unsuccessful `DeliveryResult`.
    pub async fn send(&self, phone_number: &str, message: &str) -> DeliveryResult {
        let destination = normalize_phone(phone_number, &self.country_code);
        let result = self.gateway.send(&destination, message).await;
        if result.success {
            info!(destination = %destination, request_id = ?result.request_id, "SMS accepted by provider");
        } else {
            warn!(
                destination = %destination,
                code = ?result.error_code,
                reason = %result.failure_reason(),
                "SMS rejected by provider"
            );
        }
        result
    }

    /// Asks the gateway for the live balance and stores it in the pool.
    ///
    /// There is no safe balance to assume when the gateway cannot answer,
    /// so any failure is returned as `BalanceCheck`.
    pub async fn check_balance(&self) -> Result<Credits> {
        let balance = self.gateway.fetch_balance().await.map_err(|e| {
            error!(error = %e, "failed to check SMS balance");
            match e {
                DispatchError::BalanceCheck(_) => e,
                other => DispatchError::BalanceCheck(other.to_string()),
            }
        })?;
        self.ledger.resync(balance).await?;
        info!(balance = %balance, "fetched SMS credit balance");
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_zero_gets_country_code() {
        assert_eq!(normalize_phone("0712345678", "255"), "255712345678");
    }

    #[test]
    fn test_leading_plus_is_stripped() {
        assert_eq!(normalize_phone("+255712345678", "255"), "255712345678");
    }

    #[test]
    fn test_plus_before_trunk_zero_still_gets_country_code() {
        assert_eq!(normalize_phone("+0712345678", "255"), "255712345678");
        assert_eq!(normalize_phone(" +0 712 345 678", "255"), "255712345678");
    }

    #[test]
    fn test_international_is_unchanged() {
        assert_eq!(normalize_phone("255712345678", "255"), "255712345678");
    }

    #[test]
    fn test_separators_are_dropped() {
        assert_eq!(normalize_phone("0712 345-678", "255"), "255712345678");
        assert_eq!(normalize_phone("+255 712 345 678", "255"), "255712345678");
    }
}
