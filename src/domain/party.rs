use super::template::Locale;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The reachable part of a member or company record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: u64,
    pub name: String,
    pub phone: String,
    /// Preferred language; `None` means the fallback locale.
    pub locale: Option<Locale>,
}

impl Contact {
    pub fn new(id: u64, name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            phone: phone.into(),
            locale: None,
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }
}

/// Who a message is addressed to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Target {
    Member(Contact),
    Company(Contact),
}

impl Target {
    pub fn contact(&self) -> &Contact {
        match self {
            Target::Member(contact) | Target::Company(contact) => contact,
        }
    }

    pub fn phone(&self) -> &str {
        &self.contact().phone
    }

    pub fn locale(&self) -> Option<Locale> {
        self.contact().locale
    }

    pub fn reference(&self) -> TargetRef {
        match self {
            Target::Member(contact) => TargetRef::Member(contact.id),
            Target::Company(contact) => TargetRef::Company(contact.id),
        }
    }
}

/// What a campaign or notification points back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum TargetRef {
    Member(u64),
    Company(u64),
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetRef::Member(id) => write!(f, "member:{}", id),
            TargetRef::Company(id) => write!(f, "company:{}", id),
        }
    }
}

/// The tenant owning a voucher and receiving operator alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub id: u64,
    pub name: String,
    pub phone: String,
    pub tin: Option<String>,
    pub locale: Option<Locale>,
    pub subscription_end: DateTime<Utc>,
}

impl CompanyProfile {
    pub fn contact(&self) -> Contact {
        Contact {
            id: self.id,
            name: self.name.clone(),
            phone: self.phone.clone(),
            locale: self.locale,
        }
    }

    pub fn target(&self) -> Target {
        Target::Company(self.contact())
    }
}

/// The invoice fields that end up in payment messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub id: u64,
    pub package_name: String,
    pub amount_paid: Decimal,
    pub remaining_amount: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_reference_display() {
        let member = Target::Member(Contact::new(7, "Amy", "0712345678"));
        assert_eq!(member.reference().to_string(), "member:7");
        let company = Target::Company(Contact::new(1, "Iron Gym", "0700000000"));
        assert_eq!(company.reference().to_string(), "company:1");
    }

    #[test]
    fn test_target_locale_defaults_to_none() {
        let target = Target::Member(Contact::new(1, "Amy", "0712345678"));
        assert_eq!(target.locale(), None);
        let target = Target::Member(Contact::new(1, "Amy", "0712345678").with_locale(Locale::Sw));
        assert_eq!(target.locale(), Some(Locale::Sw));
    }
}
