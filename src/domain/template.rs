use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The business event a message template is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    MemberWelcome,
    PaymentConfirmation,
    SubscriptionReminder,
    PaymentReminder,
    LowBalanceWarning,
}

impl MessageType {
    pub const ALL: [MessageType; 5] = [
        MessageType::MemberWelcome,
        MessageType::PaymentConfirmation,
        MessageType::SubscriptionReminder,
        MessageType::PaymentReminder,
        MessageType::LowBalanceWarning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::MemberWelcome => "member_welcome",
            MessageType::PaymentConfirmation => "payment_confirmation",
            MessageType::SubscriptionReminder => "subscription_reminder",
            MessageType::PaymentReminder => "payment_reminder",
            MessageType::LowBalanceWarning => "low_balance_warning",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Sw,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Sw];

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Sw => "sw",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "sw" => Ok(Locale::Sw),
            other => Err(format!("unsupported locale '{}'", other)),
        }
    }
}

/// Identifies a template by the pair it is looked up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateRef {
    pub message_type: MessageType,
    pub locale: Locale,
}

impl TemplateRef {
    pub fn new(message_type: MessageType, locale: Locale) -> Self {
        Self {
            message_type,
            locale,
        }
    }

    /// Stable storage key, e.g. `member_welcome:sw`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.message_type, self.locale)
    }
}

/// A localized message body with `{placeholder}` markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub message_type: MessageType,
    pub locale: Locale,
    pub body: String,
}

impl Template {
    pub fn new(message_type: MessageType, locale: Locale, body: impl Into<String>) -> Self {
        Self {
            message_type,
            locale,
            body: body.into(),
        }
    }

    pub fn reference(&self) -> TemplateRef {
        TemplateRef::new(self.message_type, self.locale)
    }

    pub fn render(&self, placeholders: &Placeholders) -> String {
        render(&self.body, placeholders)
    }
}

/// Named values substituted into a template body.
///
/// A `None` value is rendered as an empty string; keys that never appear
/// here are left in the body untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placeholders(BTreeMap<String, Option<String>>);

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, Some(value.into()));
        self
    }

    pub fn with_null(mut self, key: impl Into<String>) -> Self {
        self.insert(key, None);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_deref()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Placeholders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        )
    }
}

/// Substitutes every `{key}` occurrence in `body`.
pub fn render(body: &str, placeholders: &Placeholders) -> String {
    let mut message = body.to_string();
    for (key, value) in placeholders.iter() {
        let marker = format!("{{{}}}", key);
        message = message.replace(&marker, value.unwrap_or(""));
    }
    message
}
