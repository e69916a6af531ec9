use crate::application::dispatcher::DispatchRequest;
use crate::domain::party::{Contact, Target};
use crate::domain::template::{Locale, MessageType, Placeholders};
use crate::error::{DispatchError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Member,
    Company,
}

/// Which ledger pays for an event's message.
#[derive(Debug, Deserialize, PartialEq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum Billing {
    #[default]
    None,
    Provider,
    Voucher,
}

/// One row of a dispatch batch file.
///
/// `target` and `template` may be blank; the engine rejects such rows.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct DispatchEvent {
    pub target: Option<TargetKind>,
    pub id: u64,
    pub name: String,
    pub phone: String,
    pub locale: Option<Locale>,
    pub template: Option<MessageType>,
    pub billing: Option<Billing>,
    pub company: Option<u64>,
    #[serde(default)]
    pub placeholders: String,
}

impl DispatchEvent {
    /// Blank means the event is not charged to any ledger.
    pub fn billing(&self) -> Billing {
        self.billing.unwrap_or_default()
    }

    pub fn into_request(self) -> DispatchRequest {
        let contact = Contact {
            id: self.id,
            name: self.name,
            phone: self.phone,
            locale: self.locale,
        };
        DispatchRequest {
            target: self.target.map(|kind| match kind {
                TargetKind::Member => Target::Member(contact),
                TargetKind::Company => Target::Company(contact),
            }),
            message_type: self.template,
            placeholders: parse_placeholders(&self.placeholders),
        }
    }

    /// The company a voucher-billed event is charged to. Company targets
    /// pay for themselves when the column is blank.
    pub fn voucher_company(&self) -> Result<u64> {
        match (self.company, self.target) {
            (Some(company), _) => Ok(company),
            (None, Some(TargetKind::Company)) => Ok(self.id),
            _ => Err(DispatchError::InvalidInput(format!(
                "voucher billing for {} needs a company column",
                self.id
            ))),
        }
    }
}

/// Parses `key=value;key=value`. A bare `key` maps to a null value.
pub fn parse_placeholders(raw: &str) -> Placeholders {
    let mut placeholders = Placeholders::new();
    for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        match pair.split_once('=') {
            Some((key, value)) => placeholders.insert(key.trim(), Some(value.trim().to_string())),
            None => placeholders.insert(pair, None),
        }
    }
    placeholders
}

/// Reads dispatch events from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes one event per row.
    pub fn events(self) -> impl Iterator<Item = Result<DispatchEvent>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(DispatchError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "target,id,name,phone,locale,template,billing,company,placeholders";

    #[test]
    fn test_reader_valid_stream() {
        let data = format!(
            "{}\nmember, 1, Amy, 0712345678, sw, member_welcome, provider, , firstName=Amy;companyName=Iron Gym\ncompany, 2, Iron Gym, 0700000000, , low_balance_warning, voucher, , balance=12",
            HEADER
        );
        let events: Vec<Result<DispatchEvent>> = EventReader::new(data.as_bytes()).events().collect();
        assert_eq!(events.len(), 2);

        let first = events[0].as_ref().unwrap();
        assert_eq!(first.target, Some(TargetKind::Member));
        assert_eq!(first.locale, Some(Locale::Sw));
        assert_eq!(first.billing(), Billing::Provider);

        let second = events[1].as_ref().unwrap();
        assert_eq!(second.billing(), Billing::Voucher);
        assert_eq!(second.locale, None);
        assert_eq!(second.voucher_company().unwrap(), 2);
    }

    #[test]
    fn test_blank_target_and_template_are_kept_as_none() {
        let data = format!("{}\n, 1, Amy, 0712345678, , , , , ", HEADER);
        let event = EventReader::new(data.as_bytes()).events().next().unwrap().unwrap();
        let request = event.into_request();
        assert!(request.target.is_none());
        assert!(request.message_type.is_none());
    }

    #[test]
    fn test_blank_billing_is_none() {
        let data = format!("{}\nmember, 1, Amy, 0712345678, en, member_welcome, , , ", HEADER);
        let event = EventReader::new(data.as_bytes()).events().next().unwrap().unwrap();
        assert_eq!(event.billing(), Billing::None);
        assert_eq!(event.company, None);
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = format!("{}\nmember, 1, Amy, 0712345678, en, birthday, , , ", HEADER);
        let results: Vec<Result<DispatchEvent>> = EventReader::new(data.as_bytes()).events().collect();
        assert!(results[0].is_err());
    }

    #[test]
    fn test_parse_placeholders() {
        let placeholders = parse_placeholders("firstName=Amy; amount = 10.00 ;note");
        assert_eq!(placeholders.get("firstName"), Some("Amy"));
        assert_eq!(placeholders.get("amount"), Some("10.00"));
        assert_eq!(placeholders.get("note"), None);
        assert_eq!(placeholders.len(), 3);
    }

    #[test]
    fn test_member_voucher_event_needs_company() {
        let data = format!("{}\nmember, 1, Amy, 0712345678, en, member_welcome, voucher, , ", HEADER);
        let event = EventReader::new(data.as_bytes()).events().next().unwrap().unwrap();
        assert!(matches!(event.voucher_company(), Err(DispatchError::InvalidInput(_))));
    }
}
