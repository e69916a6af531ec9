use crate::domain::campaign::{Campaign, CampaignStatus};
use crate::domain::template::{Locale, MessageType};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct OutcomeRow<'a> {
    target: String,
    template: MessageType,
    locale: Locale,
    status: CampaignStatus,
    executed: bool,
    name: &'a str,
    error: &'a str,
}

impl<'a> From<&'a Campaign> for OutcomeRow<'a> {
    fn from(campaign: &'a Campaign) -> Self {
        Self {
            target: campaign.target.to_string(),
            template: campaign.template.message_type,
            locale: campaign.template.locale,
            status: campaign.status,
            executed: campaign.executed,
            name: campaign.name.as_deref().unwrap_or(""),
            error: campaign.error_message.as_deref().unwrap_or(""),
        }
    }
}

/// Writes one CSV row per campaign.
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Rows are ordered by scheduling time so a batch reads back in the
    /// order it was dispatched.
    pub fn write_campaigns(&mut self, mut campaigns: Vec<Campaign>) -> csv::Result<()> {
        campaigns.sort_by_key(|c| c.scheduled_at);
        for campaign in &campaigns {
            self.writer.serialize(OutcomeRow::from(campaign))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
