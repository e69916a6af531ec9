use crate::domain::ports::TemplateStoreBox;
use crate::domain::template::{Locale, MessageType, Template};
use crate::error::{DispatchError, Result};
use tracing::{debug, warn};

/// Looks templates up by message type and locale, falling back to one
/// fixed locale when the requested translation is missing.
pub struct TemplateResolver {
    store: TemplateStoreBox,
    fallback: Locale,
}

impl TemplateResolver {
    pub fn new(store: TemplateStoreBox, fallback: Locale) -> Self {
        Self { store, fallback }
    }

    pub fn fallback(&self) -> Locale {
        self.fallback
    }

    /// `locale` of `None` goes straight to the fallback locale.
    ///
    /// A miss in both locales means seed data is missing; the returned
    /// `TemplateNotFound` is not worth retrying.
    pub async fn resolve(&self, message_type: MessageType, locale: Option<Locale>) -> Result<Template> {
        let requested = locale.unwrap_or(self.fallback);
        if let Some(template) = self.store.find(message_type, requested).await? {
            debug!(%message_type, locale = %requested, "template resolved");
            return Ok(template);
        }

        if requested != self.fallback {
            warn!(
                %message_type,
                locale = %requested,
                fallback = %self.fallback,
                "template not found, falling back"
            );
            if let Some(template) = self.store.find(message_type, self.fallback).await? {
                return Ok(template);
            }
        }

        warn!(%message_type, "template not found in any locale");
        Err(DispatchError::TemplateNotFound {
            message_type,
            locale: requested,
        })
    }
}
