//! Domain model of the notification engine: templates, credits, campaigns
//! and the ports the application layer talks through.

pub mod campaign;
pub mod delivery;
pub mod ledger;
pub mod party;
pub mod ports;
pub mod template;
