//! Application layer orchestrating the notification engine.
//!
//! `DispatchEngine` runs a single send from request to persisted outcome.
//! Dispatches run on a `DispatchPool` of tokio tasks, and every credit
//! balance is owned by the `CreditLedger` actor, reached through channels
//! so concurrent senders never race on a balance.

pub mod credited;
pub mod dispatcher;
pub mod ledger;
pub mod monitor;
pub mod notices;
pub mod provider;
pub mod templates;
pub mod tracker;
pub mod worker;
