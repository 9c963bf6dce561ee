//! Core of a WhatsApp real-estate classifieds bot: group ads are classified
//! into listings, deduplicated and stored in a spreadsheet; direct messages
//! drive searches, alerts and a publication wizard.

pub mod alerts;
pub mod bot;
pub mod classifier;
pub mod clients;
pub mod clock;
pub mod config;
pub mod conversation;
pub mod error;
pub mod location;
pub mod models;
pub mod signature;
pub mod store;
pub mod text;

#[cfg(test)]
mod testing;
