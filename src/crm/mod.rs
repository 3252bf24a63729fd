//! CRM boundary: REST client and query construction

pub mod client;
pub mod soql;

pub use client::{CrmClient, SaveError, SaveResult};
