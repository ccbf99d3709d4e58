//! Single-node proof-of-work ledger
//!
//! [`blockchain::Blockchain`] is the entry point: it accepts transactions,
//! mines blocks and answers chain and balance queries. [`api`] serves those
//! operations over HTTP.

pub mod api;
pub mod blockchain;
pub mod config;
