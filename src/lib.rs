//! Visit agenda: a checklist board for field visits to establishments.
//!
//! The persisted list is reconciled against the current schema on every
//! load ([`reconcile`]) and displayed in chronological order built from
//! free-text "date - period" descriptors ([`schedule`]).

pub mod auth;
pub mod board;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod reconcile;
pub mod schedule;
pub mod store;

pub use error::{AgendaError, Result};
