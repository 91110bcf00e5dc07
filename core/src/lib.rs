//! feeledger-core: academic-year class resolution and fee reconciliation
//! for a school back office.
//!
//! The pure pipeline (`class_resolver` → `fee_reconciler` → `payment_status`,
//! composed by `facade`) takes typed records and returns a new result. The
//! `source`, `store` and `service` modules fetch those records and apply the
//! mutations whose results feed back into it.

pub mod academic_year;
pub mod class_resolver;
pub mod config;
pub mod error;
pub mod event;
pub mod facade;
pub mod fee_reconciler;
pub mod model;
pub mod payment_status;
pub mod service;
pub mod source;
pub mod store;
pub mod types;
