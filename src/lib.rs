//! LendKaki lead capture library
//!
//! Validation, form controllers, submission transports and the lead API
//! behind the LendKaki loan comparison landing pages.
//!
//! # Modules
//!
//! - `api`: Router construction and HTTP handlers.
//! - `core`: Domain logic (schemas, form controllers, calculator).
//! - `integrations`: Datastores and submission transports.
//! - `calculator`: Loan repayment calculator.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `errors`: Error handling types.
//! - `form`: Multi-step and quick form controllers.
//! - `handlers`: HTTP request handlers.
//! - `models`: Lead data models.
//! - `schemas`: Lead validation rules.
//! - `store`: Lead persistence (Postgres, Supabase REST).
//! - `transport`: Spreadsheet webhook and API submission transports.

pub mod api;
pub mod core;
pub mod integrations;

pub mod calculator;
pub mod config;
pub mod db;
pub mod errors;
pub mod form;
pub mod handlers;
pub mod models;
pub mod schemas;
pub mod store;
pub mod transport;
