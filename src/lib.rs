//! Custodia Ops Scoring API Library
//!
//! This library implements the scoring core of the custody operations
//! platform: client credit behavior analysis and service risk assessment,
//! exposed over HTTP on top of a PostgreSQL store.
//!
//! # Modules
//!
//! - `cache_validator`: Integrity checking for cached analyses.
//! - `config`: Configuration management.
//! - `credito`: Client credit scoring.
//! - `db`: Database connection and pool management.
//! - `db_storage`: Database storage operations.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `riesgo`: Service risk scoring.

pub mod cache_validator;
pub mod config;
pub mod credito;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod riesgo;
