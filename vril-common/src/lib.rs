//! # Vril Common Library
//!
//! Shared code for the Vril tracker services:
//! - Error types
//! - Response envelope
//! - Configuration loading
//! - Database pool/schema initialization and settings store
//! - Global watermark and query cache
//! - Auth tokens

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod envelope;
pub mod error;
pub mod watermark;

pub use envelope::Envelope;
pub use error::{Error, Result};
