//! Support-ticket classification service.
//!
//! Resolves a fine-tuned DistilBERT artifact on disk, loads it once, and
//! serves `account` / `billing` / `technical` / `other` predictions over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod ml;

pub use error::{AppError, Result};
