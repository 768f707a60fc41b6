//! News source abstraction.
//!
//! This module provides a `NewsSource` trait for fetching the daily article
//! batch, and a TheNewsAPI.com implementation.

mod thenewsapi;
mod types;

pub use thenewsapi::TheNewsApiClient;
pub use types::*;
