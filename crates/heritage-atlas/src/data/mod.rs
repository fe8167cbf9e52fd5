//! Entity data access.
//!
//! The atlas core is provider-agnostic: list and detail fetches go through
//! [`EntityProvider`], and the shipped [`MockProvider`] serves a seeded
//! Đà Nẵng dataset with simulated network latency.

pub mod mock;

pub use mock::MockProvider;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{Person, PersonDetail, Site, SiteDetail};

/// User-facing message shown when a list fetch fails.
pub const FETCH_ERROR_MSG: &str = "Đã xảy ra lỗi khi tải dữ liệu.";

#[derive(Debug, Error)]
pub enum DataError {
    #[error("data backend unavailable: {0}")]
    Backend(String),
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Source of sites, persons, and their expanded detail records.
///
/// Detail lookups distinguish "backend failed" (`Err`) from "no detail
/// authored for this id" (`Ok(None)`); the two render different messages.
#[async_trait]
pub trait EntityProvider: Send + Sync {
    async fn list_sites(&self) -> Result<Vec<Site>, DataError>;

    async fn list_persons(&self) -> Result<Vec<Person>, DataError>;

    async fn site_detail(&self, site_id: u32) -> Result<Option<SiteDetail>, DataError>;

    async fn person_detail(&self, person_id: u32) -> Result<Option<PersonDetail>, DataError>;
}
