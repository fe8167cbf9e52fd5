//! Core engine for an interactive historical-sites atlas of Đà Nẵng.
//!
//! The crate wires four layers: a data provider serving sites, persons, and
//! their expanded detail records; a generation pipeline (queue, cache, and
//! summary services) that produces Vietnamese overlay content with graceful
//! fallbacks; a detail loader shaping records for display; and a selection
//! state machine driving the list/map/overlay navigation choreography.

pub mod atlas;
pub mod config;
pub mod data;
pub mod detail;
pub mod genai;
pub mod selection;
pub mod types;

pub use atlas::Atlas;
pub use config::AtlasConfig;
pub use data::{EntityProvider, MockProvider};
pub use detail::{DetailLoader, DetailStatus, PersonView, SiteView};
pub use genai::SummaryService;
pub use selection::{SelectionController, SelectionSnapshot};
pub use types::{EntityRef, Person, Site, ViewMode};

pub use anyhow::{Error, Result};
