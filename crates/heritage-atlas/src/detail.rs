//! Detail views: fetch an entity's expanded record, attach generated
//! summaries, and shape the result for the overlay (sorted timeline, media
//! galleries, related-entity links).

use std::sync::Arc;

use dashmap::DashMap;

use crate::data::{DataError, EntityProvider};
use crate::genai::summary::SummaryService;
use crate::types::{
    partition_media, sorted_events, Event, Media, Person, PersonDetail, Site, SiteAiData,
    SiteDetail,
};

/// Shown when a listed site has no authored detail record.
pub const SITE_MISSING_MSG: &str = "Không tìm thấy thông tin chi tiết cho địa điểm này.";
/// Shown when a listed person has no authored detail record.
pub const PERSON_MISSING_MSG: &str = "Không tìm thấy thông tin chi tiết cho nhân vật này.";
/// Map popup body while the site has no authored description.
pub const POPUP_PENDING_MSG: &str = "Thông tin chi tiết đang được cập nhật.";

/// Outcome of a detail load. `Missing` and `Failed` render different
/// messages, so the distinction is kept rather than collapsed into one error.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailStatus<T> {
    Ready(T),
    Missing,
    Failed(String),
}

impl DetailStatus<SiteView> {
    /// Overlay body when there is no view to render.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            DetailStatus::Ready(_) => None,
            DetailStatus::Missing => Some(SITE_MISSING_MSG),
            DetailStatus::Failed(msg) => Some(msg),
        }
    }
}

impl DetailStatus<PersonView> {
    pub fn error_message(&self) -> Option<&str> {
        match self {
            DetailStatus::Ready(_) => None,
            DetailStatus::Missing => Some(PERSON_MISSING_MSG),
            DetailStatus::Failed(msg) => Some(msg),
        }
    }
}

/// Everything the site overlay renders.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteView {
    pub detail: SiteDetail,
    pub ai: SiteAiData,
    /// Timeline order: dated events ascending, undated first.
    pub events: Vec<Event>,
    pub images: Vec<Media>,
    pub videos: Vec<Media>,
    /// Persons attached to any event, first occurrence wins.
    pub related_persons: Vec<Person>,
}

/// Everything the person overlay renders.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonView {
    pub detail: PersonDetail,
    pub summary: String,
    pub events: Vec<Event>,
    pub images: Vec<Media>,
    pub videos: Vec<Media>,
    pub profile_image: Option<Media>,
}

/// Body text for a site's map popup.
pub fn popup_description(site: &Site) -> &str {
    match site.description.as_deref().map(str::trim) {
        Some(d) if !d.is_empty() => d,
        _ => POPUP_PENDING_MSG,
    }
}

fn related_persons(events: &[Event]) -> Vec<Person> {
    let mut seen = Vec::new();
    let mut out: Vec<Person> = Vec::new();
    for event in events {
        for person in &event.persons {
            if !seen.contains(&person.person_id) {
                seen.push(person.person_id);
                out.push(person.clone());
            }
        }
    }
    out
}

fn profile_image(images: &[Media]) -> Option<Media> {
    images
        .iter()
        .find(|m| {
            m.caption
                .as_deref()
                .map(|c| c.contains("Chân dung") || c.contains("Tượng đài"))
                .unwrap_or(false)
        })
        .or_else(|| images.first())
        .cloned()
}

/// Loads detail records, memoizing successful views for the session.
/// Misses and failures are not memoized, so a transient backend error does
/// not poison the entity for the rest of the run.
pub struct DetailLoader {
    provider: Arc<dyn EntityProvider>,
    summaries: SummaryService,
    site_views: DashMap<u32, SiteView>,
    person_views: DashMap<u32, PersonView>,
}

impl DetailLoader {
    pub fn new(provider: Arc<dyn EntityProvider>, summaries: SummaryService) -> Self {
        Self {
            provider,
            summaries,
            site_views: DashMap::new(),
            person_views: DashMap::new(),
        }
    }

    pub async fn site_view(&self, site_id: u32) -> DetailStatus<SiteView> {
        if let Some(cached) = self.site_views.get(&site_id) {
            return DetailStatus::Ready(cached.clone());
        }
        let detail = match self.provider.site_detail(site_id).await {
            Ok(Some(detail)) => detail,
            Ok(None) => return DetailStatus::Missing,
            Err(e) => return DetailStatus::Failed(describe(e)),
        };

        let ai = self.summaries.site_ai_data(&detail).await;
        let events = sorted_events(&detail.events);
        let (images, videos) = partition_media(events.iter().flat_map(|e| e.media.iter()));
        let view = SiteView {
            related_persons: related_persons(&events),
            detail,
            ai,
            events,
            images,
            videos,
        };
        self.site_views.insert(site_id, view.clone());
        DetailStatus::Ready(view)
    }

    pub async fn person_view(&self, person_id: u32) -> DetailStatus<PersonView> {
        if let Some(cached) = self.person_views.get(&person_id) {
            return DetailStatus::Ready(cached.clone());
        }
        let detail = match self.provider.person_detail(person_id).await {
            Ok(Some(detail)) => detail,
            Ok(None) => return DetailStatus::Missing,
            Err(e) => return DetailStatus::Failed(describe(e)),
        };

        let summary = self.summaries.person_summary(&detail).await;
        let events = sorted_events(&detail.events);
        // Gallery: the person's own media first, then event media.
        let gallery: Vec<&Media> = detail
            .media
            .iter()
            .chain(events.iter().flat_map(|e| e.media.iter()))
            .collect();
        let (images, videos) = partition_media(gallery);
        let view = PersonView {
            profile_image: profile_image(&images),
            detail,
            summary,
            events,
            images,
            videos,
        };
        self.person_views.insert(person_id, view.clone());
        DetailStatus::Ready(view)
    }
}

fn describe(e: DataError) -> String {
    tracing::error!(error = %e, "detail fetch failed");
    crate::data::FETCH_ERROR_MSG.to_string()
}
