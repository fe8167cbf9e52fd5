//! Domain model: sites, persons, events, media, and the derived shapes the
//! list/map/overlay surfaces consume.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which entity kind the list panel and map are currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Sites,
    Persons,
}

/// A browsable historical site with a geographic representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub site_id: u32,
    pub site_name: String,
    /// Category tag ("Bảo tàng", "Địa điểm du lịch", ...), used for filtering.
    pub site_type: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub established_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Authored description. When present it is used verbatim as the summary
    /// instead of spending a generation call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_info: BTreeMap<String, String>,
}

/// A browsable historical person. Persons have no map representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub person_id: u32,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_year: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub media_id: u32,
    pub media_url: String,
    #[serde(rename = "media_type")]
    pub media_kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// A dated occurrence on a site's or person's timeline. Site events may
/// reference associated persons; person events may reference one related site
/// (by id plus denormalized name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: u32,
    pub event_name: String,
    /// Free-form date string; ISO when the source knows it, prose otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub persons: Vec<Person>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<Media>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_site_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_site_name: Option<String>,
}

/// Expanded record for a site. Invariant: `site.site_id` matches the id the
/// detail was fetched for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteDetail {
    #[serde(flatten)]
    pub site: Site,
    #[serde(default)]
    pub events: Vec<Event>,
}

/// Expanded record for a person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonDetail {
    #[serde(flatten)]
    pub person: Person,
    pub biography: String,
    #[serde(default)]
    pub media: Vec<Media>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_info: BTreeMap<String, String>,
}

/// Either browsable entity kind, matched exhaustively wherever kind
/// determines behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EntityRef {
    Site(Site),
    Person(Person),
}

impl EntityRef {
    pub fn display_name(&self) -> &str {
        match self {
            EntityRef::Site(s) => &s.site_name,
            EntityRef::Person(p) => &p.full_name,
        }
    }
}

/// The AI-generated (or fallen-back) content block for a site overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteAiData {
    pub summary: String,
    #[serde(default)]
    pub fun_facts: Vec<String>,
}

/// Parse a free-form event date. Accepts `YYYY-MM-DD`, `YYYY-MM`, and bare
/// `YYYY`; anything else (prose like "Cuối năm 2005") is treated as undated.
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if raw.len() == 7 {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d") {
            return Some(date);
        }
    }
    if raw.len() == 4 {
        if let Ok(year) = raw.parse::<i32>() {
            return NaiveDate::from_ymd_opt(year, 1, 1);
        }
    }
    None
}

/// Events ordered for presentation: ascending by start date, with undated
/// (or unparsable) events first. Ties keep arrival order.
pub fn sorted_events(events: &[Event]) -> Vec<Event> {
    let mut ordered = events.to_vec();
    ordered.sort_by_key(|e| e.start_date.as_deref().and_then(parse_event_date));
    ordered
}

/// Partition a combined gallery into (images, videos) by kind tag.
pub fn partition_media<'a, I>(media: I) -> (Vec<Media>, Vec<Media>)
where
    I: IntoIterator<Item = &'a Media>,
{
    let mut images = Vec::new();
    let mut videos = Vec::new();
    for m in media {
        match m.media_kind {
            MediaKind::Image => images.push(m.clone()),
            MediaKind::Video => videos.push(m.clone()),
        }
    }
    (images, videos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: u32, start: Option<&str>) -> Event {
        Event {
            event_id: id,
            event_name: format!("event {id}"),
            start_date: start.map(str::to_string),
            end_date: None,
            description: String::new(),
            persons: vec![],
            media: vec![],
            related_site_id: None,
            related_site_name: None,
        }
    }

    #[test]
    fn event_dates_parse_iso_and_year_forms() {
        assert!(parse_event_date("2013-03-29").is_some());
        assert!(parse_event_date("2013-03").is_some());
        assert!(parse_event_date("1915").is_some());
        assert!(parse_event_date("Cuối năm 2005").is_none());
    }

    #[test]
    fn undated_events_sort_first() {
        let events = vec![
            event(1, Some("2013-03-29")),
            event(2, None),
            event(3, Some("1915")),
            event(4, Some("Cuối năm 2005")),
        ];
        let ids: Vec<u32> = sorted_events(&events).iter().map(|e| e.event_id).collect();
        // Undated and unparsable keep arrival order ahead of dated events.
        assert_eq!(ids, vec![2, 4, 3, 1]);
    }

    #[test]
    fn media_partitions_by_kind() {
        let media = vec![
            Media {
                media_id: 1,
                media_url: "a.jpg".into(),
                media_kind: MediaKind::Image,
                caption: None,
                thumbnail_url: None,
            },
            Media {
                media_id: 2,
                media_url: "b.mp4".into(),
                media_kind: MediaKind::Video,
                caption: None,
                thumbnail_url: None,
            },
        ];
        let (images, videos) = partition_media(&media);
        assert_eq!(images.len(), 1);
        assert_eq!(videos.len(), 1);
        assert_eq!(images[0].media_id, 1);
    }

    #[test]
    fn site_ai_data_uses_camel_case_wire_shape() {
        let parsed: SiteAiData =
            serde_json::from_str(r#"{"summary":"s","funFacts":["a","b"]}"#).unwrap();
        assert_eq!(parsed.fun_facts.len(), 2);
    }
}
