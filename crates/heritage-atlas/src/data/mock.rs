//! Seeded in-memory provider with simulated fetch latency.
//!
//! Serves a compact Đà Nẵng dataset so the full pipeline (lists, details,
//! summaries, selection) runs without a backend. Latency goes through
//! `tokio::time::sleep`, so paused-clock tests complete instantly.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use super::{DataError, EntityProvider};
use crate::types::{Event, Media, MediaKind, Person, PersonDetail, Site, SiteDetail};

const LIST_LATENCY: Duration = Duration::from_millis(500);
const DETAIL_LATENCY: Duration = Duration::from_millis(300);

#[derive(Default)]
pub struct MockProvider;

impl MockProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EntityProvider for MockProvider {
    async fn list_sites(&self) -> Result<Vec<Site>, DataError> {
        tokio::time::sleep(LIST_LATENCY).await;
        Ok(seed_sites())
    }

    async fn list_persons(&self) -> Result<Vec<Person>, DataError> {
        tokio::time::sleep(LIST_LATENCY).await;
        Ok(seed_persons())
    }

    async fn site_detail(&self, site_id: u32) -> Result<Option<SiteDetail>, DataError> {
        tokio::time::sleep(DETAIL_LATENCY).await;
        Ok(seed_site_detail(site_id))
    }

    async fn person_detail(&self, person_id: u32) -> Result<Option<PersonDetail>, DataError> {
        tokio::time::sleep(DETAIL_LATENCY).await;
        Ok(seed_person_detail(person_id))
    }
}

fn info(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn seed_sites() -> Vec<Site> {
    vec![
        Site {
            site_id: 1,
            site_name: "Cầu Rồng".into(),
            site_type: "Công trình kiến trúc".into(),
            latitude: 16.0613,
            longitude: 108.2274,
            address: Some("Nguyễn Văn Linh, Hải Châu, Đà Nẵng".into()),
            established_year: Some(2013),
            status: Some("Đang hoạt động".into()),
            description: Some(
                "Cầu Rồng bắc qua sông Hàn, nổi tiếng với thiết kế hình rồng \
                 phun lửa và phun nước vào cuối tuần."
                    .into(),
            ),
            additional_info: info(&[("Chiều dài", "666 m"), ("Số làn xe", "6")]),
        },
        Site {
            site_id: 4,
            site_name: "Bảo tàng Điêu khắc Chăm".into(),
            site_type: "Bảo tàng".into(),
            latitude: 16.0603,
            longitude: 108.2232,
            address: Some("Số 2, 2 Tháng 9, Hải Châu, Đà Nẵng".into()),
            established_year: Some(1919),
            status: Some("Mở cửa".into()),
            description: Some(
                "Bảo tàng lưu giữ bộ sưu tập điêu khắc Chăm Pa lớn nhất thế giới.".into(),
            ),
            additional_info: BTreeMap::new(),
        },
        Site {
            site_id: 6,
            site_name: "Cầu Sông Hàn".into(),
            site_type: "Công trình kiến trúc".into(),
            latitude: 16.0722,
            longitude: 108.2268,
            address: None,
            established_year: Some(2000),
            status: None,
            description: None,
            additional_info: BTreeMap::new(),
        },
    ]
}

fn seed_persons() -> Vec<Person> {
    vec![
        Person {
            person_id: 1,
            full_name: "Nguyễn Bá Thanh".into(),
            birth_year: Some(1953),
            death_year: Some(2015),
        },
        Person {
            person_id: 2,
            full_name: "Henri Parmentier".into(),
            birth_year: Some(1871),
            death_year: Some(1949),
        },
    ]
}

fn seed_site_detail(site_id: u32) -> Option<SiteDetail> {
    let site = seed_sites().into_iter().find(|s| s.site_id == site_id)?;
    // Site 6 has no authored detail record.
    let events = match site_id {
        1 => vec![
            Event {
                event_id: 102,
                event_name: "Lễ khánh thành".into(),
                start_date: Some("2013-03-29".into()),
                end_date: None,
                description: "Cầu Rồng chính thức thông xe, nối liền hai bờ sông Hàn.".into(),
                persons: vec![seed_persons().remove(0)],
                media: vec![
                    Media {
                        media_id: 1002,
                        media_url: "https://example.org/media/cau-rong-khanh-thanh.jpg".into(),
                        media_kind: MediaKind::Image,
                        caption: Some("Cầu Rồng trong lễ khánh thành năm 2013.".into()),
                        thumbnail_url: None,
                    },
                    Media {
                        media_id: 1003,
                        media_url: "https://example.org/media/cau-rong-phun-lua.mp4".into(),
                        media_kind: MediaKind::Video,
                        caption: Some("Màn trình diễn phun lửa cuối tuần.".into()),
                        thumbnail_url: None,
                    },
                ],
                related_site_id: None,
                related_site_name: None,
            },
            Event {
                event_id: 101,
                event_name: "Cuộc thi thiết kế".into(),
                start_date: Some("Cuối năm 2005".into()),
                end_date: None,
                description: "Thành phố tổ chức cuộc thi thiết kế quốc tế cho cây cầu mới.".into(),
                persons: vec![],
                media: vec![],
                related_site_id: None,
                related_site_name: None,
            },
        ],
        4 => vec![Event {
            event_id: 201,
            event_name: "Thành lập bảo tàng".into(),
            start_date: Some("1919-01-01".into()),
            end_date: None,
            description: "Bảo tàng mở cửa dưới sự chủ trì của Trường Viễn Đông Bác Cổ.".into(),
            persons: vec![seed_persons().remove(1)],
            media: vec![],
            related_site_id: None,
            related_site_name: None,
        }],
        _ => return None,
    };
    Some(SiteDetail { site, events })
}

fn seed_person_detail(person_id: u32) -> Option<PersonDetail> {
    let person = seed_persons()
        .into_iter()
        .find(|p| p.person_id == person_id)?;
    match person_id {
        1 => Some(PersonDetail {
            person,
            biography: "Nguyễn Bá Thanh là nhà lãnh đạo gắn liền với giai đoạn phát triển \
                        hạ tầng mạnh mẽ của Đà Nẵng đầu thế kỷ 21."
                .into(),
            media: vec![Media {
                media_id: 2001,
                media_url: "https://example.org/media/nguyen-ba-thanh.jpg".into(),
                media_kind: MediaKind::Image,
                caption: Some("Chân dung ông Nguyễn Bá Thanh.".into()),
                thumbnail_url: None,
            }],
            events: vec![Event {
                event_id: 102,
                event_name: "Lễ khánh thành Cầu Rồng".into(),
                start_date: Some("2013-03-29".into()),
                end_date: None,
                description: "Tham dự lễ thông xe Cầu Rồng.".into(),
                persons: vec![],
                media: vec![],
                related_site_id: Some(1),
                related_site_name: Some("Cầu Rồng".into()),
            }],
            additional_info: info(&[("Quê quán", "Hòa Vang, Đà Nẵng")]),
        }),
        2 => Some(PersonDetail {
            person,
            biography: "Henri Parmentier là nhà khảo cổ học người Pháp, người đặt nền móng \
                        cho Bảo tàng Điêu khắc Chăm."
                .into(),
            media: vec![],
            events: vec![Event {
                event_id: 201,
                event_name: "Thành lập Bảo tàng Điêu khắc Chăm".into(),
                start_date: Some("1919-01-01".into()),
                end_date: None,
                description: "Chủ trì việc xây dựng bảo tàng tại Đà Nẵng.".into(),
                persons: vec![],
                media: vec![],
                related_site_id: Some(4),
                related_site_name: Some("Bảo tàng Điêu khắc Chăm".into()),
            }],
            additional_info: BTreeMap::new(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn lists_are_non_empty_and_ids_unique() {
        let provider = MockProvider::new();
        let sites = provider.list_sites().await.unwrap();
        let persons = provider.list_persons().await.unwrap();

        assert!(!sites.is_empty());
        assert!(!persons.is_empty());
        let mut ids: Vec<u32> = sites.iter().map(|s| s.site_id).collect();
        ids.dedup();
        assert_eq!(ids.len(), sites.len());
    }

    #[tokio::test(start_paused = true)]
    async fn detail_ids_match_the_requested_entity() {
        let provider = MockProvider::new();
        let detail = provider.site_detail(1).await.unwrap().unwrap();
        assert_eq!(detail.site.site_id, 1);

        let person = provider.person_detail(2).await.unwrap().unwrap();
        assert_eq!(person.person.person_id, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn listed_site_without_detail_returns_none() {
        let provider = MockProvider::new();
        assert!(provider.site_detail(6).await.unwrap().is_none());
        assert!(provider.site_detail(999).await.unwrap().is_none());
    }
}
