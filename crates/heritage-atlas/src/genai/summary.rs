//! Summary services — the two call sites of the generation queue.
//!
//! Each operation builds a prompt plus a structured-output schema, picks a
//! fallback, and submits through the response cache so repeated views of the
//! same entity never re-issue a request. Generation failures are fully
//! absorbed here: callers always receive a value, never an error.

use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tokio::sync::oneshot;

use super::cache::ResponseCache;
use super::queue::{GenerationRequest, RequestQueue};
use super::strip_code_fence;
use crate::types::{PersonDetail, SiteAiData, SiteDetail};

pub const NO_SITE_DESCRIPTION: &str = "Không có mô tả chi tiết.";
pub const NO_BIOGRAPHY: &str = "Không có tiểu sử chi tiết.";

#[derive(Clone)]
pub struct SummaryService {
    queue: RequestQueue,
    site_cache: ResponseCache<SiteAiData>,
    person_cache: ResponseCache<String>,
}

impl SummaryService {
    pub fn new(queue: RequestQueue) -> Self {
        Self {
            queue,
            site_cache: ResponseCache::new(),
            person_cache: ResponseCache::new(),
        }
    }

    /// Summary plus fun facts for a site. Idempotent per site id: repeated
    /// calls replay the cached outcome without a second generation call.
    ///
    /// A site with an authored description only asks the endpoint for fun
    /// facts; the summary is the authored text verbatim. An empty-string
    /// description counts as absent.
    pub async fn site_ai_data(&self, site: &SiteDetail) -> SiteAiData {
        let key = format!("sitedata-{}", site.site.site_id);
        let authored = site
            .site
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let fallback = SiteAiData {
            summary: authored
                .clone()
                .or_else(|| site.events.first().map(|e| e.description.clone()))
                .unwrap_or_else(|| NO_SITE_DESCRIPTION.to_string()),
            fun_facts: Vec::new(),
        };

        let request_key = key.clone();
        let queue = self.queue.clone();
        let cache = self.site_cache.clone();
        let prompt_site = site.clone();
        self.site_cache
            .get_or_create(&key, move || {
                let (tx, rx) = oneshot::channel::<SiteAiData>();
                let request = match authored {
                    Some(summary) => {
                        let queue_fallback = fallback.clone();
                        GenerationRequest::new(
                            request_key.clone(),
                            fun_facts_prompt(&prompt_site),
                            Some(fun_facts_schema()),
                            move |raw| {
                                let value = match raw {
                                    Some(text) => SiteAiData {
                                        summary,
                                        fun_facts: parse_fun_facts(&text),
                                    },
                                    None => queue_fallback,
                                };
                                let _ = tx.send(value);
                            },
                        )
                    }
                    None => {
                        let queue_fallback = fallback.clone();
                        GenerationRequest::new(
                            request_key.clone(),
                            site_prompt(&prompt_site),
                            Some(site_schema()),
                            move |raw| {
                                let value = match raw {
                                    Some(text) => parse_site_ai(&text, &queue_fallback),
                                    None => queue_fallback,
                                };
                                let _ = tx.send(value);
                            },
                        )
                    }
                };
                queue.enqueue(request);

                async move {
                    match rx.await {
                        Ok(value) => value,
                        Err(_) => {
                            // Worker died before resolving; evict so a later
                            // call can retry.
                            cache.evict(&request_key);
                            fallback
                        }
                    }
                }
            })
            .await
    }

    /// Short prose biography summary for a person. Fallback is the raw
    /// biography text, or a placeholder when the biography is empty.
    pub async fn person_summary(&self, person: &PersonDetail) -> String {
        let key = format!("person-{}", person.person.person_id);
        let fallback = if person.biography.trim().is_empty() {
            NO_BIOGRAPHY.to_string()
        } else {
            person.biography.clone()
        };

        let request_key = key.clone();
        let queue = self.queue.clone();
        let cache = self.person_cache.clone();
        let prompt = person_prompt(person);
        self.person_cache
            .get_or_create(&key, move || {
                let (tx, rx) = oneshot::channel::<String>();
                let queue_fallback = fallback.clone();
                queue.enqueue(GenerationRequest::new(
                    request_key.clone(),
                    prompt,
                    None,
                    move |raw| {
                        let _ = tx.send(raw.unwrap_or(queue_fallback));
                    },
                ));

                async move {
                    match rx.await {
                        Ok(value) => value,
                        Err(_) => {
                            cache.evict(&request_key);
                            fallback
                        }
                    }
                }
            })
            .await
    }
}

// --- Prompt builders & response schemas ---

fn event_lines(site: &SiteDetail) -> String {
    site.events
        .iter()
        .map(|e| format!("- {}: {}", e.event_name, e.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn site_prompt(site: &SiteDetail) -> String {
    format!(
        "Provide a structured JSON response about the historical site \"{}\" in Da Nang, Vietnam.\n\
         The site is a {}.\n\
         Key information includes:\n{}\n\n\
         The JSON object must conform to the provided schema.\n\
         - The 'summary' should be a concise, engaging overview for tourists, under 70 words, in Vietnamese. Use markdown for bolding the site name.\n\
         - The 'funFacts' should be an array of 3 interesting, lesser-known facts about the site, in Vietnamese.",
        site.site.site_name,
        site.site.site_type,
        event_lines(site)
    )
}

fn fun_facts_prompt(site: &SiteDetail) -> String {
    format!(
        "Provide a structured JSON response about the historical site \"{}\" in Da Nang, Vietnam.\n\
         The site is a {}.\n\
         Key information includes:\n{}\n\n\
         The JSON object must conform to the provided schema.\n\
         - The 'funFacts' should be an array of 3 interesting, lesser-known facts about the site. \
         Do not include the site name in the facts. Write in Vietnamese.",
        site.site.site_name,
        site.site.site_type,
        event_lines(site)
    )
}

fn person_prompt(person: &PersonDetail) -> String {
    let years = match (person.person.birth_year, person.person.death_year) {
        (Some(b), Some(d)) => format!("({} - {})", b, d),
        (Some(b), None) => format!("(sinh năm {})", b),
        _ => String::new(),
    };
    format!(
        "Hãy viết một đoạn tóm tắt tiểu sử ngắn gọn, hấp dẫn về nhân vật lịch sử \"{}\" {}. \
         Dựa trên thông tin sau: \"{}\". Hãy viết bằng tiếng Việt, dưới 80 từ, với văn phong \
         trang trọng, phù hợp cho một ứng dụng giáo dục lịch sử.",
        person.person.full_name, years, person.biography
    )
}

pub(crate) fn site_schema() -> JsonValue {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": {
                "type": "STRING",
                "description": "A concise and engaging summary of the historical site, under 70 words, in Vietnamese."
            },
            "funFacts": {
                "type": "ARRAY",
                "description": "A list of 3 interesting, lesser-known fun facts about the site, in Vietnamese.",
                "items": { "type": "STRING" }
            }
        },
        "required": ["summary", "funFacts"]
    })
}

pub(crate) fn fun_facts_schema() -> JsonValue {
    json!({
        "type": "OBJECT",
        "properties": {
            "funFacts": {
                "type": "ARRAY",
                "description": "A list of 3 interesting, lesser-known fun facts about the site, in Vietnamese.",
                "items": { "type": "STRING" }
            }
        },
        "required": ["funFacts"]
    })
}

// --- Response parsing ---

fn parse_site_ai(text: &str, fallback: &SiteAiData) -> SiteAiData {
    match serde_json::from_str::<SiteAiData>(strip_code_fence(text)) {
        Ok(data) => data,
        Err(e) => {
            tracing::error!(error = %e, "failed to parse structured site response");
            fallback.clone()
        }
    }
}

fn parse_fun_facts(text: &str) -> Vec<String> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct FunFactsOnly {
        #[serde(default)]
        fun_facts: Vec<String>,
    }

    match serde_json::from_str::<FunFactsOnly>(strip_code_fence(text)) {
        Ok(parsed) => parsed.fun_facts,
        Err(e) => {
            tracing::error!(error = %e, "failed to parse fun-facts response");
            Vec::new()
        }
    }
}
