//! Top-level wiring: one constructor that assembles the generation client,
//! request queue, summary services, detail loader, and selection controller
//! from a validated config.

use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::config::AtlasConfig;
use crate::data::{DataError, EntityProvider};
use crate::detail::{DetailLoader, DetailStatus, PersonView, SiteView};
use crate::genai::client::GeminiClient;
use crate::genai::queue::{QueuePolicy, RequestQueue};
use crate::genai::summary::SummaryService;
use crate::genai::TextGenerator;
use crate::selection::SelectionController;
use crate::types::{Person, Site};

pub struct Atlas {
    provider: Arc<dyn EntityProvider>,
    details: DetailLoader,
    selection: SelectionController,
}

impl Atlas {
    /// Build the full pipeline. Without a generation credential the atlas
    /// still works; summaries come from authored fallbacks.
    pub fn bootstrap(config: AtlasConfig, provider: Arc<dyn EntityProvider>) -> Result<Self> {
        config.validate().map_err(|e| anyhow!(e))?;

        let client = GeminiClient::from_key_or_env(config.genai.api_key.as_deref(), &config.genai.model)
            .map(|c| Arc::new(c) as Arc<dyn TextGenerator>);
        let queue = RequestQueue::spawn(client, QueuePolicy::from(&config.genai));
        let summaries = SummaryService::new(queue);

        Ok(Self {
            details: DetailLoader::new(Arc::clone(&provider), summaries),
            selection: SelectionController::new(config.transitions.clone()),
            provider,
        })
    }

    /// Fetch both catalogs and hand them to the selection layer.
    pub async fn load_catalog(&self) -> Result<(), DataError> {
        let sites = self.provider.list_sites().await?;
        let persons = self.provider.list_persons().await?;
        tracing::info!(sites = sites.len(), persons = persons.len(), "catalog loaded");
        self.selection.set_catalog(sites, persons);
        Ok(())
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub async fn site_view(&self, site_id: u32) -> DetailStatus<SiteView> {
        self.details.site_view(site_id).await
    }

    pub async fn person_view(&self, person_id: u32) -> DetailStatus<PersonView> {
        self.details.person_view(person_id).await
    }

    pub fn sites(&self) -> Vec<Site> {
        self.selection
            .filtered_items()
            .into_iter()
            .filter_map(|e| match e {
                crate::types::EntityRef::Site(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn persons(&self) -> Vec<Person> {
        self.selection
            .filtered_items()
            .into_iter()
            .filter_map(|e| match e {
                crate::types::EntityRef::Person(p) => Some(p),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MockProvider;

    #[tokio::test(start_paused = true)]
    async fn bootstrap_without_credential_still_serves_details() {
        let mut config = AtlasConfig::default();
        // Empty key pins the queue to fallback mode even if the ambient
        // environment carries a real credential.
        config.genai.api_key = Some(String::new());
        let atlas = Atlas::bootstrap(config, Arc::new(MockProvider::new()))
            .expect("valid default config");
        atlas.load_catalog().await.unwrap();

        assert!(!atlas.sites().is_empty());
        let view = match atlas.site_view(1).await {
            DetailStatus::Ready(v) => v,
            other => panic!("expected ready view, got {other:?}"),
        };
        assert!(!view.ai.summary.is_empty());
    }

    #[test]
    fn bootstrap_rejects_invalid_config() {
        let mut config = AtlasConfig::default();
        config.genai.model.clear();
        assert!(Atlas::bootstrap(config, Arc::new(MockProvider::new())).is_err());
    }
}
