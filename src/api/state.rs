use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::{AuthMode, Config},
    db::BookStore,
    middleware::{FixedIdentity, HeaderIdentity, IdentityResolver},
    services::{
        catalog::{GoogleBooksSource, OpenLibrarySource},
        generative::GeminiClient,
        Catalog, GenerativeClient, Recommender,
    },
};

/// Shared application state
///
/// Holds only handles to external collaborators; nothing here is mutated
/// per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BookStore>,
    pub catalog: Catalog,
    pub recommender: Recommender,
    /// `None` when no generative API key is configured
    pub generative: Option<Arc<dyn GenerativeClient>>,
    pub identity: Arc<dyn IdentityResolver>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn BookStore>,
        catalog: Catalog,
        generative: Option<Arc<dyn GenerativeClient>>,
        identity: Arc<dyn IdentityResolver>,
        recommendation_count: usize,
    ) -> Self {
        let recommender = Recommender::new(store.clone(), catalog.primary(), recommendation_count);
        Self {
            store,
            catalog,
            recommender,
            generative,
            identity,
        }
    }

    /// Wires the real catalog, generative and identity collaborators around `store`
    pub fn from_config(config: &Config, store: Arc<dyn BookStore>) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(concat!("shelfwise-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let google_books = GoogleBooksSource::new(
            http_client.clone(),
            config.google_books_api_url.clone(),
            config.google_books_api_key.clone(),
            config.search_result_limit,
        );
        let open_library = OpenLibrarySource::new(
            http_client.clone(),
            config.open_library_api_url.clone(),
            config.search_result_limit,
        );
        let catalog = Catalog::new(Arc::new(google_books), Arc::new(open_library));

        let generative: Option<Arc<dyn GenerativeClient>> =
            match config.generative_api_key.as_deref().filter(|k| !k.trim().is_empty()) {
                Some(key) => Some(Arc::new(GeminiClient::new(
                    http_client,
                    config.generative_api_url.clone(),
                    key.to_string(),
                    config.generative_model.clone(),
                ))),
                None => {
                    tracing::warn!("GENERATIVE_API_KEY not set, chat and insights are disabled");
                    None
                }
            };

        let identity: Arc<dyn IdentityResolver> = match config.auth_mode {
            AuthMode::Header => Arc::new(HeaderIdentity),
            AuthMode::Fixed => {
                let user_id = config
                    .dev_user_id
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("AUTH_MODE=fixed requires DEV_USER_ID"))?;
                tracing::warn!(user_id = %user_id, "Fixed identity enabled, every request runs as this user");
                Arc::new(FixedIdentity::new(user_id))
            }
        };

        Ok(Self::new(
            store,
            catalog,
            generative,
            identity,
            config.recommendation_count,
        ))
    }
}
