/// OpenLibrary catalog source
///
/// Search documents are flat (`author_name`, `cover_i`, `subject`); work records
/// only reference their authors by key, so a lookup resolves names with one
/// extra request per author. External ids are bare work/edition keys (`OL27448W`).
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    models::Book,
    services::catalog::{is_open_library_key, BookSource},
};

const SEARCH_FIELDS: &str = "key,title,author_name,first_publish_year,subject,cover_i";

/// Cover image URL for an OpenLibrary cover id
pub fn cover_url(cover_id: i64) -> String {
    format!("https://covers.openlibrary.org/b/id/{}-L.jpg", cover_id)
}

/// Strips `/works/` or `/books/` from a record key
fn bare_key(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// One document from `/search.json`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchDoc {
    pub key: String,
    pub title: Option<String>,
    #[serde(default)]
    pub author_name: Vec<String>,
    pub first_publish_year: Option<i64>,
    #[serde(default)]
    pub subject: Vec<String>,
    pub cover_i: Option<i64>,
}

impl SearchDoc {
    pub fn into_book(self) -> Option<Book> {
        let title = self.title.filter(|t| !t.trim().is_empty())?;
        let id = bare_key(&self.key);
        if !is_open_library_key(id) {
            return None;
        }

        Some(Book {
            id: id.to_string(),
            title,
            authors: self.author_name,
            description: String::new(),
            published_date: self
                .first_publish_year
                .map(|year| year.to_string())
                .unwrap_or_default(),
            categories: self.subject,
            cover_url: self.cover_i.filter(|id| *id > 0).map(cover_url),
        })
    }
}

/// Descriptions are either a bare string or `{ "type": ..., "value": ... }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TextField {
    Plain(String),
    Typed { value: String },
}

impl TextField {
    pub fn into_string(self) -> String {
        match self {
            TextField::Plain(s) => s,
            TextField::Typed { value } => value,
        }
    }
}

/// Author reference on a work (`{author: {key}}`) or an edition (`{key}`)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AuthorRef {
    Work { author: KeyRef },
    Edition { key: String },
}

impl AuthorRef {
    pub fn key(&self) -> &str {
        match self {
            AuthorRef::Work { author } => &author.key,
            AuthorRef::Edition { key } => key,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyRef {
    pub key: String,
}

/// A work (`/works/{key}.json`) or edition (`/books/{key}.json`) record
#[derive(Debug, Clone, Deserialize)]
pub struct WorkRecord {
    pub key: String,
    pub title: Option<String>,
    pub description: Option<TextField>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub covers: Vec<i64>,
    pub first_publish_date: Option<String>,
    pub publish_date: Option<String>,
    #[serde(default)]
    pub authors: Vec<AuthorRef>,
}

impl WorkRecord {
    /// Canonical book using already-resolved author names
    pub fn into_book(self, authors: Vec<String>) -> Option<Book> {
        let title = self.title.filter(|t| !t.trim().is_empty())?;
        let id = bare_key(&self.key);
        if !is_open_library_key(id) {
            return None;
        }

        Some(Book {
            id: id.to_string(),
            title,
            authors,
            description: self
                .description
                .map(TextField::into_string)
                .unwrap_or_default(),
            published_date: self
                .first_publish_date
                .or(self.publish_date)
                .unwrap_or_default(),
            categories: self.subjects,
            cover_url: self
                .covers
                .iter()
                .copied()
                .find(|id| *id > 0)
                .map(cover_url),
        })
    }
}

/// Converts a `/search.json` payload, skipping documents that fail validation
pub fn parse_search_response(body: &Value) -> Vec<Book> {
    body.get("docs")
        .and_then(Value::as_array)
        .map(|docs| {
            docs.iter()
                .filter_map(|doc| {
                    serde_json::from_value::<SearchDoc>(doc.clone())
                        .ok()
                        .and_then(SearchDoc::into_book)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Clone)]
pub struct OpenLibrarySource {
    http_client: HttpClient,
    api_url: String,
    limit: u32,
}

impl OpenLibrarySource {
    pub fn new(http_client: HttpClient, api_url: String, limit: u32) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            limit,
        }
    }

    /// Resolves author names in listed order. Authors that cannot be fetched are skipped.
    async fn resolve_authors(&self, refs: &[AuthorRef]) -> Vec<String> {
        let mut names = Vec::with_capacity(refs.len());
        for author in refs {
            let url = format!("{}{}.json", self.api_url, author.key());
            match self.fetch_author_name(&url).await {
                Ok(Some(name)) => names.push(name),
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(error = %e, author = %author.key(), "Author lookup failed");
                }
            }
        }
        names
    }

    async fn fetch_author_name(&self, url: &str) -> AppResult<Option<String>> {
        let response = self.http_client.get(url).send().await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        let body: Value = response.json().await?;
        Ok(body
            .get("name")
            .and_then(Value::as_str)
            .map(ToOwned::to_owned))
    }
}

#[async_trait::async_trait]
impl BookSource for OpenLibrarySource {
    async fn search(&self, query: &str) -> AppResult<Vec<Book>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let url = format!("{}/search.json", self.api_url);
        let limit = self.limit.to_string();

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("q", query),
                ("limit", limit.as_str()),
                ("fields", SEARCH_FIELDS),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "OpenLibrary API returned status {}: {}",
                status, body
            )));
        }

        let body: Value = response.json().await?;
        let books = parse_search_response(&body);

        tracing::info!(
            query = %query,
            results = books.len(),
            provider = "open_library",
            "Work search completed"
        );

        Ok(books)
    }

    async fn fetch(&self, id: &str) -> AppResult<Option<Book>> {
        let collection = if id.ends_with('M') { "books" } else { "works" };
        let url = format!("{}/{}/{}.json", self.api_url, collection, id);

        let response = self.http_client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "OpenLibrary API returned status {}: {}",
                status, body
            )));
        }

        let body: Value = response.json().await?;
        let work = match serde_json::from_value::<WorkRecord>(body) {
            Ok(work) => work,
            Err(e) => {
                tracing::warn!(error = %e, id = %id, "Malformed OpenLibrary record");
                return Ok(None);
            }
        };

        let authors = self.resolve_authors(&work.authors).await;
        Ok(work.into_book(authors))
    }

    fn name(&self) -> &'static str {
        "open_library"
    }
}
