/// Google Books catalog source
///
/// API Flow:
/// 1. Search: /volumes?q= → list of volumes with nested `volumeInfo`
/// 2. Lookup: /volumes/{id} → single volume
///
/// Volume ids are used unchanged as external ids. Lookups refuse ids with
/// characters outside the volume-id alphabet.
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    models::{secure_url, Book},
    services::catalog::{is_google_volume_id, BookSource},
};

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleVolume {
    pub id: String,
    #[serde(rename = "volumeInfo")]
    pub volume_info: Option<VolumeInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub published_date: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub image_links: Option<ImageLinks>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLinks {
    pub thumbnail: Option<String>,
    pub small_thumbnail: Option<String>,
}

impl GoogleVolume {
    /// Canonical book, or `None` when the volume has no usable title
    pub fn into_book(self) -> Option<Book> {
        let info = self.volume_info?;
        let title = info.title.filter(|t| !t.trim().is_empty())?;
        if self.id.trim().is_empty() {
            return None;
        }

        let cover_url = info
            .image_links
            .and_then(|links| links.thumbnail.or(links.small_thumbnail))
            .map(|url| secure_url(&url));

        Some(Book {
            id: self.id,
            title,
            authors: info.authors,
            description: info.description.unwrap_or_default(),
            published_date: info.published_date.unwrap_or_default(),
            categories: info.categories,
            cover_url,
        })
    }
}

/// Converts a `/volumes` search payload, skipping items that fail validation
pub fn parse_search_response(body: &Value) -> Vec<Book> {
    body.get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    serde_json::from_value::<GoogleVolume>(item.clone())
                        .ok()
                        .and_then(GoogleVolume::into_book)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Clone)]
pub struct GoogleBooksSource {
    http_client: HttpClient,
    api_url: String,
    api_key: Option<String>,
    max_results: u32,
}

impl GoogleBooksSource {
    pub fn new(
        http_client: HttpClient,
        api_url: String,
        api_key: Option<String>,
        max_results: u32,
    ) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            max_results,
        }
    }

    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.query(&[("key", key.as_str())]),
            None => request,
        }
    }
}

#[async_trait::async_trait]
impl BookSource for GoogleBooksSource {
    async fn search(&self, query: &str) -> AppResult<Vec<Book>> {
        if query.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let url = format!("{}/volumes", self.api_url);
        let max_results = self.max_results.to_string();
        let request = self
            .http_client
            .get(&url)
            .query(&[("q", query), ("maxResults", max_results.as_str())]);

        let response = self.with_key(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Google Books API returned status {}: {}",
                status, body
            )));
        }

        let body: Value = response.json().await?;
        let books = parse_search_response(&body);

        tracing::info!(
            query = %query,
            results = books.len(),
            provider = "google_books",
            "Volume search completed"
        );

        Ok(books)
    }

    async fn fetch(&self, id: &str) -> AppResult<Option<Book>> {
        if !is_google_volume_id(id) {
            tracing::warn!(id = %id, "Rejected malformed Google Books volume id");
            return Ok(None);
        }

        let url = format!("{}/volumes/{}", self.api_url, id);
        let response = self.with_key(self.http_client.get(&url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Google Books API returned status {}: {}",
                status, body
            )));
        }

        let body: Value = response.json().await?;
        match serde_json::from_value::<GoogleVolume>(body) {
            Ok(volume) => Ok(volume.into_book()),
            Err(e) => {
                tracing::warn!(error = %e, id = %id, "Malformed Google Books volume");
                Ok(None)
            }
        }
    }

    fn name(&self) -> &'static str {
        "google_books"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_rejects_malformed_id_before_any_request() {
        // Nothing listens on the discard port; a request would fail with an error
        let source = GoogleBooksSource::new(
            HttpClient::new(),
            "http://127.0.0.1:9".to_string(),
            Some("secret".to_string()),
            20,
        );

        assert_eq!(source.fetch("../../../admin?secret=1").await.unwrap(), None);
        assert_eq!(source.fetch("a?b").await.unwrap(), None);
    }

    #[test]
    fn test_volume_to_book() {
        let volume: GoogleVolume = serde_json::from_value(json!({
            "id": "B1hSG45JCX4C",
            "volumeInfo": {
                "title": "Dune",
                "authors": ["Frank Herbert", "Brian Herbert"],
                "description": "Desert planet.",
                "publishedDate": "1965",
                "categories": ["Fiction"],
                "imageLinks": {
                    "smallThumbnail": "http://books.google.com/small.jpg",
                    "thumbnail": "http://books.google.com/thumb.jpg"
                }
            }
        }))
        .unwrap();

        let book = volume.into_book().unwrap();
        assert_eq!(book.id, "B1hSG45JCX4C");
        assert_eq!(book.authors, vec!["Frank Herbert", "Brian Herbert"]);
        assert_eq!(book.published_date, "1965");
        assert_eq!(book.categories, vec!["Fiction"]);
        assert_eq!(
            book.cover_url.as_deref(),
            Some("https://books.google.com/thumb.jpg")
        );
    }

    #[test]
    fn test_volume_falls_back_to_small_thumbnail() {
        let volume: GoogleVolume = serde_json::from_value(json!({
            "id": "x",
            "volumeInfo": {
                "title": "Emma",
                "imageLinks": { "smallThumbnail": "http://books.google.com/s.jpg" }
            }
        }))
        .unwrap();

        let book = volume.into_book().unwrap();
        assert_eq!(book.cover_url.as_deref(), Some("https://books.google.com/s.jpg"));
        assert!(book.authors.is_empty());
        assert_eq!(book.description, "");
    }

    #[test]
    fn test_volume_without_title_is_rejected() {
        let volume: GoogleVolume = serde_json::from_value(json!({
            "id": "x",
            "volumeInfo": { "authors": ["Someone"] }
        }))
        .unwrap();
        assert!(volume.into_book().is_none());

        let volume: GoogleVolume = serde_json::from_value(json!({ "id": "x" })).unwrap();
        assert!(volume.into_book().is_none());
    }

    #[test]
    fn test_parse_search_response_skips_malformed_items() {
        let body = json!({
            "totalItems": 3,
            "items": [
                { "id": "a", "volumeInfo": { "title": "Dune" } },
                { "volumeInfo": { "title": "No id" } },
                { "id": "c", "volumeInfo": { "title": "Dune Messiah", "authors": ["Frank Herbert"] } }
            ]
        });

        let books = parse_search_response(&body);
        let ids: Vec<&str> = books.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_parse_search_response_without_items() {
        assert!(parse_search_response(&json!({ "totalItems": 0 })).is_empty());
    }
}
