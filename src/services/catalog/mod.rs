/// External book catalogs
///
/// Each source converts its native response shape into the canonical `Book`.
/// `Catalog` fans a search out to both sources and routes id lookups to the
/// source that owns the id's namespace. Failures stop here: a lookup that fails
/// is a `None`, a search that fails is an empty list.
use std::sync::Arc;

use crate::{error::AppResult, models::Book};

pub mod google_books;
pub mod open_library;

pub use google_books::GoogleBooksSource;
pub use open_library::OpenLibrarySource;

/// A single external catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait BookSource: Send + Sync {
    /// Free-text search, in the source's own ranking order
    async fn search(&self, query: &str) -> AppResult<Vec<Book>>;

    /// Looks up one record. `Ok(None)` when the source reports not-found
    /// or returns a payload that does not describe a book.
    async fn fetch(&self, id: &str) -> AppResult<Option<Book>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Which catalog namespace an external id belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogId {
    /// OpenLibrary work or edition key, e.g. `OL27448W`
    OpenLibrary(String),
    /// Opaque Google Books volume id
    GoogleBooks(String),
}

impl CatalogId {
    /// Classifies an id by shape. OpenLibrary keys may arrive bare (`OL27448W`)
    /// or path-qualified (`/works/OL27448W`); both normalize to the bare key.
    /// Anything that is neither an OpenLibrary key nor a well-formed volume id
    /// is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let candidate = trimmed
            .strip_prefix("/works/")
            .or_else(|| trimmed.strip_prefix("/books/"))
            .unwrap_or(trimmed);

        if is_open_library_key(candidate) {
            Some(CatalogId::OpenLibrary(candidate.to_string()))
        } else if is_google_volume_id(trimmed) {
            Some(CatalogId::GoogleBooks(trimmed.to_string()))
        } else {
            None
        }
    }
}

/// `OL` + digits + `W` (work) or `M` (edition)
pub fn is_open_library_key(s: &str) -> bool {
    let Some(rest) = s.strip_prefix("OL") else {
        return false;
    };
    let Some(digits) = rest.strip_suffix('W').or_else(|| rest.strip_suffix('M')) else {
        return false;
    };
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Volume ids are URL-safe base64-ish tokens: ASCII letters, digits, `_` and `-`
pub fn is_google_volume_id(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Search results from both sources, each in native rank order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourcedResults {
    pub google_books: Vec<Book>,
    pub open_library: Vec<Book>,
}

/// Both catalogs behind one lookup and search surface
#[derive(Clone)]
pub struct Catalog {
    google_books: Arc<dyn BookSource>,
    open_library: Arc<dyn BookSource>,
}

impl Catalog {
    pub fn new(google_books: Arc<dyn BookSource>, open_library: Arc<dyn BookSource>) -> Self {
        Self {
            google_books,
            open_library,
        }
    }

    /// The source used for subject searches
    pub fn primary(&self) -> Arc<dyn BookSource> {
        self.google_books.clone()
    }

    /// Fetches one book from whichever source owns the id
    pub async fn fetch_by_id(&self, id: &str) -> Option<Book> {
        let (source, native_id) = match CatalogId::parse(id)? {
            CatalogId::OpenLibrary(key) => (&self.open_library, key),
            CatalogId::GoogleBooks(volume_id) => (&self.google_books, volume_id),
        };

        match source.fetch(&native_id).await {
            Ok(book) => book,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    id = %native_id,
                    provider = source.name(),
                    "Catalog lookup failed"
                );
                None
            }
        }
    }

    /// Queries both sources concurrently. A failing source contributes no results.
    pub async fn search(&self, query: &str) -> SourcedResults {
        let (google, open_library) = tokio::join!(
            self.google_books.search(query),
            self.open_library.search(query)
        );

        SourcedResults {
            google_books: settle(self.google_books.name(), query, google),
            open_library: settle(self.open_library.name(), query, open_library),
        }
    }

    /// Searches both sources and merges them into one duplicate-free list
    pub async fn search_merged(&self, query: &str) -> Vec<Book> {
        let results = self.search(query).await;
        let merged = crate::services::dedup::merge(results.google_books, results.open_library);

        tracing::info!(query = %query, results = merged.len(), "Merged catalog search");
        merged
    }
}

fn settle(provider: &'static str, query: &str, result: AppResult<Vec<Book>>) -> Vec<Book> {
    match result {
        Ok(books) => {
            tracing::debug!(provider, query = %query, results = books.len(), "Catalog search completed");
            books
        }
        Err(e) => {
            tracing::warn!(provider, query = %query, error = %e, "Catalog search failed, continuing without it");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn book(id: &str, title: &str, author: &str) -> Book {
        Book {
            id: id.to_string(),
            title: title.to_string(),
            authors: vec![author.to_string()],
            description: String::new(),
            published_date: String::new(),
            categories: vec![],
            cover_url: None,
        }
    }

    fn mock_source(name: &'static str) -> MockBookSource {
        let mut source = MockBookSource::new();
        source.expect_name().return_const(name);
        source
    }

    #[test]
    fn test_catalog_id_open_library_forms() {
        assert_eq!(
            CatalogId::parse("OL27448W"),
            Some(CatalogId::OpenLibrary("OL27448W".to_string()))
        );
        assert_eq!(
            CatalogId::parse("/works/OL27448W"),
            Some(CatalogId::OpenLibrary("OL27448W".to_string()))
        );
        assert_eq!(
            CatalogId::parse("/books/OL7353617M"),
            Some(CatalogId::OpenLibrary("OL7353617M".to_string()))
        );
    }

    #[test]
    fn test_catalog_id_google_books() {
        assert_eq!(
            CatalogId::parse("zyTCAlFPjgYC"),
            Some(CatalogId::GoogleBooks("zyTCAlFPjgYC".to_string()))
        );
        // Looks like OL but is not a key
        assert_eq!(
            CatalogId::parse("OLdW"),
            Some(CatalogId::GoogleBooks("OLdW".to_string()))
        );
    }

    #[test]
    fn test_catalog_id_rejects_blank_and_unknown_paths() {
        assert_eq!(CatalogId::parse("   "), None);
        assert_eq!(CatalogId::parse("/authors/OL1A"), None);
    }

    #[test]
    fn test_catalog_id_rejects_path_and_query_characters() {
        assert_eq!(CatalogId::parse("../x"), None);
        assert_eq!(CatalogId::parse("a?b"), None);
        assert_eq!(CatalogId::parse("../../../admin?secret=1"), None);
        assert_eq!(CatalogId::parse("abc/def"), None);
        assert_eq!(CatalogId::parse("abc#frag"), None);
        assert_eq!(
            CatalogId::parse("B1hS-G45_JCX4C"),
            Some(CatalogId::GoogleBooks("B1hS-G45_JCX4C".to_string()))
        );
    }

    #[tokio::test]
    async fn test_fetch_with_malformed_id_never_reaches_a_source() {
        let mut google = mock_source("google_books");
        google.expect_fetch().never();
        let mut open_library = mock_source("open_library");
        open_library.expect_fetch().never();

        let catalog = Catalog::new(Arc::new(google), Arc::new(open_library));
        assert!(catalog.fetch_by_id("../../../admin?secret=1").await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_dispatches_by_namespace() {
        let mut google = mock_source("google_books");
        google.expect_fetch().never();

        let mut open_library = mock_source("open_library");
        open_library
            .expect_fetch()
            .withf(|id| id == "OL1W")
            .times(1)
            .returning(|_| Ok(Some(book("OL1W", "Dune", "Frank Herbert"))));

        let catalog = Catalog::new(Arc::new(google), Arc::new(open_library));
        let found = catalog.fetch_by_id("/works/OL1W").await.unwrap();
        assert_eq!(found.title, "Dune");
    }

    #[tokio::test]
    async fn test_fetch_error_becomes_none() {
        let mut google = mock_source("google_books");
        google
            .expect_fetch()
            .returning(|_| Err(AppError::ExternalApi("boom".to_string())));
        let open_library = mock_source("open_library");

        let catalog = Catalog::new(Arc::new(google), Arc::new(open_library));
        assert!(catalog.fetch_by_id("abc123").await.is_none());
    }

    #[tokio::test]
    async fn test_search_tolerates_one_failing_source() {
        let mut google = mock_source("google_books");
        google
            .expect_search()
            .returning(|_| Err(AppError::ExternalApi("quota".to_string())));

        let mut open_library = mock_source("open_library");
        open_library
            .expect_search()
            .returning(|_| Ok(vec![book("OL1W", "Dune", "Frank Herbert")]));

        let catalog = Catalog::new(Arc::new(google), Arc::new(open_library));
        let results = catalog.search("dune").await;

        assert!(results.google_books.is_empty());
        assert_eq!(results.open_library.len(), 1);
    }

    #[tokio::test]
    async fn test_search_merged_prefers_google_books_record() {
        let mut google = mock_source("google_books");
        google
            .expect_search()
            .returning(|_| Ok(vec![book("g1", "Dune", "Frank Herbert")]));

        let mut open_library = mock_source("open_library");
        open_library.expect_search().returning(|_| {
            Ok(vec![
                book("OL1W", "Dune", "Frank Herbert"),
                book("OL2W", "Neuromancer", "William Gibson"),
            ])
        });

        let catalog = Catalog::new(Arc::new(google), Arc::new(open_library));
        let merged = catalog.search_merged("dune").await;

        let ids: Vec<&str> = merged.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["g1", "OL2W"]);
    }
}
