use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author shown when a catalog record carries no author
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Genre stored when no category could be determined
pub const UNKNOWN_GENRE: &str = "Unknown";

/// Canonical book record produced by the catalog adapters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Source-qualified external identifier (Google Books volume id or OpenLibrary work key)
    pub id: String,
    pub title: String,
    /// Authors in the order the source lists them
    pub authors: Vec<String>,
    pub description: String,
    /// Free-form year or date text, never parsed
    pub published_date: String,
    /// Subject tags, most relevant first
    pub categories: Vec<String>,
    /// Always https when present
    pub cover_url: Option<String>,
}

impl Book {
    /// First listed author, or "Unknown Author"
    pub fn primary_author(&self) -> &str {
        self.authors
            .first()
            .map(String::as_str)
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(UNKNOWN_AUTHOR)
    }

    /// First non-blank category
    pub fn primary_category(&self) -> Option<&str> {
        self.categories
            .iter()
            .map(|c| c.trim())
            .find(|c| !c.is_empty())
    }
}

/// Narrow projection of a book returned by the recommendation endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedBook {
    pub external_id: String,
    pub title: String,
    pub author: String,
    pub cover_url: Option<String>,
}

impl From<&Book> for RecommendedBook {
    fn from(book: &Book) -> Self {
        Self {
            external_id: book.id.clone(),
            title: book.title.clone(),
            author: book.primary_author().to_string(),
            cover_url: book.cover_url.clone(),
        }
    }
}

/// Book row as persisted for user-owned data
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredBook {
    pub id: Uuid,
    pub external_id: String,
    pub title: String,
    pub author: String,
    pub cover_url: Option<String>,
    pub genre: String,
}

/// Book fields supplied when creating or refreshing a stored book
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub external_id: String,
    pub title: String,
    pub author: String,
    pub cover_url: Option<String>,
    pub genre: String,
}

/// Rewrites plain-http URLs to https. Other schemes are left alone.
pub fn secure_url(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(authors: &[&str]) -> Book {
        Book {
            id: "abc".to_string(),
            title: "Dune".to_string(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            description: String::new(),
            published_date: "1965".to_string(),
            categories: vec!["".to_string(), "Fiction".to_string()],
            cover_url: None,
        }
    }

    #[test]
    fn test_primary_author() {
        assert_eq!(book(&["Frank Herbert", "Brian Herbert"]).primary_author(), "Frank Herbert");
        assert_eq!(book(&[]).primary_author(), UNKNOWN_AUTHOR);
    }

    #[test]
    fn test_primary_category_skips_blank() {
        assert_eq!(book(&[]).primary_category(), Some("Fiction"));
    }

    #[test]
    fn test_recommended_book_projection() {
        let rec = RecommendedBook::from(&book(&[]));
        assert_eq!(rec.external_id, "abc");
        assert_eq!(rec.author, UNKNOWN_AUTHOR);

        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["externalId"], "abc");
        assert!(json["coverUrl"].is_null());
    }

    #[test]
    fn test_secure_url() {
        assert_eq!(
            secure_url("http://books.google.com/cover.jpg"),
            "https://books.google.com/cover.jpg"
        );
        assert_eq!(
            secure_url("https://covers.openlibrary.org/b/id/1-L.jpg"),
            "https://covers.openlibrary.org/b/id/1-L.jpg"
        );
    }
}
