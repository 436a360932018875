use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

use crate::{
    db::BookStore,
    error::{AppError, AppResult},
    models::{
        HistoryEntry, NewBook, Quote, RatingSummary, Review, ReviewWithUser, ShelfCounts,
        ShelfStatus, StoredBook, UserProfile, UNKNOWN_AUTHOR, UNKNOWN_GENRE,
    },
};

/// Creates a PostgreSQL connection pool and applies pending migrations
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

#[derive(FromRow)]
struct BookRow {
    id: Uuid,
    external_id: String,
    title: String,
    author: String,
    cover_url: Option<String>,
    genre: String,
}

impl From<BookRow> for StoredBook {
    fn from(row: BookRow) -> Self {
        Self {
            id: row.id,
            external_id: row.external_id,
            title: row.title,
            author: row.author,
            cover_url: row.cover_url,
            genre: row.genre,
        }
    }
}

#[derive(FromRow)]
struct HistoryRow {
    external_id: String,
    genre: String,
    status: String,
}

#[derive(FromRow)]
struct ReviewRow {
    id: Uuid,
    user_id: String,
    book_id: Uuid,
    content: String,
    rating: i32,
    created_at: DateTime<Utc>,
    user_name: Option<String>,
    user_image_url: Option<String>,
}

#[derive(FromRow)]
struct QuoteRow {
    id: Uuid,
    user_id: String,
    book_id: Uuid,
    content: String,
    page: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<QuoteRow> for Quote {
    fn from(row: QuoteRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            book_id: row.book_id,
            content: row.content,
            page: row.page,
            created_at: row.created_at,
        }
    }
}

fn parse_status(raw: &str) -> AppResult<ShelfStatus> {
    raw.parse()
        .map_err(|e| AppError::Internal(format!("Corrupt shelf status in database: {}", e)))
}

/// `BookStore` backed by PostgreSQL
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl BookStore for PostgresStore {
    async fn upsert_user(&self, user: &UserProfile) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, image_url)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name, image_url = EXCLUDED.image_url
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.image_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_book(&self, book: &NewBook) -> AppResult<StoredBook> {
        let row = sqlx::query_as::<_, BookRow>(
            r#"
            INSERT INTO books (id, external_id, title, author, cover_url, genre)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (external_id) DO UPDATE
            SET title = EXCLUDED.title,
                author = CASE WHEN EXCLUDED.author = $7 THEN books.author ELSE EXCLUDED.author END,
                cover_url = COALESCE(EXCLUDED.cover_url, books.cover_url),
                genre = CASE WHEN EXCLUDED.genre = $8 THEN books.genre ELSE EXCLUDED.genre END
            RETURNING id, external_id, title, author, cover_url, genre
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&book.external_id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.cover_url)
        .bind(&book.genre)
        .bind(UNKNOWN_AUTHOR)
        .bind(UNKNOWN_GENRE)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_book(&self, external_id: &str) -> AppResult<Option<StoredBook>> {
        let row = sqlx::query_as::<_, BookRow>(
            r#"
            SELECT id, external_id, title, author, cover_url, genre
            FROM books
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StoredBook::from))
    }

    async fn upsert_shelf_status(
        &self,
        user_id: &str,
        book_id: Uuid,
        status: ShelfStatus,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_books (user_id, book_id, status, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (user_id, book_id) DO UPDATE
            SET status = EXCLUDED.status, updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn shelf_status(&self, user_id: &str, book_id: Uuid) -> AppResult<Option<ShelfStatus>> {
        let status: Option<String> = sqlx::query_scalar(
            "SELECT status FROM user_books WHERE user_id = $1 AND book_id = $2",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;

        status.as_deref().map(parse_status).transpose()
    }

    async fn user_history(&self, user_id: &str) -> AppResult<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r#"
            SELECT b.external_id, b.genre, ub.status
            FROM user_books ub
            JOIN books b ON b.id = ub.book_id
            WHERE ub.user_id = $1 AND ub.status IN ('read', 'reading')
            ORDER BY ub.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(HistoryEntry {
                    status: parse_status(&row.status)?,
                    external_id: row.external_id,
                    genre: row.genre,
                })
            })
            .collect()
    }

    async fn shelf_counts(&self, user_id: &str) -> AppResult<ShelfCounts> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM user_books WHERE user_id = $1 GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = ShelfCounts::default();
        for (status, count) in rows {
            counts.add(parse_status(&status)?, count);
        }
        Ok(counts)
    }

    async fn upsert_rating(&self, user_id: &str, book_id: Uuid, value: i32) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ratings (user_id, book_id, value, updated_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (user_id, book_id) DO UPDATE
            SET value = EXCLUDED.value, updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn rating_summary(&self, book_id: Uuid) -> AppResult<RatingSummary> {
        let (average, count): (Option<f64>, i64) = sqlx::query_as(
            "SELECT AVG(value)::float8, COUNT(*) FROM ratings WHERE book_id = $1",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(RatingSummary {
            average: average.unwrap_or(0.0),
            count,
        })
    }

    async fn ratings_by_user(&self, user_id: &str) -> AppResult<Vec<i32>> {
        let values = sqlx::query_scalar("SELECT value FROM ratings WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(values)
    }

    async fn create_review(
        &self,
        user_id: &str,
        book_id: Uuid,
        content: &str,
        rating: i32,
    ) -> AppResult<Review> {
        let review = Review {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            book_id,
            content: content.to_string(),
            rating,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO reviews (id, user_id, book_id, content, rating, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(review.id)
        .bind(&review.user_id)
        .bind(review.book_id)
        .bind(&review.content)
        .bind(review.rating)
        .bind(review.created_at)
        .execute(&self.pool)
        .await?;

        Ok(review)
    }

    async fn reviews_for_book(&self, book_id: Uuid) -> AppResult<Vec<ReviewWithUser>> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT r.id, r.user_id, r.book_id, r.content, r.rating, r.created_at,
                   u.name AS user_name, u.image_url AS user_image_url
            FROM reviews r
            LEFT JOIN users u ON u.id = r.user_id
            WHERE r.book_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ReviewWithUser {
                user: UserProfile {
                    id: row.user_id.clone(),
                    name: row.user_name,
                    image_url: row.user_image_url,
                },
                review: Review {
                    id: row.id,
                    user_id: row.user_id,
                    book_id: row.book_id,
                    content: row.content,
                    rating: row.rating,
                    created_at: row.created_at,
                },
            })
            .collect())
    }

    async fn add_quote(
        &self,
        user_id: &str,
        book_id: Uuid,
        content: &str,
        page: Option<i32>,
    ) -> AppResult<Quote> {
        let row = sqlx::query_as::<_, QuoteRow>(
            r#"
            INSERT INTO quotes (id, user_id, book_id, content, page)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, book_id, content, page, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(book_id)
        .bind(content)
        .bind(page)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn quotes_for_user(&self, user_id: &str, book_id: Option<Uuid>) -> AppResult<Vec<Quote>> {
        let rows = sqlx::query_as::<_, QuoteRow>(
            r#"
            SELECT id, user_id, book_id, content, page, created_at
            FROM quotes
            WHERE user_id = $1 AND ($2::uuid IS NULL OR book_id = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Quote::from).collect())
    }

    async fn delete_quote(&self, user_id: &str, quote_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM quotes WHERE id = $1 AND user_id = $2")
            .bind(quote_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
