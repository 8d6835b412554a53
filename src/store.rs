//! SQLite-backed article store with insert-if-absent semantics.
//!
//! One row per URL, enforced by a unique constraint plus `INSERT OR
//! IGNORE`: a duplicate insert is a reported no-op, never an update.
//! Retrieval composes equality, range, and substring predicates over a
//! whitelisted column set, with values always bound as parameters.
//! Every call runs as its own implicit transaction; no cross-call
//! transaction is exposed.

use crate::models::Article;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    date TEXT NOT NULL,
    province TEXT,
    city TEXT,
    keywords TEXT,
    summary TEXT,
    url TEXT NOT NULL UNIQUE
)";

const SELECT_COLUMNS: &str =
    "SELECT id, title, date, province, city, keywords, summary, url FROM articles";

/// The queryable columns of the `articles` table. Identifier whitelist:
/// SQL column names only ever come from this enum, never from input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    Title,
    Date,
    Province,
    City,
    Keywords,
    Summary,
    Url,
}

impl Column {
    fn as_sql(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Title => "title",
            Column::Date => "date",
            Column::Province => "province",
            Column::City => "city",
            Column::Keywords => "keywords",
            Column::Summary => "summary",
            Column::Url => "url",
        }
    }
}

/// A single filter condition. Range predicates compare as SQLite does for
/// the column's affinity; dates stored as ISO text order correctly.
#[derive(Debug, Clone)]
pub enum Predicate {
    Eq(Column, String),
    Ge(Column, String),
    Le(Column, String),
    Contains(Column, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Result ordering on a whitelisted column.
#[derive(Debug, Clone, Copy)]
pub struct Sort {
    pub column: Column,
    pub direction: Direction,
}

/// A persisted article row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct StoredArticle {
    pub id: i64,
    pub title: String,
    pub date: String,
    pub province: Option<String>,
    pub city: Option<String>,
    pub keywords: Option<String>,
    pub summary: Option<String>,
    pub url: String,
}

/// Handle to the articles database.
#[derive(Debug, Clone)]
pub struct ArticleStore {
    pool: SqlitePool,
}

impl ArticleStore {
    /// Open (creating if needed) the database at `path` and apply the
    /// schema.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::init(options).await
    }

    /// An in-memory store, used by tests.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        Self::init(SqliteConnectOptions::new().in_memory(true)).await
    }

    async fn init(options: SqliteConnectOptions) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Insert an article unless its URL is already present.
    ///
    /// Returns `true` when a row was inserted, `false` when the URL
    /// already existed (the stored row is left untouched). Multi-valued
    /// `province`/`city` strings from older producers are reduced to
    /// their first comma-separated component before storage.
    pub async fn upsert(&self, article: &Article) -> Result<bool, sqlx::Error> {
        let province = article.province.as_deref().map(first_component);
        let city = article.city.as_deref().map(first_component);

        let result = sqlx::query(
            "INSERT OR IGNORE INTO articles (title, date, province, city, keywords, summary, url)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&article.title)
        .bind(article.date.to_string())
        .bind(province)
        .bind(city)
        .bind(article.keywords.join(", "))
        .bind(&article.summary)
        .bind(&article.url)
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() > 0;
        debug!(url = %article.url, inserted, "upsert");
        Ok(inserted)
    }

    /// Fetch rows matching every predicate, optionally ordered.
    ///
    /// No predicates returns all rows in store order.
    pub async fn query(
        &self,
        predicates: &[Predicate],
        sort: Option<Sort>,
    ) -> Result<Vec<StoredArticle>, sqlx::Error> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);

        let mut separator = " WHERE ";
        for predicate in predicates {
            qb.push(separator);
            separator = " AND ";
            match predicate {
                Predicate::Eq(column, value) => {
                    qb.push(column.as_sql());
                    qb.push(" = ");
                    qb.push_bind(value.clone());
                }
                Predicate::Ge(column, value) => {
                    qb.push(column.as_sql());
                    qb.push(" >= ");
                    qb.push_bind(value.clone());
                }
                Predicate::Le(column, value) => {
                    qb.push(column.as_sql());
                    qb.push(" <= ");
                    qb.push_bind(value.clone());
                }
                Predicate::Contains(column, value) => {
                    qb.push(column.as_sql());
                    qb.push(" LIKE ");
                    qb.push_bind(format!("%{value}%"));
                }
            }
        }

        if let Some(sort) = sort {
            qb.push(" ORDER BY ");
            qb.push(sort.column.as_sql());
            qb.push(match sort.direction {
                Direction::Ascending => " ASC",
                Direction::Descending => " DESC",
            });
        }

        qb.build_query_as::<StoredArticle>()
            .fetch_all(&self.pool)
            .await
    }

    /// Delete rows by surrogate id. Unknown ids are ignored.
    pub async fn delete(&self, ids: &[i64]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM articles WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        qb.push(")");
        Ok(qb.build().execute(&self.pool).await?.rows_affected())
    }

    /// Remove every row.
    pub async fn delete_all(&self) -> Result<u64, sqlx::Error> {
        Ok(sqlx::query("DELETE FROM articles")
            .execute(&self.pool)
            .await?
            .rows_affected())
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await
    }
}

/// First comma-separated component, trimmed. The single-value guard for
/// `province`/`city`.
fn first_component(value: &str) -> String {
    value.split(',').next().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn article(url: &str, summary: &str) -> Article {
        Article {
            title: "深圳发布新能源政策".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            province: Some("广东".to_string()),
            city: Some("深圳".to_string()),
            keywords: vec!["新能源".to_string(), "补贴".to_string()],
            summary: summary.to_string(),
            url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_then_fetch_round_trip() {
        let store = ArticleStore::in_memory().await.unwrap();
        assert!(store.upsert(&article("https://n/a1", "摘要")).await.unwrap());

        let rows = store.query(&[], None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "深圳发布新能源政策");
        assert_eq!(rows[0].date, "2024-03-01");
        assert_eq!(rows[0].keywords.as_deref(), Some("新能源, 补贴"));
        assert_eq!(rows[0].url, "https://n/a1");
    }

    #[tokio::test]
    async fn test_duplicate_url_keeps_first_row() {
        let store = ArticleStore::in_memory().await.unwrap();
        assert!(store.upsert(&article("https://n/a1", "第一版摘要")).await.unwrap());
        // Second insert with the same URL but different content is a no-op.
        assert!(!store.upsert(&article("https://n/a1", "第二版摘要")).await.unwrap());

        let rows = store.query(&[], None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].summary.as_deref(), Some("第一版摘要"));
    }

    #[tokio::test]
    async fn test_multi_valued_location_reduced_to_first() {
        let store = ArticleStore::in_memory().await.unwrap();
        let mut a = article("https://n/a1", "摘要");
        a.province = Some("广东, 江苏".to_string());
        a.city = Some("深圳, 南京".to_string());
        store.upsert(&a).await.unwrap();

        let rows = store.query(&[], None).await.unwrap();
        assert_eq!(rows[0].province.as_deref(), Some("广东"));
        assert_eq!(rows[0].city.as_deref(), Some("深圳"));
        assert!(!rows[0].province.as_deref().unwrap().contains(','));
        assert!(!rows[0].city.as_deref().unwrap().contains(','));
    }

    #[tokio::test]
    async fn test_absent_location_stored_as_null() {
        let store = ArticleStore::in_memory().await.unwrap();
        let mut a = article("https://n/a1", "摘要");
        a.province = None;
        a.city = None;
        store.upsert(&a).await.unwrap();

        let rows = store.query(&[], None).await.unwrap();
        assert_eq!(rows[0].province, None);
        assert_eq!(rows[0].city, None);
    }

    #[tokio::test]
    async fn test_query_with_equality_and_range_predicates() {
        let store = ArticleStore::in_memory().await.unwrap();
        for (i, day) in [1, 2, 3, 4].iter().enumerate() {
            let mut a = article(&format!("https://n/a{i}"), "摘要");
            a.date = NaiveDate::from_ymd_opt(2024, 3, *day).unwrap();
            if i == 3 {
                a.province = Some("江苏".to_string());
            }
            store.upsert(&a).await.unwrap();
        }

        let in_range = store
            .query(
                &[
                    Predicate::Ge(Column::Date, "2024-03-02".to_string()),
                    Predicate::Le(Column::Date, "2024-03-03".to_string()),
                ],
                None,
            )
            .await
            .unwrap();
        assert_eq!(in_range.len(), 2);

        let jiangsu = store
            .query(&[Predicate::Eq(Column::Province, "江苏".to_string())], None)
            .await
            .unwrap();
        assert_eq!(jiangsu.len(), 1);
        assert_eq!(jiangsu[0].date, "2024-03-04");
    }

    #[tokio::test]
    async fn test_query_contains_predicate() {
        let store = ArticleStore::in_memory().await.unwrap();
        store.upsert(&article("https://n/a1", "摘要")).await.unwrap();

        let hits = store
            .query(
                &[Predicate::Contains(Column::Keywords, "补贴".to_string())],
                None,
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let misses = store
            .query(
                &[Predicate::Contains(Column::Keywords, "风电".to_string())],
                None,
            )
            .await
            .unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn test_query_sort_descending() {
        let store = ArticleStore::in_memory().await.unwrap();
        for (i, day) in [2, 4, 3].iter().enumerate() {
            let mut a = article(&format!("https://n/a{i}"), "摘要");
            a.date = NaiveDate::from_ymd_opt(2024, 3, *day).unwrap();
            store.upsert(&a).await.unwrap();
        }

        let rows = store
            .query(
                &[],
                Some(Sort {
                    column: Column::Date,
                    direction: Direction::Descending,
                }),
            )
            .await
            .unwrap();
        let dates: Vec<&str> = rows.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-04", "2024-03-03", "2024-03-02"]);
    }

    #[tokio::test]
    async fn test_delete_by_id_and_delete_all() {
        let store = ArticleStore::in_memory().await.unwrap();
        for i in 0..3 {
            store
                .upsert(&article(&format!("https://n/a{i}"), "摘要"))
                .await
                .unwrap();
        }
        let rows = store.query(&[], None).await.unwrap();
        assert_eq!(rows.len(), 3);

        let removed = store.delete(&[rows[0].id, rows[1].id]).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count().await.unwrap(), 1);

        assert_eq!(store.delete(&[]).await.unwrap(), 0);
        assert_eq!(store.delete_all().await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[test]
    fn test_first_component() {
        assert_eq!(first_component("广东, 江苏"), "广东");
        assert_eq!(first_component("广东"), "广东");
        assert_eq!(first_component(" 广东 "), "广东");
    }
}
