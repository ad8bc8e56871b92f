//! Categories and tags. Both are a name plus a unique slug.

use serde::Serialize;
use sqlx::SqliteConnection;
use sqlx::sqlite::SqlitePool;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Clone)]
pub struct CategoryStore {
    pool: SqlitePool,
}

impl CategoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List all categories by name.
    pub async fn list(&self) -> Result<Vec<Category>, sqlx::Error> {
        sqlx::query_as("SELECT id, name, slug FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, sqlx::Error> {
        sqlx::query_as("SELECT id, name, slug FROM categories WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
    }

    /// Find a category by slug, creating it on first use.
    pub(crate) async fn get_or_create(
        conn: &mut SqliteConnection,
        name: &str,
        slug: &str,
    ) -> Result<Category, sqlx::Error> {
        sqlx::query("INSERT INTO categories (name, slug) VALUES (?, ?) ON CONFLICT(slug) DO NOTHING")
            .bind(name)
            .bind(slug)
            .execute(&mut *conn)
            .await?;
        sqlx::query_as("SELECT id, name, slug FROM categories WHERE slug = ?")
            .bind(slug)
            .fetch_one(&mut *conn)
            .await
    }
}

#[derive(Clone)]
pub struct TagStore {
    pool: SqlitePool,
}

impl TagStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List all tags by name.
    pub async fn list(&self) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as("SELECT id, name, slug FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await
    }

    /// Tags attached to a post, by name.
    pub async fn list_for_post(&self, post_id: i64) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as(
            "SELECT t.id, t.name, t.slug FROM tags t
             JOIN post_tags pt ON pt.tag_id = t.id
             WHERE pt.post_id = ?
             ORDER BY t.name",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Find a tag by slug, creating it on first use.
    pub(crate) async fn get_or_create(
        conn: &mut SqliteConnection,
        name: &str,
        slug: &str,
    ) -> Result<Tag, sqlx::Error> {
        sqlx::query("INSERT INTO tags (name, slug) VALUES (?, ?) ON CONFLICT(slug) DO NOTHING")
            .bind(name)
            .bind(slug)
            .execute(&mut *conn)
            .await?;
        sqlx::query_as("SELECT id, name, slug FROM tags WHERE slug = ?")
            .bind(slug)
            .fetch_one(&mut *conn)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let db = Database::open(":memory:").await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let a = CategoryStore::get_or_create(&mut conn, "Rust", "rust")
            .await
            .unwrap();
        let b = CategoryStore::get_or_create(&mut conn, "RUST!", "rust")
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(b.name, "Rust");

        let t1 = TagStore::get_or_create(&mut conn, "Async", "async")
            .await
            .unwrap();
        let t2 = TagStore::get_or_create(&mut conn, "Web", "web").await.unwrap();
        assert_ne!(t1.id, t2.id);
        drop(conn);

        assert_eq!(db.categories().list().await.unwrap().len(), 1);
        let tags = db.tags().list().await.unwrap();
        assert_eq!(
            tags.iter().map(|t| t.slug.as_str()).collect::<Vec<_>>(),
            ["async", "web"]
        );
        assert!(db.categories().get_by_slug("rust").await.unwrap().is_some());
        assert!(db.categories().get_by_slug("go").await.unwrap().is_none());
    }
}
