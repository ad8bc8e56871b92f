//! Blog posts with their author, category and tags.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

use super::taxonomy::{Category, CategoryStore, Tag, TagStore};

#[derive(Clone)]
pub struct PostStore {
    pool: SqlitePool,
}

/// Publication status of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "published" => PostStatus::Published,
            _ => PostStatus::Draft,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub status: PostStatus,
    pub author_id: i64,
    pub author_username: String,
    pub author_full_name: String,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    slug: String,
    content: String,
    status: String,
    author_id: i64,
    author_username: String,
    author_full_name: String,
    category_id: Option<i64>,
    category_name: Option<String>,
    category_slug: Option<String>,
    published_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        let category = match (row.category_id, row.category_name, row.category_slug) {
            (Some(id), Some(name), Some(slug)) => Some(Category { id, name, slug }),
            _ => None,
        };
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            content: row.content,
            status: PostStatus::from_str(&row.status),
            author_id: row.author_id,
            author_username: row.author_username,
            author_full_name: row.author_full_name,
            category,
            tags: Vec::new(),
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostTagRow {
    post_id: i64,
    id: i64,
    name: String,
    slug: String,
}

/// A post to insert. Category and tags are `(name, slug)` pairs,
/// created on first use.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub author_id: i64,
    pub category: Option<(String, String)>,
    pub tags: Vec<(String, String)>,
    pub status: PostStatus,
}

macro_rules! post_select {
    () => {
        "SELECT p.id, p.title, p.slug, p.content, p.status, p.author_id,
        u.username AS author_username, u.full_name AS author_full_name,
        c.id AS category_id, c.name AS category_name, c.slug AS category_slug,
        p.published_at, p.created_at, p.updated_at
     FROM posts p
     JOIN users u ON u.id = p.author_id
     LEFT JOIN categories c ON c.id = p.category_id"
    };
}

impl PostStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a post with its category and tags. Returns the post ID.
    pub async fn create(&self, post: &NewPost) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let category_id = match &post.category {
            Some((name, slug)) => Some(CategoryStore::get_or_create(&mut tx, name, slug).await?.id),
            None => None,
        };

        let result = sqlx::query(
            "INSERT INTO posts (title, slug, content, status, author_id, category_id, published_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6,
                     CASE WHEN ?4 = 'published' THEN datetime('now') END)",
        )
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.content)
        .bind(post.status.as_str())
        .bind(post.author_id)
        .bind(category_id)
        .execute(&mut *tx)
        .await?;
        let post_id = result.last_insert_rowid();

        for (name, slug) in &post.tags {
            let tag = TagStore::get_or_create(&mut tx, name, slug).await?;
            sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
                .bind(post_id)
                .bind(tag.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(post_id)
    }

    /// Get a post by ID regardless of status.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Post>, sqlx::Error> {
        let row: Option<PostRow> = sqlx::query_as(concat!(post_select!(), " WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        self.with_tags(row).await
    }

    /// Get a published post by slug.
    pub async fn get_published_by_slug(&self, slug: &str) -> Result<Option<Post>, sqlx::Error> {
        let row: Option<PostRow> = sqlx::query_as(concat!(
            post_select!(),
            " WHERE p.slug = ? AND p.status = 'published'"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        self.with_tags(row).await
    }

    async fn with_tags(&self, row: Option<PostRow>) -> Result<Option<Post>, sqlx::Error> {
        let Some(row) = row else {
            return Ok(None);
        };
        let mut post = Post::from(row);
        post.tags = TagStore::new(self.pool.clone())
            .list_for_post(post.id)
            .await?;
        Ok(Some(post))
    }

    /// List published posts, newest first.
    pub async fn list_published(&self) -> Result<Vec<Post>, sqlx::Error> {
        let rows: Vec<PostRow> = sqlx::query_as(concat!(
            post_select!(),
            " WHERE p.status = 'published' ORDER BY p.published_at DESC, p.id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let tag_rows: Vec<PostTagRow> = sqlx::query_as(
            "SELECT pt.post_id, t.id, t.name, t.slug FROM post_tags pt
             JOIN tags t ON t.id = pt.tag_id
             JOIN posts p ON p.id = pt.post_id
             WHERE p.status = 'published'
             ORDER BY t.name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
        for row in tag_rows {
            tags.entry(row.post_id).or_default().push(Tag {
                id: row.id,
                name: row.name,
                slug: row.slug,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut post = Post::from(row);
                post.tags = tags.remove(&post.id).unwrap_or_default();
                post
            })
            .collect())
    }

    /// Whether any post, published or not, uses this slug.
    pub async fn slug_exists(&self, slug: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM posts WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}
