use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct CommentStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub content: String,
    pub created_at: String,
}

impl CommentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Add a comment to a post. Returns the comment ID.
    pub async fn create(
        &self,
        post_id: i64,
        author_id: i64,
        content: &str,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO comments (post_id, author_id, content) VALUES (?, ?, ?)")
                .bind(post_id)
                .bind(author_id)
                .bind(content)
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as(
            "SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.content, c.created_at
             FROM comments c JOIN users u ON u.id = c.author_id
             WHERE c.id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Comments on a post, oldest first.
    pub async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>, sqlx::Error> {
        sqlx::query_as(
            "SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.content, c.created_at
             FROM comments c JOIN users u ON u.id = c.author_id
             WHERE c.post_id = ?
             ORDER BY c.created_at ASC, c.id ASC",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
    }
}
