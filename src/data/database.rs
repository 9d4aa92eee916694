//! SQLite database operations
//!
//! All database access goes through this module.
//! Relationship sets are edge tables, so each follow or like is a single
//! row that both of its sides are projected from.

use chrono::Utc;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;
use crate::metrics::DB_QUERIES_TOTAL;

/// SQLite limits host parameters per statement; IN lists are chunked.
const IN_CLAUSE_CHUNK: usize = 100;

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

/// Map a unique-constraint violation to a validation error.
fn map_unique_violation(error: sqlx::Error, message: &str) -> AppError {
    match &error {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            AppError::Validation(message.to_string())
        }
        _ => AppError::Database(error),
    }
}

/// Map a foreign-key violation on a post reference to `NotFound`.
///
/// The post can disappear between the caller's existence check and the
/// write that references it.
fn map_missing_post(error: sqlx::Error) -> AppError {
    match &error {
        sqlx::Error::Database(db_error) if db_error.is_foreign_key_violation() => {
            AppError::post_not_found()
        }
        _ => AppError::Database(error),
    }
}

fn record_write(operation: &str, table: &str) {
    DB_QUERIES_TOTAL.with_label_values(&[operation, table]).inc();
}

/// Database connection pool wrapper
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Insert a new account
    ///
    /// # Errors
    /// `Validation` if the username or email is already taken
    pub async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, username, email, password_hash, full_name, bio, link,
                profile_image, cover_image, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.full_name)
        .bind(&account.bio)
        .bind(&account.link)
        .bind(&account.profile_image)
        .bind(&account.cover_image)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Username or email is already taken"))?;

        record_write("INSERT", "accounts");
        Ok(())
    }

    /// Get account by ID
    pub async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    /// Get account by username (exact match)
    pub async fn get_account_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }

    /// Get account by email (case-insensitive)
    pub async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE email = ? COLLATE NOCASE",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Get accounts for a set of IDs (unordered, missing IDs skipped)
    pub async fn get_accounts_by_ids(&self, ids: &[AccountId]) -> Result<Vec<Account>, AppError> {
        let mut accounts = Vec::with_capacity(ids.len());

        for chunk in ids.chunks(IN_CLAUSE_CHUNK) {
            let query = format!(
                "SELECT * FROM accounts WHERE id IN ({})",
                placeholders(chunk.len())
            );
            let mut query_builder = sqlx::query_as::<_, Account>(&query);
            for id in chunk {
                query_builder = query_builder.bind(id);
            }
            accounts.extend(query_builder.fetch_all(&self.pool).await?);
        }

        Ok(accounts)
    }

    /// Persist editable account fields
    ///
    /// # Returns
    /// `true` if updated, `false` if no matching account row exists.
    pub async fn update_account(&self, account: &Account) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET username = ?, email = ?, password_hash = ?, full_name = ?, bio = ?,
                link = ?, profile_image = ?, cover_image = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.full_name)
        .bind(&account.bio)
        .bind(&account.link)
        .bind(&account.profile_image)
        .bind(&account.cover_image)
        .bind(account.updated_at)
        .bind(&account.id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "Username or email is already taken"))?;

        record_write("UPDATE", "accounts");
        Ok(result.rows_affected() == 1)
    }

    /// Random sample of accounts other than `exclude`
    pub async fn sample_accounts_excluding(
        &self,
        exclude: &AccountId,
        limit: usize,
    ) -> Result<Vec<Account>, AppError> {
        let accounts = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE id <> ? ORDER BY RANDOM() LIMIT ?",
        )
        .bind(exclude)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    // =========================================================================
    // Follow graph
    // =========================================================================

    /// Accounts that `account_id` follows, oldest follow first
    pub async fn get_following_ids(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<AccountId>, AppError> {
        let ids = sqlx::query_scalar::<_, AccountId>(
            "SELECT followee_id FROM follows WHERE follower_id = ? ORDER BY created_at, rowid",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Accounts following `account_id`, oldest follow first
    pub async fn get_follower_ids(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<AccountId>, AppError> {
        let ids = sqlx::query_scalar::<_, AccountId>(
            "SELECT follower_id FROM follows WHERE followee_id = ? ORDER BY created_at, rowid",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Check whether `follower` follows `followee`
    pub async fn is_following(
        &self,
        follower: &AccountId,
        followee: &AccountId,
    ) -> Result<bool, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND followee_id = ?",
        )
        .bind(follower)
        .bind(followee)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Flip the follow edge between two accounts.
    ///
    /// Uses an IMMEDIATE transaction so the membership check and the
    /// write are atomic.
    ///
    /// # Returns
    /// `true` if `follower` now follows `followee`, `false` if unfollowed.
    pub async fn toggle_follow(
        &self,
        follower: &AccountId,
        followee: &AccountId,
    ) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result: Result<bool, AppError> = async {
            let removed = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
                .bind(follower)
                .bind(followee)
                .execute(&mut *conn)
                .await?;
            if removed.rows_affected() > 0 {
                return Ok(false);
            }

            sqlx::query("INSERT INTO follows (follower_id, followee_id, created_at) VALUES (?, ?, ?)")
                .bind(follower)
                .bind(followee)
                .bind(Utc::now())
                .execute(&mut *conn)
                .await?;

            Ok(true)
        }
        .await;

        match result {
            Ok(following) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                record_write(if following { "INSERT" } else { "DELETE" }, "follows");
                Ok(following)
            }
            Err(error) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(error)
            }
        }
    }

    /// Load both sides of the follow graph and liked posts for an account
    pub async fn get_relationships(
        &self,
        account_id: &AccountId,
    ) -> Result<Relationships, AppError> {
        Ok(Relationships {
            following: self.get_following_ids(account_id).await?,
            followers: self.get_follower_ids(account_id).await?,
            liked_posts: self.get_liked_post_ids(account_id).await?,
        })
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Insert a new post
    pub async fn insert_post(&self, post: &Post) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, author_id, text, image, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.author_id)
        .bind(&post.text)
        .bind(&post.image)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await?;

        record_write("INSERT", "posts");
        Ok(())
    }

    /// Get post by ID
    pub async fn get_post(&self, id: &PostId) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    /// Delete post; likes and comments cascade
    ///
    /// # Returns
    /// `true` if a row was removed.
    pub async fn delete_post(&self, id: &PostId) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        record_write("DELETE", "posts");
        Ok(result.rows_affected() > 0)
    }

    /// All posts, newest first
    pub async fn get_all_posts(&self) -> Result<Vec<Post>, AppError> {
        let posts =
            sqlx::query_as::<_, Post>("SELECT * FROM posts ORDER BY created_at DESC, rowid DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(posts)
    }

    /// Posts by one author, newest first
    pub async fn get_posts_by_author(&self, author_id: &AccountId) -> Result<Vec<Post>, AppError> {
        let posts = sqlx::query_as::<_, Post>(
            "SELECT * FROM posts WHERE author_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// Posts by every account `follower` follows, newest first
    pub async fn get_posts_by_followed(
        &self,
        follower: &AccountId,
    ) -> Result<Vec<Post>, AppError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT p.* FROM posts p
            INNER JOIN follows f ON f.followee_id = p.author_id
            WHERE f.follower_id = ?
            ORDER BY p.created_at DESC, p.rowid DESC
            "#,
        )
        .bind(follower)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    /// Posts liked by an account, most recently liked first
    pub async fn get_liked_posts(&self, account_id: &AccountId) -> Result<Vec<Post>, AppError> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT p.* FROM posts p
            INNER JOIN post_likes l ON l.post_id = p.id
            WHERE l.account_id = ?
            ORDER BY l.created_at DESC, l.rowid DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(posts)
    }

    // =========================================================================
    // Likes
    // =========================================================================

    /// Flip the like edge between an account and a post.
    ///
    /// # Returns
    /// `true` if the post is now liked, `false` if unliked.
    pub async fn toggle_like(
        &self,
        post_id: &PostId,
        account_id: &AccountId,
    ) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result: Result<bool, AppError> = async {
            let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = ? AND account_id = ?")
                .bind(post_id)
                .bind(account_id)
                .execute(&mut *conn)
                .await?;
            if removed.rows_affected() > 0 {
                return Ok(false);
            }

            sqlx::query("INSERT INTO post_likes (post_id, account_id, created_at) VALUES (?, ?, ?)")
                .bind(post_id)
                .bind(account_id)
                .bind(Utc::now())
                .execute(&mut *conn)
                .await
                .map_err(map_missing_post)?;

            Ok(true)
        }
        .await;

        match result {
            Ok(liked) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                record_write(if liked { "INSERT" } else { "DELETE" }, "post_likes");
                Ok(liked)
            }
            Err(error) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(error)
            }
        }
    }

    /// Accounts that liked a post, in like order
    pub async fn get_post_likes(&self, post_id: &PostId) -> Result<Vec<AccountId>, AppError> {
        let ids = sqlx::query_scalar::<_, AccountId>(
            "SELECT account_id FROM post_likes WHERE post_id = ? ORDER BY created_at, rowid",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Post IDs liked by an account, most recent first
    pub async fn get_liked_post_ids(&self, account_id: &AccountId) -> Result<Vec<PostId>, AppError> {
        let ids = sqlx::query_scalar::<_, PostId>(
            "SELECT post_id FROM post_likes WHERE account_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Like edges for a batch of posts, in like order
    pub async fn get_likes_for_posts(&self, post_ids: &[PostId]) -> Result<Vec<PostLike>, AppError> {
        let mut likes = Vec::new();

        for chunk in post_ids.chunks(IN_CLAUSE_CHUNK) {
            let query = format!(
                "SELECT * FROM post_likes WHERE post_id IN ({}) ORDER BY created_at, rowid",
                placeholders(chunk.len())
            );
            let mut query_builder = sqlx::query_as::<_, PostLike>(&query);
            for id in chunk {
                query_builder = query_builder.bind(id);
            }
            likes.extend(query_builder.fetch_all(&self.pool).await?);
        }

        Ok(likes)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Append a comment to its post
    pub async fn insert_comment(&self, comment: &Comment) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO comments (id, post_id, author_id, text, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&comment.id)
        .bind(&comment.post_id)
        .bind(&comment.author_id)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_missing_post)?;

        record_write("INSERT", "comments");
        Ok(())
    }

    /// Comments for a batch of posts in append order
    pub async fn get_comments_for_posts(
        &self,
        post_ids: &[PostId],
    ) -> Result<Vec<Comment>, AppError> {
        let mut comments = Vec::new();

        for chunk in post_ids.chunks(IN_CLAUSE_CHUNK) {
            let query = format!(
                "SELECT id, post_id, author_id, text, created_at FROM comments WHERE post_id IN ({}) ORDER BY seq",
                placeholders(chunk.len())
            );
            let mut query_builder = sqlx::query_as::<_, Comment>(&query);
            for id in chunk {
                query_builder = query_builder.bind(id);
            }
            comments.extend(query_builder.fetch_all(&self.pool).await?);
        }

        Ok(comments)
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Insert notification
    pub async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, from_account_id, to_account_id, notification_type, read, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.from_account_id)
        .bind(&notification.to_account_id)
        .bind(&notification.notification_type)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        record_write("INSERT", "notifications");
        Ok(())
    }

    /// Notifications addressed to an account, newest first
    pub async fn get_notifications_for(
        &self,
        recipient: &AccountId,
    ) -> Result<Vec<Notification>, AppError> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE to_account_id = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(recipient)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    /// Get a single notification by ID
    pub async fn get_notification(&self, id: &EntityId) -> Result<Option<Notification>, AppError> {
        let notification =
            sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(notification)
    }

    /// Count unread notifications for an account
    pub async fn count_unread_notifications(&self, recipient: &AccountId) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE to_account_id = ? AND read = 0",
        )
        .bind(recipient)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Mark all of an account's notifications as read
    pub async fn mark_notifications_read(&self, recipient: &AccountId) -> Result<(), AppError> {
        sqlx::query("UPDATE notifications SET read = 1 WHERE to_account_id = ? AND read = 0")
            .bind(recipient)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Delete one notification
    pub async fn delete_notification(&self, id: &EntityId) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete all notifications addressed to an account
    pub async fn delete_notifications_for(&self, recipient: &AccountId) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM notifications WHERE to_account_id = ?")
            .bind(recipient)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
