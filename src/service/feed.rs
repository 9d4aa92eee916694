//! Feed service
//!
//! Read-only post listings: global, following, per-user and liked feeds,
//! plus suggested accounts to follow.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::data::{AccountId, Database, EntityId, Post, PostId, PublicAccount};
use crate::error::AppError;

/// Size of the random candidate pool for suggestions
const SUGGESTION_POOL: usize = 10;
/// Maximum suggestions returned
const MAX_SUGGESTIONS: usize = 4;

/// Post with its author, likes and comments resolved
#[derive(Debug, Clone)]
pub struct PostView {
    pub id: PostId,
    pub author: PublicAccount,
    pub text: Option<String>,
    pub image: Option<String>,
    /// Accounts that liked the post, in like order
    pub likes: Vec<AccountId>,
    /// Comments, oldest first
    pub comments: Vec<CommentView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Comment with its author resolved
#[derive(Debug, Clone)]
pub struct CommentView {
    pub id: EntityId,
    pub author: PublicAccount,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Attach authors, likes and comments to a batch of posts, keeping order
pub(crate) async fn hydrate_posts(
    db: &Database,
    posts: Vec<Post>,
) -> Result<Vec<PostView>, AppError> {
    if posts.is_empty() {
        return Ok(Vec::new());
    }

    let post_ids: Vec<PostId> = posts.iter().map(|p| p.id.clone()).collect();
    let likes = db.get_likes_for_posts(&post_ids).await?;
    let comments = db.get_comments_for_posts(&post_ids).await?;

    let mut account_ids: Vec<AccountId> = posts
        .iter()
        .map(|p| p.author_id.clone())
        .chain(comments.iter().map(|c| c.author_id.clone()))
        .collect();
    account_ids.sort();
    account_ids.dedup();

    let accounts: HashMap<AccountId, PublicAccount> = db
        .get_accounts_by_ids(&account_ids)
        .await?
        .into_iter()
        .map(|account| (account.id.clone(), PublicAccount::from(account)))
        .collect();

    let mut likes_by_post: HashMap<PostId, Vec<AccountId>> = HashMap::new();
    for like in likes {
        likes_by_post
            .entry(like.post_id)
            .or_default()
            .push(like.account_id);
    }

    let mut comments_by_post: HashMap<PostId, Vec<CommentView>> = HashMap::new();
    for comment in comments {
        let Some(author) = accounts.get(&comment.author_id) else {
            tracing::warn!(comment_id = %comment.id, "Skipping comment with unknown author");
            continue;
        };
        comments_by_post
            .entry(comment.post_id)
            .or_default()
            .push(CommentView {
                id: comment.id,
                author: author.clone(),
                text: comment.text,
                created_at: comment.created_at,
            });
    }

    let mut views = Vec::with_capacity(posts.len());
    for post in posts {
        let Some(author) = accounts.get(&post.author_id) else {
            tracing::warn!(post_id = %post.id, "Skipping post with unknown author");
            continue;
        };
        views.push(PostView {
            likes: likes_by_post.remove(&post.id).unwrap_or_default(),
            comments: comments_by_post.remove(&post.id).unwrap_or_default(),
            id: post.id,
            author: author.clone(),
            text: post.text,
            image: post.image,
            created_at: post.created_at,
            updated_at: post.updated_at,
        });
    }

    Ok(views)
}

/// Feed service
pub struct FeedService {
    db: Arc<Database>,
}

impl FeedService {
    /// Create new feed service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Every post, newest first
    pub async fn global_feed(&self) -> Result<Vec<PostView>, AppError> {
        let posts = self.db.get_all_posts().await?;
        hydrate_posts(&self.db, posts).await
    }

    /// Posts by accounts `account_id` follows, newest first
    ///
    /// Following nobody yields an empty feed.
    pub async fn following_feed(&self, account_id: &AccountId) -> Result<Vec<PostView>, AppError> {
        self.require_account(account_id).await?;
        let posts = self.db.get_posts_by_followed(account_id).await?;
        hydrate_posts(&self.db, posts).await
    }

    /// Posts by the account named `username`, newest first
    pub async fn user_feed(&self, username: &str) -> Result<Vec<PostView>, AppError> {
        let account = self
            .db
            .get_account_by_username(username)
            .await?
            .ok_or_else(AppError::account_not_found)?;
        let posts = self.db.get_posts_by_author(&account.id).await?;
        hydrate_posts(&self.db, posts).await
    }

    /// Posts `account_id` has liked, most recently liked first
    pub async fn liked_feed(&self, account_id: &AccountId) -> Result<Vec<PostView>, AppError> {
        self.require_account(account_id).await?;
        let posts = self.db.get_liked_posts(account_id).await?;
        hydrate_posts(&self.db, posts).await
    }

    /// A few accounts `account_id` might want to follow
    ///
    /// Samples a small random pool first and filters followed accounts out
    /// afterwards, so the result may hold fewer than the maximum even when
    /// more candidates exist. The caller is never included.
    pub async fn suggested_accounts(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<PublicAccount>, AppError> {
        let following: HashSet<AccountId> = self
            .db
            .get_following_ids(account_id)
            .await?
            .into_iter()
            .collect();

        let suggestions = self
            .db
            .sample_accounts_excluding(account_id, SUGGESTION_POOL)
            .await?
            .into_iter()
            .filter(|account| &account.id != account_id && !following.contains(&account.id))
            .take(MAX_SUGGESTIONS)
            .map(PublicAccount::from)
            .collect();

        Ok(suggestions)
    }

    async fn require_account(&self, account_id: &AccountId) -> Result<(), AppError> {
        self.db
            .get_account(account_id)
            .await?
            .ok_or_else(AppError::account_not_found)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Account, Comment};
    use chrono::Duration;
    use tempfile::TempDir;

    async fn setup() -> (Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("test.db"))
            .await
            .unwrap();
        (Arc::new(db), temp_dir)
    }

    async fn insert_account(db: &Database, username: &str) -> AccountId {
        let account = Account {
            id: AccountId::new(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: "secret-hash".to_string(),
            full_name: username.to_string(),
            bio: None,
            link: None,
            profile_image: None,
            cover_image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        db.insert_account(&account).await.unwrap();
        account.id
    }

    async fn insert_post(db: &Database, author: &AccountId, text: &str, age_minutes: i64) -> PostId {
        let created_at = Utc::now() - Duration::minutes(age_minutes);
        let post = Post {
            id: PostId::new(),
            author_id: author.clone(),
            text: Some(text.to_string()),
            image: None,
            created_at,
            updated_at: created_at,
        };
        db.insert_post(&post).await.unwrap();
        post.id
    }

    #[tokio::test]
    async fn global_feed_is_newest_first_with_authors_and_comments() {
        let (db, _temp_dir) = setup().await;
        let alice = insert_account(&db, "alice").await;
        let bob = insert_account(&db, "bob").await;
        let older = insert_post(&db, &alice, "older", 10).await;
        let newer = insert_post(&db, &bob, "newer", 1).await;

        db.insert_comment(&Comment {
            id: EntityId::new(),
            post_id: older.clone(),
            author_id: bob.clone(),
            text: "hi".to_string(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();
        db.toggle_like(&older, &bob).await.unwrap();

        let feed = FeedService::new(db.clone()).global_feed().await.unwrap();
        assert_eq!(
            feed.iter().map(|p| p.id.clone()).collect::<Vec<_>>(),
            vec![newer, older]
        );
        assert_eq!(feed[0].author.username, "bob");
        assert_eq!(feed[1].author.username, "alice");
        assert_eq!(feed[1].likes, vec![bob.clone()]);
        assert_eq!(feed[1].comments.len(), 1);
        assert_eq!(feed[1].comments[0].author.id, bob);
    }

    #[tokio::test]
    async fn following_feed_only_contains_followed_authors() {
        let (db, _temp_dir) = setup().await;
        let alice = insert_account(&db, "alice").await;
        let bob = insert_account(&db, "bob").await;
        let carol = insert_account(&db, "carol").await;
        let feeds = FeedService::new(db.clone());

        insert_post(&db, &carol, "not followed", 0).await;
        db.toggle_follow(&alice, &bob).await.unwrap();
        assert!(feeds.following_feed(&alice).await.unwrap().is_empty());

        let post = insert_post(&db, &bob, "hello", 0).await;
        let feed = feeds.following_feed(&alice).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, post);

        assert!(matches!(
            feeds.following_feed(&AccountId::new()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn user_and_liked_feeds() {
        let (db, _temp_dir) = setup().await;
        let alice = insert_account(&db, "alice").await;
        let bob = insert_account(&db, "bob").await;
        let feeds = FeedService::new(db.clone());

        let first = insert_post(&db, &bob, "first", 5).await;
        let second = insert_post(&db, &bob, "second", 1).await;

        let by_bob = feeds.user_feed("bob").await.unwrap();
        assert_eq!(
            by_bob.iter().map(|p| p.id.clone()).collect::<Vec<_>>(),
            vec![second.clone(), first.clone()]
        );
        assert!(matches!(
            feeds.user_feed("nobody").await,
            Err(AppError::NotFound(_))
        ));

        db.toggle_like(&first, &alice).await.unwrap();
        let liked = feeds.liked_feed(&alice).await.unwrap();
        assert_eq!(liked.len(), 1);
        assert_eq!(liked[0].id, first);
    }

    #[tokio::test]
    async fn suggestions_never_include_caller_or_followed() {
        let (db, _temp_dir) = setup().await;
        let alice = insert_account(&db, "alice").await;
        let bob = insert_account(&db, "bob").await;
        for name in ["carol", "dave", "erin"] {
            insert_account(&db, name).await;
        }
        db.toggle_follow(&alice, &bob).await.unwrap();
        let feeds = FeedService::new(db.clone());

        for _ in 0..5 {
            let suggestions = feeds.suggested_accounts(&alice).await.unwrap();
            assert!(suggestions.len() <= MAX_SUGGESTIONS);
            assert!(suggestions.iter().all(|a| a.id != alice && a.id != bob));
        }
        assert_eq!(feeds.suggested_accounts(&alice).await.unwrap().len(), 3);
    }
}
