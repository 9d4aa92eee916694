//! Account service
//!
//! Registration, credential checks, profile lookup and profile edits.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::password::{MIN_PASSWORD_LEN, hash_password, verify_password};
use crate::data::{Account, AccountId, Database, PublicAccount, Relationships};
use crate::error::AppError;
use crate::storage::{self, MediaStore};

fn normalize_optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Passwords are compared byte for byte, so only an empty value counts as absent
fn non_empty_password(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// `local@domain.tld` with no whitespace and a single `@`
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((name, tld)) => !name.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn validate_password_length(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
}

async fn verify_password_blocking(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(e.into()))
}

/// Public account plus its relationship sets
#[derive(Debug, Clone)]
pub struct Profile {
    pub account: PublicAccount,
    pub relationships: Relationships,
}

/// Registration input
#[derive(Debug, Clone)]
pub struct Registration {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Profile edit; absent or empty fields keep their current value
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
    pub bio: Option<String>,
    pub link: Option<String>,
    pub profile_image: Option<String>,
    pub cover_image: Option<String>,
}

/// Account service
pub struct AccountService {
    db: Arc<Database>,
    media: Arc<dyn MediaStore>,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>, media: Arc<dyn MediaStore>) -> Self {
        Self { db, media }
    }

    /// Register a new account
    ///
    /// # Errors
    /// `Validation` for missing fields, a malformed email, a taken
    /// username or email, or a short password
    pub async fn register(&self, registration: Registration) -> Result<Profile, AppError> {
        let full_name = registration.full_name.trim().to_string();
        let username = registration.username.trim().to_string();
        let email = registration.email.trim().to_string();
        if full_name.is_empty() || username.is_empty() || email.is_empty() {
            return Err(AppError::Validation("All fields are required".to_string()));
        }

        if !is_valid_email(&email) {
            return Err(AppError::Validation("Invalid email format".to_string()));
        }
        if self.db.get_account_by_username(&username).await?.is_some() {
            return Err(AppError::Validation("Username is already taken".to_string()));
        }
        if self.db.get_account_by_email(&email).await?.is_some() {
            return Err(AppError::Validation("Email is already taken".to_string()));
        }
        validate_password_length(&registration.password)?;

        let password_hash = hash_password_blocking(registration.password).await?;
        let now = Utc::now();
        let account = Account {
            id: AccountId::new(),
            username,
            email,
            password_hash,
            full_name,
            bio: None,
            link: None,
            profile_image: None,
            cover_image: None,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_account(&account).await?;

        tracing::info!(account_id = %account.id, username = %account.username, "Account registered");

        Ok(Profile {
            account: account.into(),
            relationships: Relationships::default(),
        })
    }

    /// Check a username/password pair
    ///
    /// # Errors
    /// `Unauthorized` for an unknown username or wrong password
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Profile, AppError> {
        let invalid = || AppError::Unauthorized("Invalid username or password".to_string());

        let account = self
            .db
            .get_account_by_username(username.trim())
            .await?
            .ok_or_else(invalid)?;

        let matches =
            verify_password_blocking(password.to_string(), account.password_hash.clone()).await?;
        if !matches {
            tracing::debug!(username = %account.username, "Rejected login attempt");
            return Err(invalid());
        }

        self.profile_of(account).await
    }

    /// Public profile by username
    pub async fn get_profile(&self, username: &str) -> Result<Profile, AppError> {
        let account = self
            .db
            .get_account_by_username(username)
            .await?
            .ok_or_else(AppError::account_not_found)?;
        self.profile_of(account).await
    }

    /// Public profile by ID
    pub async fn get_account(&self, id: &AccountId) -> Result<Profile, AppError> {
        let account = self
            .db
            .get_account(id)
            .await?
            .ok_or_else(AppError::account_not_found)?;
        self.profile_of(account).await
    }

    /// Apply a profile edit
    ///
    /// Password changes need both the current and the new password. New
    /// images go through the media store with the same fallback as post
    /// images; the previous image is discarded only after a real upload.
    pub async fn update_profile(
        &self,
        actor: &AccountId,
        update: ProfileUpdate,
    ) -> Result<Profile, AppError> {
        let mut account = self
            .db
            .get_account(actor)
            .await?
            .ok_or_else(AppError::account_not_found)?;

        let current_password = non_empty_password(update.current_password);
        let new_password = non_empty_password(update.new_password);
        match (current_password, new_password) {
            (Some(current), Some(new)) => {
                let matches =
                    verify_password_blocking(current, account.password_hash.clone()).await?;
                if !matches {
                    return Err(AppError::Validation(
                        "Current password is incorrect".to_string(),
                    ));
                }
                validate_password_length(&new)?;
                account.password_hash = hash_password_blocking(new).await?;
            }
            (None, None) => {}
            _ => {
                return Err(AppError::Validation(
                    "Please provide both current password and new password".to_string(),
                ));
            }
        }

        if let Some(username) = normalize_optional_text(update.username) {
            if username != account.username {
                if self.db.get_account_by_username(&username).await?.is_some() {
                    return Err(AppError::Validation("Username is already taken".to_string()));
                }
                account.username = username;
            }
        }

        if let Some(email) = normalize_optional_text(update.email) {
            if !email.eq_ignore_ascii_case(&account.email) {
                if !is_valid_email(&email) {
                    return Err(AppError::Validation("Invalid email format".to_string()));
                }
                if self.db.get_account_by_email(&email).await?.is_some() {
                    return Err(AppError::Validation("Email is already taken".to_string()));
                }
            }
            account.email = email;
        }

        if let Some(full_name) = normalize_optional_text(update.full_name) {
            account.full_name = full_name;
        }
        if let Some(bio) = normalize_optional_text(update.bio) {
            account.bio = Some(bio);
        }
        if let Some(link) = normalize_optional_text(update.link) {
            account.link = Some(link);
        }

        let mut discarded = Vec::new();
        let mut uploaded = Vec::new();
        if let Some(payload) = normalize_optional_text(update.profile_image) {
            let stored = storage::store_or_fallback(self.media.as_ref(), &payload).await;
            if stored.uploaded {
                discarded.extend(account.profile_image.take());
                uploaded.push(stored.reference.clone());
            }
            account.profile_image = Some(stored.reference);
        }
        if let Some(payload) = normalize_optional_text(update.cover_image) {
            let stored = storage::store_or_fallback(self.media.as_ref(), &payload).await;
            if stored.uploaded {
                discarded.extend(account.cover_image.take());
                uploaded.push(stored.reference.clone());
            }
            account.cover_image = Some(stored.reference);
        }

        account.updated_at = Utc::now();
        let saved = match self.db.update_account(&account).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::account_not_found()),
            Err(error) => Err(error),
        };
        if let Err(error) = saved {
            // Nothing references the new uploads
            for reference in uploaded {
                storage::discard_best_effort(self.media.as_ref(), &reference).await;
            }
            return Err(error);
        }

        for reference in discarded {
            storage::discard_best_effort(self.media.as_ref(), &reference).await;
        }

        tracing::info!(account_id = %account.id, "Profile updated");
        self.profile_of(account).await
    }

    async fn profile_of(&self, account: Account) -> Result<Profile, AppError> {
        let relationships = self.db.get_relationships(&account.id).await?;
        Ok(Profile {
            account: account.into(),
            relationships,
        })
    }
}
