//! User registration, login and profile management.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_dummy, verify_password};
use crate::auth::{AuthError, TokenService};
use crate::db::{DbPool, LoginResponse, Role, User, UserResponse};

/// Image extensions accepted for profile photos
const PHOTO_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Errors that can occur in account operations
#[derive(Error, Debug)]
pub enum AccountError {
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Email is already registered")]
    DuplicateEmail,

    /// Unknown email or wrong password; callers cannot tell which
    #[error("User not found or incorrect password")]
    InvalidCredentials,

    #[error("User not found")]
    NotFound,

    #[error("Failed to hash password: {0}")]
    Hash(String),

    #[error(transparent)]
    Token(#[from] AuthError),

    #[error("Failed to store file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

/// A validated registration
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Clone)]
pub struct Accounts {
    db: DbPool,
    tokens: TokenService,
    uploads_dir: PathBuf,
}

impl Accounts {
    pub fn new(db: DbPool, tokens: TokenService, uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            db,
            tokens,
            uploads_dir: uploads_dir.into(),
        }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub async fn register(&self, account: NewAccount) -> Result<UserResponse, AccountError> {
        let email = account.email.trim().to_lowercase();

        let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.db)
            .await?;
        if existing.is_some() {
            return Err(AccountError::DuplicateEmail);
        }

        let password_hash =
            hash_password(&account.password).map_err(|e| AccountError::Hash(e.to_string()))?;
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(account.name.trim())
        .bind(&email)
        .bind(&password_hash)
        .bind(account.role)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .map_err(|e| {
            // Lost a race with a concurrent registration for the same email
            if crate::booking::is_unique_violation(&e) {
                AccountError::DuplicateEmail
            } else {
                AccountError::Storage(e)
            }
        })?;

        tracing::info!(user_id = %id, role = %account.role, "User registered");

        Ok(UserResponse {
            id,
            name: account.name.trim().to_string(),
            email,
            role: account.role,
            photo: None,
        })
    }

    /// Check credentials and issue an identity token.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AccountError> {
        let email = email.trim().to_lowercase();
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.db)
            .await?;

        let user = match user {
            Some(user) => user,
            None => {
                verify_dummy(password);
                return Err(AccountError::InvalidCredentials);
            }
        };

        if !verify_password(password, &user.password_hash) {
            tracing::debug!(user_id = %user.id, "Login rejected");
            return Err(AccountError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user.id, user.role)?;
        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

        Ok(LoginResponse {
            token,
            role: user.role,
        })
    }

    pub async fn profile(&self, user_id: &str) -> Result<UserResponse, AccountError> {
        let user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AccountError::NotFound)?;
        Ok(user.into())
    }

    /// Store an uploaded avatar as `avatar_<user_id>.<ext>` and record the
    /// file name on the user. Returns the stored name.
    pub async fn set_photo(
        &self,
        user_id: &str,
        original_name: &str,
        data: &[u8],
    ) -> Result<String, AccountError> {
        let extension = photo_extension(original_name)?;
        if data.is_empty() {
            return Err(AccountError::Validation {
                field: "photo",
                message: "Uploaded file is empty".to_string(),
            });
        }

        let previous: Option<(Option<String>,)> =
            sqlx::query_as("SELECT photo FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;
        let previous = match previous {
            Some((photo,)) => photo,
            None => return Err(AccountError::NotFound),
        };

        let file_name = format!("avatar_{}.{}", user_id, extension);
        let path = self.uploads_dir.join(&file_name);

        fs::create_dir_all(&self.uploads_dir).await?;
        fs::write(&path, data).await?;

        let result = sqlx::query("UPDATE users SET photo = ?, updated_at = ? WHERE id = ?")
            .bind(&file_name)
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(user_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            let _ = fs::remove_file(&path).await;
            return Err(AccountError::NotFound);
        }

        if let Some(old) = previous.filter(|old| *old != file_name) {
            remove_stored_photo(&self.uploads_dir, &old).await;
        }

        tracing::info!(user_id, file = %file_name, bytes = data.len(), "Profile photo stored");
        Ok(file_name)
    }
}

/// Delete a replaced avatar. Only plain file names inside the uploads
/// directory are touched.
async fn remove_stored_photo(uploads_dir: &Path, file_name: &str) {
    let is_plain_name = Path::new(file_name)
        .file_name()
        .map(|name| name == std::ffi::OsStr::new(file_name))
        .unwrap_or(false);
    if !is_plain_name {
        tracing::warn!(file = %file_name, "Not removing photo outside the uploads directory");
        return;
    }

    if let Err(e) = fs::remove_file(uploads_dir.join(file_name)).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(file = %file_name, "Failed to remove replaced photo: {}", e);
        }
    }
}

/// Lowercased extension of an uploaded image, if it is an accepted type
fn photo_extension(original_name: &str) -> Result<String, AccountError> {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .filter(|e| PHOTO_EXTENSIONS.contains(&e.as_str()));

    let is_image = mime_guess::from_path(original_name)
        .first()
        .map(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .unwrap_or(false);

    match extension {
        Some(ext) if is_image => Ok(ext),
        _ => Err(AccountError::Validation {
            field: "photo",
            message: format!("Photo must be one of: {}", PHOTO_EXTENSIONS.join(", ")),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn accounts(pool: DbPool, uploads: &Path) -> Accounts {
        Accounts::new(
            pool,
            TokenService::new(b"accounts-test-secret-accounts-test", 3600),
            uploads,
        )
    }

    fn new_account(email: &str, role: Role) -> NewAccount {
        NewAccount {
            name: "Maria".to_string(),
            email: email.to_string(),
            password: "s3cret-pass".to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let (pool, dir) = test_pool().await;
        let accounts = accounts(pool, dir.path());

        let user = accounts
            .register(new_account("Maria@Example.com", Role::Instructor))
            .await
            .unwrap();
        assert_eq!(user.email, "maria@example.com");
        assert_eq!(user.role, Role::Instructor);

        let login = accounts
            .login("maria@example.com", "s3cret-pass")
            .await
            .unwrap();
        assert_eq!(login.role, Role::Instructor);

        let identity = accounts.tokens.verify(&login.token).unwrap();
        assert_eq!(identity.user_id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_email_leaves_first_user_intact() {
        let (pool, dir) = test_pool().await;
        let accounts = accounts(pool, dir.path());

        let first = accounts
            .register(new_account("a@x.com", Role::Student))
            .await
            .unwrap();

        let mut again = new_account("A@x.com", Role::Instructor);
        again.password = "another-password".to_string();
        assert!(matches!(
            accounts.register(again).await,
            Err(AccountError::DuplicateEmail)
        ));

        let profile = accounts.profile(&first.id).await.unwrap();
        assert_eq!(profile.role, Role::Student);
        assert!(accounts.login("a@x.com", "s3cret-pass").await.is_ok());
    }

    #[tokio::test]
    async fn test_login_errors_do_not_reveal_which_part_failed() {
        let (pool, dir) = test_pool().await;
        let accounts = accounts(pool, dir.path());
        accounts
            .register(new_account("a@x.com", Role::Student))
            .await
            .unwrap();

        let wrong_password = accounts.login("a@x.com", "nope").await.unwrap_err();
        let unknown_user = accounts.login("b@x.com", "nope").await.unwrap_err();

        assert!(matches!(wrong_password, AccountError::InvalidCredentials));
        assert!(matches!(unknown_user, AccountError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_set_photo_writes_file_and_reference() {
        let (pool, dir) = test_pool().await;
        let uploads = dir.path().join("uploads");
        let accounts = accounts(pool, &uploads);
        let user = accounts
            .register(new_account("a@x.com", Role::Student))
            .await
            .unwrap();

        let stored = accounts
            .set_photo(&user.id, "Me.PNG", b"\x89PNG fake")
            .await
            .unwrap();
        assert_eq!(stored, format!("avatar_{}.png", user.id));
        assert!(uploads.join(&stored).exists());

        let profile = accounts.profile(&user.id).await.unwrap();
        assert_eq!(profile.photo.as_deref(), Some(stored.as_str()));
    }

    #[tokio::test]
    async fn test_replacing_photo_removes_previous_file() {
        let (pool, dir) = test_pool().await;
        let uploads = dir.path().join("uploads");
        let accounts = accounts(pool, &uploads);
        let user = accounts
            .register(new_account("a@x.com", Role::Student))
            .await
            .unwrap();

        let png = accounts
            .set_photo(&user.id, "me.png", b"png bytes")
            .await
            .unwrap();
        let jpg = accounts
            .set_photo(&user.id, "me.jpg", b"jpg bytes")
            .await
            .unwrap();

        assert!(!uploads.join(&png).exists());
        assert!(uploads.join(&jpg).exists());
        let profile = accounts.profile(&user.id).await.unwrap();
        assert_eq!(profile.photo.as_deref(), Some(jpg.as_str()));

        // Same extension overwrites in place
        let again = accounts
            .set_photo(&user.id, "other.jpg", b"newer jpg")
            .await
            .unwrap();
        assert_eq!(again, jpg);
        assert_eq!(std::fs::read(uploads.join(&jpg)).unwrap(), b"newer jpg");
    }

    #[tokio::test]
    async fn test_set_photo_for_unknown_user_writes_nothing() {
        let (pool, dir) = test_pool().await;
        let uploads = dir.path().join("uploads");
        let accounts = accounts(pool, &uploads);

        assert!(matches!(
            accounts.set_photo("missing-user", "me.png", b"png").await,
            Err(AccountError::NotFound)
        ));
        assert!(!uploads.join("avatar_missing-user.png").exists());
    }

    #[tokio::test]
    async fn test_set_photo_rejects_non_images() {
        let (pool, dir) = test_pool().await;
        let accounts = accounts(pool, dir.path());
        let user = accounts
            .register(new_account("a@x.com", Role::Student))
            .await
            .unwrap();

        for name in ["script.sh", "noextension", "page.html"] {
            assert!(matches!(
                accounts.set_photo(&user.id, name, b"data").await,
                Err(AccountError::Validation { field: "photo", .. })
            ));
        }
    }

    #[test]
    fn test_photo_extension() {
        assert_eq!(photo_extension("a.JPG").unwrap(), "jpg");
        assert_eq!(photo_extension("dir/b.webp").unwrap(), "webp");
        assert!(photo_extension("c.svg").is_err());
    }
}
