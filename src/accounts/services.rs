use crate::accounts::repo_types::{Privileges, User};
use crate::error::{AppError, AppResult};
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use sqlx::PgPool;
use tracing::{error, info, warn};

pub const MIN_PASSWORD_LEN: usize = 5;
/// Width of the `email` and `name` columns.
pub const MAX_FIELD_LEN: usize = 255;

/// Trims the address and lowercases the domain part; the local part keeps its case.
pub fn normalize_email(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => trimmed.to_string(),
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Input for a new account.
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub name: String,
}

fn checked_email(raw: &str) -> AppResult<String> {
    if raw.trim().is_empty() {
        return Err(AppError::validation("User must have an email address"));
    }
    let email = normalize_email(raw);
    if email.chars().count() > MAX_FIELD_LEN {
        return Err(AppError::validation(format!(
            "Email must be at most {MAX_FIELD_LEN} characters"
        )));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("Enter a valid email address"));
    }
    Ok(email)
}

fn checked_name(raw: &str) -> AppResult<&str> {
    let name = raw.trim();
    if name.chars().count() > MAX_FIELD_LEN {
        return Err(AppError::validation(format!(
            "Name must be at most {MAX_FIELD_LEN} characters"
        )));
    }
    Ok(name)
}

async fn insert_account(db: &PgPool, new: &NewAccount, privileges: Privileges) -> AppResult<User> {
    let email = checked_email(&new.email)?;
    let name = checked_name(&new.name)?;
    validate_password(&new.password)?;

    if User::find_by_email(db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::validation("User with this email already exists"));
    }

    let hash = hash_password(&new.password)?;
    let user = User::insert(db, &email, name, &hash, privileges).await?;
    info!(user_id = %user.id, email = %user.email, staff = user.is_staff, "account created");
    Ok(user)
}

pub async fn create_account(db: &PgPool, new: &NewAccount) -> AppResult<User> {
    insert_account(db, new, Privileges::default()).await
}

pub async fn create_superuser(db: &PgPool, new: &NewAccount) -> AppResult<User> {
    insert_account(db, new, Privileges::SUPERUSER).await
}

/// Returns the account only when it exists, is active and the password matches.
pub async fn authenticate(db: &PgPool, email: &str, password: &str) -> AppResult<Option<User>> {
    let email = normalize_email(email);
    let Some(user) = User::find_by_email(db, &email).await? else {
        warn!(email = %email, "login unknown email");
        return Ok(None);
    };
    if !user.is_active {
        warn!(user_id = %user.id, "login for inactive account");
        return Ok(None);
    }
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Ok(None);
    }
    Ok(Some(user))
}

/// Changes to the caller's own profile; absent fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

pub async fn update_profile(db: &PgPool, user: &User, changes: ProfileChanges) -> AppResult<User> {
    let email = match changes.email.as_deref() {
        Some(raw) => {
            let email = checked_email(raw)?;
            if email != user.email && User::find_by_email(db, &email).await?.is_some() {
                return Err(AppError::validation("User with this email already exists"));
            }
            Some(email)
        }
        None => None,
    };
    let name = changes.name.as_deref().map(checked_name).transpose()?;
    let hash = match changes.password.as_deref() {
        Some(p) => {
            validate_password(p)?;
            Some(hash_password(p)?)
        }
        None => None,
    };

    let updated =
        User::update_profile(db, user.id, email.as_deref(), name, hash.as_deref()).await?;
    info!(user_id = %updated.id, "profile updated");
    Ok(updated)
}



#[cfg(test)]
mod db_tests {
    use super::*;

    fn sample(email: &str) -> NewAccount {
        NewAccount {
            email: email.into(),
            password: "testpass123".into(),
            name: "Test Name".into(),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn create_account_stores_hash_and_normalized_email(db: PgPool) {
        let user = create_account(&db, &sample("Test2@Example.com")).await.unwrap();
        assert_eq!(user.email, "Test2@example.com");
        assert_ne!(user.password_hash, "testpass123");
        assert!(verify_password("testpass123", &user.password_hash).unwrap());
        assert!(user.is_active);
        assert!(!user.is_staff && !user.is_superuser);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn superuser_has_both_flags(db: PgPool) {
        let user = create_superuser(&db, &sample("admin@example.com")).await.unwrap();
        assert!(user.is_staff);
        assert!(user.is_superuser);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn duplicate_email_is_rejected(db: PgPool) {
        create_account(&db, &sample("dup@example.com")).await.unwrap();
        let err = create_account(&db, &sample("dup@EXAMPLE.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn authenticate_checks_password_and_activity(db: PgPool) {
        let user = create_account(&db, &sample("login@example.com")).await.unwrap();
        let found = authenticate(&db, "login@EXAMPLE.com", "testpass123").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(authenticate(&db, "login@example.com", "nope").await.unwrap().is_none());
        assert!(authenticate(&db, "ghost@example.com", "testpass123").await.unwrap().is_none());

        sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
            .bind(user.id)
            .execute(&db)
            .await
            .unwrap();
        assert!(authenticate(&db, "login@example.com", "testpass123").await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn update_profile_rehashes_password(db: PgPool) {
        let user = create_account(&db, &sample("me@example.com")).await.unwrap();
        let changes = ProfileChanges {
            name: Some("Updated Name".into()),
            password: Some("newpassword123".into()),
            email: None,
        };
        let updated = update_profile(&db, &user, changes).await.unwrap();
        assert_eq!(updated.name, "Updated Name");
        assert_eq!(updated.email, "me@example.com");
        assert!(verify_password("newpassword123", &updated.password_hash).unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn update_profile_rejects_overlong_name(db: PgPool) {
        let user = create_account(&db, &sample("wide@example.com")).await.unwrap();
        let changes = ProfileChanges {
            name: Some("n".repeat(300)),
            ..Default::default()
        };
        let err = update_profile(&db, &user, changes).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let reloaded = User::find_by_id(&db, user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.name, "Test Name");
    }
}
