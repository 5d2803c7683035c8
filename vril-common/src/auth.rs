//! Bearer-token authentication
//!
//! Write endpoints require a token issued against the seeded credentials.
//! Only the SHA-256 hash of a token is stored; issuing a new token
//! deletes the user's previous ones, and tokens expire after 30 days.

use crate::db::settings;
use crate::{Error, Result};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

const TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

const USERNAME_KEY: &str = "auth_username";
const PASSWORD_HASH_KEY: &str = "auth_password_hash";

/// SHA-256 hex digest of a string
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());

    format!("{:x}", hasher.finalize())
}

/// Seed the credential pair from config
///
/// Stores the username and a password hash in the settings table so token
/// issuance does not need the config file at request time.
pub async fn seed_credentials(pool: &SqlitePool, username: &str, password: &str) -> Result<()> {
    settings::set_setting(pool, USERNAME_KEY, username).await?;
    settings::set_setting(pool, PASSWORD_HASH_KEY, &sha256_hex(password)).await?;

    Ok(())
}

/// Check a username/password pair against the seeded credentials
pub async fn verify_credentials(pool: &SqlitePool, username: &str, password: &str) -> Result<()> {
    let stored_username = settings::get_setting(pool, USERNAME_KEY).await?;
    let stored_hash = settings::get_setting(pool, PASSWORD_HASH_KEY).await?;

    let (Some(stored_username), Some(stored_hash)) = (stored_username, stored_hash) else {
        return Err(Error::Auth("No credentials configured".to_string()));
    };

    if stored_username != username || stored_hash != sha256_hex(password) {
        return Err(Error::Auth("Invalid user credentials".to_string()));
    }

    Ok(())
}

/// Issue a new bearer token for a user
///
/// Deletes any previous tokens for the same user first, so at most one
/// token per user is live at a time.
pub async fn issue_token(pool: &SqlitePool, username: &str) -> Result<String> {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();

    let now = chrono::Utc::now().timestamp();

    sqlx::query("DELETE FROM auth_tokens WHERE username = ?")
        .bind(username)
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO auth_tokens (token_hash, username, created_at, expires_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(sha256_hex(&token))
    .bind(username)
    .bind(now)
    .bind(now + TOKEN_TTL_SECS)
    .execute(pool)
    .await?;

    tracing::info!(username = %username, "Issued auth token");

    Ok(token)
}

/// Validate a bearer token, returning the username it belongs to
///
/// Unknown tokens are an auth failure (401); a known-but-expired token is
/// forbidden (403) so clients can distinguish "log in again" from
/// "garbage credentials".
pub async fn validate_token(pool: &SqlitePool, token: &str) -> Result<String> {
    let row: Option<(String, i64)> =
        sqlx::query_as("SELECT username, expires_at FROM auth_tokens WHERE token_hash = ?")
            .bind(sha256_hex(token))
            .fetch_optional(pool)
            .await?;

    let Some((username, expires_at)) = row else {
        return Err(Error::Auth("Invalid auth token".to_string()));
    };

    if expires_at <= chrono::Utc::now().timestamp() {
        return Err(Error::Forbidden("Auth token expired".to_string()));
    }

    Ok(username)
}
