use crate::store::{Store, StoreError};
use chrono::{Duration, Utc};

use super::crypto::{generate_token, hash_token};

/// Sessions last this long from creation.
pub const SESSION_TTL_DAYS: i64 = 30;

/// Create a session for the user and return the plain token.
///
/// Only the SHA-256 of the token is persisted.
pub fn create_session(store: &dyn Store, user_id: i64) -> Result<String, StoreError> {
    let token = generate_token();
    let expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);
    store.create_session(user_id, &hash_token(&token), expires_at)?;
    Ok(token)
}
