use std::time::Duration;

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use sharedspace_types::api::Claims;

/// Sign a token for `username`/`id` that expires after `expiry`.
pub fn create_token(
    secret: &str,
    expiry: Duration,
    username: &str,
    id: Uuid,
    owner: bool,
) -> jsonwebtoken::errors::Result<String> {
    let expires_at = chrono::Utc::now() + chrono::Duration::seconds(expiry.as_secs() as i64);

    let claims = Claims {
        username: username.to_string(),
        id,
        owner,
        exp: expires_at.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Check signature and expiry, returning the embedded identity.
pub fn verify_token(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}
