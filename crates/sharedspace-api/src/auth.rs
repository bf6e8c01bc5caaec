use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use sharedspace_db::is_unique_violation;
use sharedspace_types::api::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest};

use crate::error::{AppError, Result};
use crate::state::{AppState, with_db};
use crate::tokens::create_token;

const MIN_USERNAME_LEN: usize = 5;
const MIN_PASSWORD_LEN: usize = 8;

pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload?;

    let mut problems = credential_problems(&req.username, &req.password);
    if req.confirm_password != req.password {
        problems.push("Passwords must match");
    }
    reject_if_any(problems)?;

    let password_hash = hash_password(req.password, state.config.hash_cost).await?;
    let user_id = Uuid::new_v4();

    let username = req.username.clone();
    let owner = req.owner;
    let created = with_db(&state, move |db| {
        db.create_user(&user_id.to_string(), &username, &password_hash, owner)
    })
    .await;

    match created {
        Ok(()) => {}
        Err(AppError::Database(err)) if is_unique_violation(&err) => return Err(AppError::AlreadyRegistered),
        Err(err) => return Err(err),
    }

    info!("Registered user {} ({}, owner: {})", req.username, user_id, req.owner);
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("You have registered successfully")),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    let Json(req) = payload?;
    reject_if_any(credential_problems(&req.username, &req.password))?;

    let username = req.username.clone();
    let user = with_db(&state, move |db| db.get_user_by_username(&username))
        .await?
        .ok_or(AppError::IncorrectCredentials("Username not found"))?;

    verify_password(req.password, user.password.clone()).await?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|_| AppError::Internal(format!("corrupt user id '{}'", user.id)))?;

    let token = create_token(
        &state.config.jwt_secret,
        state.config.token_expiry,
        &user.username,
        user_id,
        user.owner,
    )?;

    info!("User {} logged in", user.username);
    Ok(Json(LoginResponse { token }))
}

fn credential_problems(username: &str, password: &str) -> Vec<&'static str> {
    let mut problems = Vec::new();

    if username.is_empty() {
        problems.push("Username is required");
    } else if username.chars().count() < MIN_USERNAME_LEN {
        problems.push("Username must have 5 characters minimum");
    }

    if password.is_empty() {
        problems.push("Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        problems.push("Password should have 8 characters minimum");
    }

    problems
}

fn reject_if_any(problems: Vec<&'static str>) -> Result<()> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(problems.join("\n")))
    }
}

/// Argon2id with `cost` iterations, off the async runtime.
async fn hash_password(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let params = Params::new(Params::DEFAULT_M_COST, cost, Params::DEFAULT_P_COST, None)
            .map_err(|e| AppError::Internal(format!("argon2 params: {e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("argon2 hash: {e}")))
    })
    .await?
}

/// Parameters are read from the stored hash, so older costs keep verifying.
async fn verify_password(password: String, stored_hash: String) -> Result<()> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|e| AppError::Internal(format!("stored hash unreadable: {e}")))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AppError::IncorrectCredentials("Incorrect password"))
    })
    .await?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_problems_are_reported() {
        let problems = credential_problems("", "short");
        assert_eq!(problems, vec!["Username is required", "Password should have 8 characters minimum"]);
    }

    #[test]
    fn test_valid_credentials_have_no_problems() {
        assert!(credential_problems("mario", "password1").is_empty());
    }

    #[test]
    fn test_validation_message_is_newline_joined() {
        let err = reject_if_any(vec!["Username is required", "Passwords must match"]).unwrap_err();
        assert_eq!(err.public_message(), "Username is required\nPasswords must match");
    }

    #[tokio::test]
    async fn test_hash_then_verify() {
        let hash = hash_password("correct horse".to_string(), 1).await.unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("t=1"));

        verify_password("correct horse".to_string(), hash.clone()).await.unwrap();
        let err = verify_password("wrong horse".to_string(), hash).await.unwrap_err();
        assert!(matches!(err, AppError::IncorrectCredentials(_)));
    }
}
