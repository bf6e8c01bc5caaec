use axum::{
    extract::{Path, Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::tokens::verify_token;

/// Extract and validate the JWT from the Authorization header.
///
/// On success the token's `Claims` are stored in the request extensions,
/// where handlers read the caller's id.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AppError::NoToken)?
        .to_str()
        .map_err(|_| AppError::MissingBearer)?;

    let token = auth_header
        .strip_prefix("Bearer")
        .ok_or(AppError::MissingBearer)?
        .trim_start();

    // Verification failures are not auth errors: they surface as 500.
    let claims = verify_token(&state.config.jwt_secret, token)?;

    debug!("Authenticated {} ({})", claims.username, claims.id);
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Reject `:locationId` values that are not well-formed ids before anything
/// else on the route runs.
pub async fn validate_location_id(Path(location_id): Path<String>, req: Request, next: Next) -> Result<Response> {
    if location_id.parse::<Uuid>().is_err() {
        return Err(AppError::InvalidId);
    }

    Ok(next.run(req).await)
}

/// Refuse cross-origin requests from origins outside the allow-list.
/// Requests without an Origin header are not cross-origin and pass through.
pub async fn reject_unknown_origins(State(state): State<AppState>, req: Request, next: Next) -> Result<Response> {
    let rejected = req
        .headers()
        .get(header::ORIGIN)
        .map(|origin| String::from_utf8_lossy(origin.as_bytes()).into_owned())
        .filter(|origin| !state.config.allowed_origins.iter().any(|allowed| allowed == origin));

    if let Some(origin) = rejected {
        return Err(AppError::NotAllowedByCors(origin));
    }

    Ok(next.run(req).await)
}
