use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    handler::Handler,
    http::{HeaderValue, Method, Uri, header},
    middleware,
    response::Redirect,
    routing::{delete, get, post, put},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::{AppError, Result};
use crate::health::health_check;
use crate::images::{UPLOADS_ROUTE, public_path};
use crate::middleware::{reject_unknown_origins, require_auth, validate_location_id};
use crate::state::AppState;
use crate::{auth, locations};

/// Room for the text parts and multipart framing around the image.
const FORM_OVERHEAD: usize = 64 * 1024;

/// The full HTTP surface.
pub fn router(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_size + FORM_OVERHEAD);

    let uploads = ServeDir::new(&state.config.upload_path)
        .fallback(redirect_to_backup.with_state(state.clone()));

    let authenticated = Router::new()
        .route("/locations/my-locations", get(locations::get_my_locations))
        .route("/locations/add", post(locations::add_location).layer(upload_limit))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Route layers added last run first: the id check precedes auth.
    let owned = Router::new()
        .route(
            "/locations/edit-location/{locationId}",
            put(locations::update_location).layer(upload_limit),
        )
        .route("/locations/delete-location/{locationId}", delete(locations::delete_location))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .route_layer(middleware::from_fn(validate_location_id));

    Router::new()
        .route("/health", get(health_check))
        .route("/users/register", post(auth::register))
        .route("/users/login", post(auth::login))
        .route("/locations", get(locations::get_locations))
        .route(
            "/locations/location/{locationId}",
            get(locations::get_location_by_id).layer(middleware::from_fn(validate_location_id)),
        )
        .merge(authenticated)
        .merge(owned)
        .nest_service(&format!("/{UPLOADS_ROUTE}"), uploads)
        .fallback(unknown_endpoint)
        .layer(cors_layer(&state.config.allowed_origins))
        .layer(middleware::from_fn_with_state(state.clone(), reject_unknown_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Skipping invalid allowed origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Missing local upload: send the client to the backed-up copy.
async fn redirect_to_backup(State(state): State<AppState>, uri: Uri) -> Result<Redirect> {
    let file_name = uri.path().rsplit('/').next().unwrap_or_default();
    if file_name.is_empty() {
        return Err(AppError::UnknownEndpoint(uri.to_string()));
    }

    Ok(Redirect::temporary(&state.storage.public_url(&public_path(file_name))))
}

async fn unknown_endpoint(uri: Uri) -> AppError {
    AppError::UnknownEndpoint(uri.to_string())
}
