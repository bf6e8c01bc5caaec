use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        multipart::{Multipart, MultipartRejection},
        rejection::QueryRejection,
    },
    http::{StatusCode, Uri},
    response::IntoResponse,
};
use bytes::BytesMut;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use sharedspace_db::LocationFilter;
use sharedspace_db::models::LocationRow;
use sharedspace_types::api::{Claims, ListQuery, LocationEnvelope, LocationPage, LocationResponse, MessageResponse};
use sharedspace_types::models::{Images, Location, Services};

use crate::error::{AppError, Result};
use crate::images::{ImageUpload, check_image_format, process_upload, resolve_images};
use crate::origin::RequestOrigin;
use crate::pagination::{PageParams, page_links};
use crate::state::{AppState, with_db};

/// Text fields and the optional image of a create/edit form.
#[derive(Debug)]
pub struct LocationForm {
    pub name: String,
    pub location: String,
    pub description: String,
    pub services: Services,
    pub image: Option<ImageUpload>,
}

impl LocationForm {
    /// Read every part of the form. The image is format-checked before its
    /// bytes are read and is refused once it grows past `max_image_size`.
    pub async fn from_multipart(mut multipart: Multipart, max_image_size: usize) -> Result<Self> {
        let mut name = String::new();
        let mut location = String::new();
        let mut description = String::new();
        let mut services_raw = None;
        let mut image = None;

        while let Some(mut field) = multipart.next_field().await? {
            let field_name = field.name().unwrap_or_default().to_string();

            match field_name.as_str() {
                "name" => name = field.text().await?,
                "location" => location = field.text().await?,
                "description" => description = field.text().await?,
                "services" => services_raw = Some(field.text().await?),
                "image" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let content_type = field.content_type().unwrap_or_default().to_string();
                    if file_name.is_empty() {
                        continue;
                    }
                    check_image_format(&file_name, &content_type)?;

                    let mut bytes = BytesMut::new();
                    while let Some(chunk) = field.chunk().await? {
                        if bytes.len() + chunk.len() > max_image_size {
                            return Err(AppError::PayloadTooLarge);
                        }
                        bytes.extend_from_slice(&chunk);
                    }

                    if !bytes.is_empty() {
                        image = Some(ImageUpload {
                            file_name,
                            content_type,
                            bytes: bytes.freeze(),
                        });
                    }
                }
                other => debug!("Ignoring form field '{}'", other),
            }
        }

        let mut problems = Vec::new();
        if name.trim().is_empty() {
            problems.push("Name is required");
        }
        if location.trim().is_empty() {
            problems.push("Location is required");
        }
        if !problems.is_empty() {
            return Err(AppError::Validation(problems.join("\n")));
        }

        let services = match services_raw.as_deref().map(str::trim) {
            None | Some("") => Services::default(),
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| AppError::Validation(format!("Invalid services: {e}")))?,
        };

        Ok(Self {
            name,
            location,
            description,
            services,
            image,
        })
    }
}

pub async fn add_location(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    origin: RequestOrigin,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse> {
    let form = LocationForm::from_multipart(multipart?, state.config.max_upload_size).await?;

    let images = match form.image {
        Some(upload) => process_upload(&state, upload).await?,
        None => Images::default(),
    };

    let location = Location {
        id: Uuid::new_v4(),
        name: form.name,
        location: form.location,
        description: form.description,
        owner: claims.id,
        services: form.services,
        images,
        created_at: Utc::now(),
    };

    let row = LocationRow::from_location(&location).map_err(AppError::Database)?;
    with_db(&state, move |db| db.insert_location(&row)).await?;

    info!("User {} created location {} ({})", claims.username, location.id, location.name);
    let location = render(&state, &origin, location).await;
    Ok((StatusCode::CREATED, Json(LocationEnvelope { location })))
}

pub async fn get_locations(
    State(state): State<AppState>,
    origin: RequestOrigin,
    uri: Uri,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<LocationPage>> {
    let Query(query) = query?;
    let params = PageParams::from_query(query)?;

    list_page(&state, &origin, uri.path(), params, None).await
}

pub async fn get_my_locations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    origin: RequestOrigin,
    uri: Uri,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<LocationPage>> {
    let Query(query) = query?;
    let params = PageParams::from_query(query)?;

    list_page(&state, &origin, uri.path(), params, Some(claims.id)).await
}

pub async fn get_location_by_id(
    State(state): State<AppState>,
    origin: RequestOrigin,
    Path(location_id): Path<String>,
) -> Result<Json<LocationEnvelope>> {
    let location = find_location(&state, &location_id).await?;

    Ok(Json(LocationEnvelope {
        location: render(&state, &origin, location).await,
    }))
}

pub async fn update_location(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    origin: RequestOrigin,
    Path(location_id): Path<String>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<LocationEnvelope>> {
    let existing = find_location(&state, &location_id).await?;
    ensure_owner(&existing, &claims)?;

    let form = LocationForm::from_multipart(multipart?, state.config.max_upload_size).await?;

    let images = match form.image {
        Some(upload) => process_upload(&state, upload).await?,
        None => existing.images,
    };

    let updated = Location {
        name: form.name,
        location: form.location,
        description: form.description,
        services: form.services,
        images,
        ..existing
    };

    let row = LocationRow::from_location(&updated).map_err(AppError::Database)?;
    let found = with_db(&state, move |db| db.update_location(&row)).await?;
    if !found {
        return Err(AppError::LocationNotFound);
    }

    info!("User {} updated location {}", claims.username, updated.id);
    Ok(Json(LocationEnvelope {
        location: render(&state, &origin, updated).await,
    }))
}

pub async fn delete_location(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(location_id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let existing = find_location(&state, &location_id).await?;
    ensure_owner(&existing, &claims)?;

    let id = existing.id.to_string();
    let deleted = with_db(&state, move |db| db.delete_location(&id)).await?;
    if !deleted {
        return Err(AppError::LocationNotFound);
    }

    info!("User {} deleted location {}", claims.username, existing.id);
    Ok(Json(MessageResponse::new("Location deleted successfully")))
}

async fn find_location(state: &AppState, raw_id: &str) -> Result<Location> {
    let id: Uuid = raw_id.parse().map_err(|_| AppError::InvalidId)?;
    let key = id.to_string();

    with_db(state, move |db| db.get_location(&key))
        .await?
        .ok_or(AppError::LocationNotFound)?
        .into_location()
        .map_err(AppError::Database)
}

fn ensure_owner(location: &Location, claims: &Claims) -> Result<()> {
    if location.owner == claims.id {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "user {} does not own location {}",
            claims.id, location.id
        )))
    }
}

async fn list_page(
    state: &AppState,
    origin: &RequestOrigin,
    route_path: &str,
    params: PageParams,
    owner: Option<Uuid>,
) -> Result<Json<LocationPage>> {
    let filter = LocationFilter {
        owner: owner.map(|id| id.to_string()),
        services: params.services.clone(),
    };
    let (limit, offset) = (params.limit, params.offset());

    let (rows, count) = with_db(state, move |db| {
        let rows = db.list_locations(&filter, limit, offset)?;
        let count = db.count_locations(&filter)?;
        Ok((rows, count))
    })
    .await?;

    let links = page_links(
        params.page,
        params.limit,
        count,
        &origin.url_for(route_path),
        params.services_filter().as_deref(),
    );

    let mut locations = Vec::with_capacity(rows.len());
    for row in rows {
        let location = row.into_location().map_err(AppError::Database)?;
        locations.push(render(state, origin, location).await);
    }

    Ok(Json(LocationPage {
        count,
        next: links.next,
        previous: links.previous,
        locations,
    }))
}

async fn render(state: &AppState, origin: &RequestOrigin, location: Location) -> LocationResponse {
    let images = resolve_images(&location.images, origin, &state.config.upload_path).await;
    LocationResponse::new(location, images)
}
