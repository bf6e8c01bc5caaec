use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Location, Services};

// -- JWT Claims --

/// Identity carried by every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    pub id: Uuid,
    pub owner: bool,
    pub exp: usize,
}

// -- Users --

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub owner: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// -- Locations --

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub services: Option<String>,
}

/// Image URLs as handed to clients: either absolute local URLs or backup URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedImages {
    pub image: Option<String>,
    pub small: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationResponse {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub description: String,
    pub owner: Uuid,
    pub services: Services,
    pub images: ResolvedImages,
}

impl LocationResponse {
    pub fn new(location: Location, images: ResolvedImages) -> Self {
        Self {
            id: location.id,
            name: location.name,
            location: location.location,
            description: location.description,
            owner: location.owner,
            services: location.services,
            images,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LocationEnvelope {
    pub location: LocationResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LocationPage {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub locations: Vec<LocationResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
