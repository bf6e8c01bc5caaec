//! Database row types: these map directly to SQLite rows.
//! Distinct from sharedspace-types models to keep the DB layer independent.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sharedspace_types::models::{Images, Location, Services};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub owner: bool,
}

pub struct LocationRow {
    pub id: String,
    pub name: String,
    pub location: String,
    pub description: String,
    pub owner: String,
    /// JSON-encoded `Services`.
    pub services: String,
    pub image: Option<String>,
    pub small: Option<String>,
    pub backup: Option<String>,
    pub backup_small: Option<String>,
    /// RFC 3339, fixed microsecond precision so rows sort lexically.
    pub created_at: String,
}

impl LocationRow {
    pub fn from_location(location: &Location) -> Result<Self> {
        Ok(Self {
            id: location.id.to_string(),
            name: location.name.clone(),
            location: location.location.clone(),
            description: location.description.clone(),
            owner: location.owner.to_string(),
            services: serde_json::to_string(&location.services)?,
            image: location.images.image.clone(),
            small: location.images.small.clone(),
            backup: location.images.backup.clone(),
            backup_small: location.images.backup_small.clone(),
            created_at: location.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        })
    }

    pub fn into_location(self) -> Result<Location> {
        let services: Services = serde_json::from_str(&self.services)
            .with_context(|| format!("Corrupt services on location '{}'", self.id))?;

        Ok(Location {
            id: self
                .id
                .parse()
                .with_context(|| format!("Corrupt location id '{}'", self.id))?,
            owner: self
                .owner
                .parse()
                .with_context(|| format!("Corrupt owner '{}' on location '{}'", self.owner, self.id))?,
            created_at: DateTime::parse_from_rfc3339(&self.created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .with_context(|| format!("Corrupt created_at '{}' on location '{}'", self.created_at, self.id))?,
            name: self.name,
            location: self.location,
            description: self.description,
            services,
            images: Images {
                image: self.image,
                small: self.small,
                backup: self.backup,
                backup_small: self.backup_small,
            },
        })
    }
}
