use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Amenities offered by a location. Every flag defaults to `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Services {
    pub all_day_access: bool,
    pub air_conditioning: bool,
    pub kitchen: bool,
    pub free_tea_coffee: bool,
    pub event_management: bool,
    pub free_trial: bool,
    pub wifi: bool,
    pub meeting_room: bool,
    pub reception: bool,
    pub parking: bool,
    pub photocopier: bool,
    pub printer: bool,
    pub projector: bool,
    pub scanner: bool,
    pub tv: bool,
    pub whiteboard: bool,
}

impl Services {
    /// Wire names of every service flag, as they appear in JSON and in the
    /// `services` query filter.
    pub const FLAGS: [&'static str; 16] = [
        "allDayAccess",
        "airConditioning",
        "kitchen",
        "freeTeaCoffee",
        "eventManagement",
        "freeTrial",
        "wifi",
        "meetingRoom",
        "reception",
        "parking",
        "photocopier",
        "printer",
        "projector",
        "scanner",
        "tv",
        "whiteboard",
    ];

    pub fn is_flag(name: &str) -> bool {
        Self::FLAGS.contains(&name)
    }
}

/// Image references stored with a location.
///
/// `image` and `small` are public paths relative to the server root
/// (`uploads/<file>`); the backup fields hold object-storage URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Images {
    pub image: Option<String>,
    pub small: Option<String>,
    pub backup: Option<String>,
    pub backup_small: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub description: String,
    pub owner: Uuid,
    pub services: Services,
    pub images: Images,
    pub created_at: DateTime<Utc>,
}
