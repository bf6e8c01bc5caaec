use crate::Database;
use crate::models::{LocationRow, UserRow};
use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{Connection, ErrorCode, Row, params_from_iter};

const LOCATION_COLUMNS: &str = "id, name, location, description, owner, services, image, small, backup, backup_small, created_at";

/// Restricts location listings. Service names must already be validated
/// against `Services::FLAGS`; they are bound as JSON paths, never spliced
/// into the SQL text.
#[derive(Debug, Clone, Default)]
pub struct LocationFilter {
    pub owner: Option<String>,
    pub services: Vec<String>,
}

impl LocationFilter {
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        if let Some(owner) = &self.owner {
            params.push(Value::Text(owner.clone()));
            conditions.push(format!("owner = ?{}", params.len()));
        }

        for service in &self.services {
            params.push(Value::Text(format!("$.{service}")));
            conditions.push(format!("json_extract(services, ?{}) = 1", params.len()));
        }

        if conditions.is_empty() {
            (String::new(), params)
        } else {
            (format!(" WHERE {}", conditions.join(" AND ")), params)
        }
    }
}

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str, owner: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, owner) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, username, password_hash, owner],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    // -- Locations --

    pub fn insert_location(&self, row: &LocationRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                &format!("INSERT INTO locations ({LOCATION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
                rusqlite::params![
                    row.id,
                    row.name,
                    row.location,
                    row.description,
                    row.owner,
                    row.services,
                    row.image,
                    row.small,
                    row.backup,
                    row.backup_small,
                    row.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_location(&self, id: &str) -> Result<Option<LocationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {LOCATION_COLUMNS} FROM locations WHERE id = ?1"))?;
            let row = stmt.query_row([id], location_from_row).optional()?;
            Ok(row)
        })
    }

    /// Replaces every mutable column of an existing location.
    /// Returns false when no row has the given id.
    pub fn update_location(&self, row: &LocationRow) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE locations
                 SET name = ?2, location = ?3, description = ?4, services = ?5,
                     image = ?6, small = ?7, backup = ?8, backup_small = ?9
                 WHERE id = ?1",
                rusqlite::params![
                    row.id,
                    row.name,
                    row.location,
                    row.description,
                    row.services,
                    row.image,
                    row.small,
                    row.backup,
                    row.backup_small,
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_location(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM locations WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// One page of locations matching `filter`, oldest first.
    pub fn list_locations(&self, filter: &LocationFilter, limit: u32, offset: u64) -> Result<Vec<LocationRow>> {
        self.with_conn(|conn| {
            let (where_clause, mut params) = filter.where_clause();
            params.push(Value::Integer(i64::from(limit)));
            let limit_idx = params.len();
            params.push(Value::Integer(i64::try_from(offset)?));
            let offset_idx = params.len();

            let sql = format!(
                "SELECT {LOCATION_COLUMNS} FROM locations{where_clause}
                 ORDER BY created_at, rowid
                 LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(params), location_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn count_locations(&self, filter: &LocationFilter) -> Result<u64> {
        self.with_conn(|conn| {
            let (where_clause, params) = filter.where_clause();
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM locations{where_clause}"),
                params_from_iter(params),
                |row| row.get(0),
            )?;
            Ok(u64::try_from(count)?)
        })
    }
}

/// True when `err` is a SQLite UNIQUE/constraint violation, e.g. a taken username.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation
    )
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, owner FROM users WHERE username = ?1")?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                owner: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn location_from_row(row: &Row<'_>) -> rusqlite::Result<LocationRow> {
    Ok(LocationRow {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        description: row.get(3)?,
        owner: row.get(4)?,
        services: row.get(5)?,
        image: row.get(6)?,
        small: row.get(7)?,
        backup: row.get(8)?,
        backup_small: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use sharedspace_types::models::{Images, Location, Services};
    use tempfile::TempDir;
    use uuid::Uuid;

    fn open_db(dir: &TempDir) -> Database {
        Database::open(&dir.path().join("test.db")).unwrap()
    }

    fn location(owner: Uuid, name: &str, services: Services, offset_secs: i64) -> Location {
        Location {
            id: Uuid::new_v4(),
            name: name.to_string(),
            location: "Barcelona".to_string(),
            description: String::new(),
            owner,
            services,
            images: Images::default(),
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn duplicate_username_is_a_unique_violation() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        db.create_user("a", "mario", "hash", false).unwrap();
        let err = db.create_user("b", "mario", "hash", true).unwrap_err();

        assert!(is_unique_violation(&err));
    }

    #[test]
    fn other_errors_are_not_unique_violations() {
        let err = anyhow::anyhow!("duplicate key, but not from sqlite");
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn location_row_survives_a_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let mut original = location(Uuid::new_v4(), "Cowork", Services { wifi: true, ..Default::default() }, 0);
        original.images.backup = Some("https://cdn.example.com/a.webp".to_string());

        db.insert_location(&LocationRow::from_location(&original).unwrap()).unwrap();
        let stored = db
            .get_location(&original.id.to_string())
            .unwrap()
            .unwrap()
            .into_location()
            .unwrap();

        assert_eq!(stored.id, original.id);
        assert_eq!(stored.services, original.services);
        assert_eq!(stored.images, original.images);
    }

    #[test]
    fn filters_combine_owner_and_services() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let wifi = Services { wifi: true, ..Default::default() };
        let wifi_and_tv = Services { wifi: true, tv: true, ..Default::default() };

        for (i, (owner, services)) in [(alice, wifi), (alice, wifi_and_tv), (bob, wifi_and_tv), (bob, Services::default())]
            .into_iter()
            .enumerate()
        {
            let loc = location(owner, &format!("loc-{i}"), services, i as i64);
            db.insert_location(&LocationRow::from_location(&loc).unwrap()).unwrap();
        }

        let all = LocationFilter::default();
        assert_eq!(db.count_locations(&all).unwrap(), 4);

        let wifi_tv = LocationFilter {
            owner: None,
            services: vec!["wifi".to_string(), "tv".to_string()],
        };
        assert_eq!(db.count_locations(&wifi_tv).unwrap(), 2);

        let alice_tv = LocationFilter {
            owner: Some(alice.to_string()),
            services: vec!["tv".to_string()],
        };
        let rows = db.list_locations(&alice_tv, 10, 0).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "loc-1");
    }

    #[test]
    fn list_pages_in_creation_order() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let owner = Uuid::new_v4();

        for i in 0..5 {
            let loc = location(owner, &format!("loc-{i}"), Services::default(), i);
            db.insert_location(&LocationRow::from_location(&loc).unwrap()).unwrap();
        }

        let page = db.list_locations(&LocationFilter::default(), 2, 2).unwrap();
        let names: Vec<_> = page.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["loc-2", "loc-3"]);
    }

    #[test]
    fn update_and_delete_report_missing_rows() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);
        let loc = location(Uuid::new_v4(), "Ghost", Services::default(), 0);
        let row = LocationRow::from_location(&loc).unwrap();

        assert!(!db.update_location(&row).unwrap());
        assert!(!db.delete_location(&row.id).unwrap());

        db.insert_location(&row).unwrap();
        assert!(db.delete_location(&row.id).unwrap());
        assert!(db.get_location(&row.id).unwrap().is_none());
    }
}
