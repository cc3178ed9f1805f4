//! User record repository for CRUD operations

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{ErrorCode, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DbPool;
use crate::{Error, Result};

const SELECT_COLUMNS: &str =
    "SELECT id, full_name, email, phone, address, created_at, updated_at FROM users";

/// A stored user record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new record; all are required
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl UserPatch {
    /// True when no field is set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
    }
}

/// User record repository
#[derive(Clone)]
pub struct UserRepo {
    pool: DbPool,
}

impl UserRepo {
    /// Create a new user repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a record
    ///
    /// # Errors
    ///
    /// Returns `Validation` for missing or malformed fields, `Conflict` if the
    /// email is already taken, or a database error
    pub fn create(&self, new: &NewUser) -> Result<UserRecord> {
        let full_name = required(&new.full_name, "Full name")?;
        let email = normalize_email(&new.email)?;
        let phone = required(&new.phone, "Phone")?;
        let address = required(&new.address, "Address")?;

        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let now = now();
        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            full_name,
            email,
            phone,
            address,
            created_at: now,
            updated_at: now,
        };

        conn.execute(
            "INSERT INTO users (id, full_name, email, phone, address, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            rusqlite::params![
                record.id,
                record.full_name,
                record.email,
                record.phone,
                record.address,
                format_datetime(&now),
            ],
        )
        .map_err(map_write_error)?;

        tracing::debug!(user_id = %record.id, "created user record");
        Ok(record)
    }

    /// List all records, newest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list(&self) -> Result<Vec<UserRecord>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC, rowid DESC"))
            .map_err(|e| Error::Database(e.to_string()))?;

        let users = stmt
            .query_map([], row_to_record)
            .map_err(|e| Error::Database(e.to_string()))?
            .filter_map(std::result::Result::ok)
            .collect();

        Ok(users)
    }

    /// Find a record by ID (returns None if not found)
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find(&self, id: &str) -> Result<Option<UserRecord>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let user = conn
            .query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), [id], row_to_record)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(user)
    }

    /// Merge `patch` into an existing record and refresh `updated_at`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record has this ID, `Validation` or
    /// `Conflict` for bad fields, or a database error
    pub fn update(&self, id: &str, patch: &UserPatch) -> Result<UserRecord> {
        let mut record = self
            .find(id)?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

        if let Some(name) = &patch.full_name {
            record.full_name = required(name, "Full name")?;
        }
        if let Some(email) = &patch.email {
            record.email = normalize_email(email)?;
        }
        if let Some(phone) = &patch.phone {
            record.phone = required(phone, "Phone")?;
        }
        if let Some(address) = &patch.address {
            record.address = required(address, "Address")?;
        }
        record.updated_at = now();

        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let changed = conn
            .execute(
                "UPDATE users SET full_name = ?1, email = ?2, phone = ?3, address = ?4, updated_at = ?5
                 WHERE id = ?6",
                rusqlite::params![
                    record.full_name,
                    record.email,
                    record.phone,
                    record.address,
                    format_datetime(&record.updated_at),
                    id,
                ],
            )
            .map_err(map_write_error)?;

        if changed == 0 {
            return Err(Error::NotFound("User not found".to_string()));
        }

        tracing::debug!(user_id = %id, "updated user record");
        Ok(record)
    }

    /// Delete a record
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no record has this ID, or a database error
    pub fn delete(&self, id: &str) -> Result<()> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let removed = conn
            .execute("DELETE FROM users WHERE id = ?1", [id])
            .map_err(|e| Error::Database(e.to_string()))?;

        if removed == 0 {
            return Err(Error::NotFound("User not found".to_string()));
        }

        tracing::debug!(user_id = %id, "deleted user record");
        Ok(())
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        full_name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        address: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn map_write_error(e: rusqlite::Error) -> Error {
    match &e {
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
            Error::Conflict("A user with this email already exists".to_string())
        }
        _ => Error::Database(e.to_string()),
    }
}

fn required(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Trim and lower-case an email, rejecting anything not shaped like `a@b.c`
fn normalize_email(value: &str) -> Result<String> {
    let email = required(value, "Email")?.to_lowercase();

    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
    }) && !email.chars().any(char::is_whitespace);

    if !valid {
        return Err(Error::Validation("Please enter a valid email address".to_string()));
    }
    Ok(email)
}

/// Current time at the precision stored in the database
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    fn setup() -> UserRepo {
        let pool = init_memory().unwrap();
        UserRepo::new(pool)
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            full_name: "Ada Lovelace".to_string(),
            email: email.to_string(),
            phone: "555-0100".to_string(),
            address: "12 Analytical Row".to_string(),
        }
    }

    #[test]
    fn test_create_and_find() {
        let repo = setup();

        let user = repo.create(&new_user("ada@example.com")).unwrap();
        assert_eq!(user.full_name, "Ada Lovelace");
        assert_eq!(user.created_at, user.updated_at);

        let found = repo.find(&user.id).unwrap().unwrap();
        assert_eq!(found.email, "ada@example.com");
        assert!(repo.find("missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_is_conflict() {
        let repo = setup();

        repo.create(&new_user("ada@example.com")).unwrap();
        let err = repo.create(&new_user("  ADA@example.com ")).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn test_create_validates_fields() {
        let repo = setup();

        let mut missing_phone = new_user("ada@example.com");
        missing_phone.phone = "   ".to_string();
        assert!(matches!(
            repo.create(&missing_phone),
            Err(Error::Validation(msg)) if msg == "Phone is required"
        ));

        assert!(matches!(
            repo.create(&new_user("not-an-email")),
            Err(Error::Validation(_))
        ));
        assert!(repo.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_newest_first() {
        let repo = setup();

        let first = repo.create(&new_user("one@example.com")).unwrap();
        let second = repo.create(&new_user("two@example.com")).unwrap();

        let users = repo.list().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, second.id);
        assert_eq!(users[1].id, first.id);
    }

    #[test]
    fn test_partial_update_merges() {
        let repo = setup();

        let user = repo.create(&new_user("ada@example.com")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));

        let patch = UserPatch {
            phone: Some("555-0199".to_string()),
            ..UserPatch::default()
        };
        let updated = repo.update(&user.id, &patch).unwrap();

        assert_eq!(updated.phone, "555-0199");
        assert_eq!(updated.full_name, user.full_name);
        assert_eq!(updated.email, user.email);
        assert_eq!(updated.address, user.address);
        assert_eq!(updated.created_at, user.created_at);
        assert!(updated.updated_at > user.updated_at);

        let stored = repo.find(&user.id).unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[test]
    fn test_update_to_taken_email_is_conflict() {
        let repo = setup();

        repo.create(&new_user("one@example.com")).unwrap();
        let second = repo.create(&new_user("two@example.com")).unwrap();

        let patch = UserPatch {
            email: Some("one@example.com".to_string()),
            ..UserPatch::default()
        };
        assert!(matches!(repo.update(&second.id, &patch), Err(Error::Conflict(_))));
    }

    #[test]
    fn test_update_and_delete_missing() {
        let repo = setup();

        assert!(matches!(
            repo.update("nope", &UserPatch::default()),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(repo.delete("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_delete() {
        let repo = setup();

        let user = repo.create(&new_user("ada@example.com")).unwrap();
        repo.delete(&user.id).unwrap();
        assert!(repo.find(&user.id).unwrap().is_none());
    }
}
