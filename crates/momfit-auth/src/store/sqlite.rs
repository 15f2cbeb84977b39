use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use momfit_core::{Clock, SystemClock, format_timestamp, parse_timestamp};
use rusqlite::{Connection, OptionalExtension, Row};

use super::RoleStore;
use crate::error::AuthError;
use crate::types::*;

pub struct SqliteRoleStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl SqliteRoleStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            clock: Arc::new(SystemClock),
        }
    }

    /// Stamp new rows with `clock` instead of the system time.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn open(path: &str) -> Result<Self, AuthError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000; PRAGMA foreign_keys=ON;",
        )?;
        Ok(Self::new(conn))
    }

    pub fn open_in_memory() -> Result<Self, AuthError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self::new(conn))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, AuthError> {
        self.conn
            .lock()
            .map_err(|_| AuthError::Internal("role store connection poisoned".into()))
    }
}

const MIGRATE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS roles (
    id TEXT PRIMARY KEY,
    name TEXT UNIQUE NOT NULL,
    access_level TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    permissions TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_roles (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    role_id TEXT NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
    community_id TEXT,
    assigned_by TEXT,
    assigned_at TEXT NOT NULL,
    expires_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_user_roles_user ON user_roles(user_id);
"#;

const ROLE_COLUMNS: &str = "id, name, access_level, description, permissions, created_at";

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, msg.into())
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<chrono::DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| conversion_error(idx, format!("bad timestamp '{raw}'")))
}

fn optional_timestamp_column(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<chrono::DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| conversion_error(idx, format!("bad timestamp '{raw}'"))),
        None => Ok(None),
    }
}

/// Map a role starting at column `offset`, in `ROLE_COLUMNS` order.
fn role_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Role> {
    let level: String = row.get(offset + 2)?;
    let grants: String = row.get(offset + 4)?;
    Ok(Role {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        access_level: level
            .parse::<AccessLevel>()
            .map_err(|e| conversion_error(offset + 2, e.to_string()))?,
        description: row.get(offset + 3)?,
        permissions: serde_json::from_str(&grants)
            .map_err(|e| conversion_error(offset + 4, e.to_string()))?,
        created_at: timestamp_column(row, offset + 5)?,
    })
}

fn grants_json(grants: &[Permission]) -> Result<String, AuthError> {
    serde_json::to_string(grants).map_err(|e| AuthError::Internal(e.to_string()))
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.extended_code == 2067
    )
}

#[async_trait]
impl RoleStore for SqliteRoleStore {
    async fn migrate(&self) -> Result<(), AuthError> {
        let conn = self.conn()?;
        conn.execute_batch(MIGRATE_SQL)?;
        Ok(())
    }

    async fn seed_defaults(&self) -> Result<(), AuthError> {
        super::seed::seed_defaults(self).await
    }

    // --- Roles ---

    async fn create_role(&self, req: &CreateRoleRequest) -> Result<Role, AuthError> {
        if req.name.trim().is_empty() {
            return Err(AuthError::InvalidInput("role name must not be empty".into()));
        }
        let id = {
            let conn = self.conn()?;
            let id = uuid::Uuid::now_v7().to_string();
            conn.execute(
                "INSERT INTO roles (id, name, access_level, description, permissions, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    id,
                    req.name,
                    req.access_level.to_string(),
                    req.description,
                    grants_json(&req.permissions)?,
                    format_timestamp(&self.clock.now()),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AuthError::Duplicate(format!("role '{}' already exists", req.name))
                } else {
                    AuthError::Database(e.to_string())
                }
            })?;
            id
        };
        self.get_role(&id).await
    }

    async fn get_role(&self, id: &str) -> Result<Role, AuthError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = ?1"),
            [id],
            |row| role_from_row(row, 0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AuthError::NotFound("role".into()),
            _ => AuthError::Database(e.to_string()),
        })
    }

    async fn get_role_by_name(&self, name: &str) -> Result<Role, AuthError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {ROLE_COLUMNS} FROM roles WHERE name = ?1"),
            [name],
            |row| role_from_row(row, 0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AuthError::NotFound("role".into()),
            _ => AuthError::Database(e.to_string()),
        })
    }

    async fn list_roles(&self) -> Result<Vec<Role>, AuthError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {ROLE_COLUMNS} FROM roles ORDER BY name"))?;
        let roles = stmt
            .query_map([], |row| role_from_row(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(roles)
    }

    async fn update_role(&self, id: &str, req: &UpdateRoleRequest) -> Result<Role, AuthError> {
        {
            let conn = self.conn()?;
            let exists = conn
                .query_row("SELECT 1 FROM roles WHERE id = ?1", [id], |_| Ok(()))
                .optional()?;
            if exists.is_none() {
                return Err(AuthError::NotFound("role".into()));
            }
            if let Some(ref description) = req.description {
                conn.execute(
                    "UPDATE roles SET description = ?1 WHERE id = ?2",
                    rusqlite::params![description, id],
                )?;
            }
            if let Some(level) = req.access_level {
                conn.execute(
                    "UPDATE roles SET access_level = ?1 WHERE id = ?2",
                    rusqlite::params![level.to_string(), id],
                )?;
            }
            if let Some(ref grants) = req.permissions {
                conn.execute(
                    "UPDATE roles SET permissions = ?1 WHERE id = ?2",
                    rusqlite::params![grants_json(grants)?, id],
                )?;
            }
        }
        self.get_role(id).await
    }

    // --- Assignments ---

    async fn insert_assignment(&self, assignment: &NewAssignment) -> Result<String, AuthError> {
        let conn = self.conn()?;
        let id = uuid::Uuid::now_v7().to_string();
        conn.execute(
            "INSERT INTO user_roles
                 (id, user_id, role_id, community_id, assigned_by, assigned_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                id,
                assignment.user_id,
                assignment.role_id,
                assignment.community_id,
                assignment.assigned_by,
                format_timestamp(&assignment.assigned_at),
                assignment.expires_at.as_ref().map(format_timestamp),
            ],
        )?;
        Ok(id)
    }

    async fn delete_assignment(
        &self,
        user_id: &str,
        assignment_id: &str,
    ) -> Result<(), AuthError> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM user_roles WHERE id = ?1 AND user_id = ?2",
            rusqlite::params![assignment_id, user_id],
        )?;
        if deleted == 0 {
            return Err(AuthError::NotFound("assignment".into()));
        }
        Ok(())
    }

    async fn list_user_assignments(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserRoleAssignment>, AuthError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT ur.id, ur.user_id, ur.community_id, ur.assigned_by,
                    ur.assigned_at, ur.expires_at,
                    r.id, r.name, r.access_level, r.description, r.permissions, r.created_at
             FROM user_roles ur
             JOIN roles r ON r.id = ur.role_id
             WHERE ur.user_id = ?1
             ORDER BY ur.assigned_at, ur.id",
        )?;
        let assignments = stmt
            .query_map([user_id], |row| {
                Ok(UserRoleAssignment {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    community_id: row.get(2)?,
                    assigned_by: row.get(3)?,
                    assigned_at: timestamp_column(row, 4)?,
                    expires_at: optional_timestamp_column(row, 5)?,
                    role: role_from_row(row, 6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(assignments)
    }
}
