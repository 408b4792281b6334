use crate::Database;
use crate::models::{ComplaintChanges, ComplaintRow, NewComplaint, UserRow};
use anyhow::Result;
use rusqlite::types::ToSql;
use rusqlite::{Connection, Row};

const COMPLAINT_COLUMNS: &str =
    "id, type, description, latitude, longitude, owner_id, length(photo), created_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, credential_hash: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, credential) VALUES (?1, ?2, ?3)",
                (id, username, credential_hash),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn get_user_id_by_username(&self, username: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id FROM users WHERE username = ?1",
                [username],
                |row| row.get(0),
            )
            .optional()
        })
    }

    // -- Complaints --

    pub fn insert_complaint(&self, new: &NewComplaint<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO complaints (id, type, photo, description, owner_id, latitude, longitude)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    new.id,
                    new.kind,
                    new.photo,
                    new.description,
                    new.owner_id,
                    new.latitude,
                    new.longitude,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_complaint(&self, id: &str) -> Result<Option<ComplaintRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = ?1");
            conn.query_row(&sql, [id], map_complaint_row).optional()
        })
    }

    /// Record and photo read in one statement, so a concurrent delete can't
    /// split them.
    pub fn get_complaint_with_photo(&self, id: &str) -> Result<Option<(ComplaintRow, Vec<u8>)>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {COMPLAINT_COLUMNS}, photo FROM complaints WHERE id = ?1");
            conn.query_row(&sql, [id], |row| {
                let photo: Option<Vec<u8>> = row.get(8)?;
                Ok((map_complaint_row(row)?, photo.unwrap_or_default()))
            })
            .optional()
        })
    }

    /// Every complaint, newest first. No pagination.
    pub fn list_complaints(&self) -> Result<Vec<ComplaintRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {COMPLAINT_COLUMNS} FROM complaints ORDER BY created_at DESC, id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_complaint_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_complaint_owner(&self, id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT owner_id FROM complaints WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn get_complaint_photo(&self, id: &str) -> Result<Option<Vec<u8>>> {
        self.with_conn(|conn| {
            let photo: Option<Option<Vec<u8>>> = conn
                .query_row("SELECT photo FROM complaints WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(photo.flatten().filter(|bytes| !bytes.is_empty()))
        })
    }

    /// Apply `changes` in a single statement guarded by both id and owner.
    /// Returns false when no row matched, i.e. the complaint is gone or
    /// changed hands since the caller last looked.
    pub fn update_complaint(
        &self,
        id: &str,
        owner_id: &str,
        changes: &ComplaintChanges<'_>,
    ) -> Result<bool> {
        if changes.is_empty() {
            return Ok(false);
        }

        let mut assignments: Vec<String> = Vec::with_capacity(3);
        let mut params: Vec<&dyn ToSql> = Vec::with_capacity(5);

        if let Some(kind) = &changes.kind {
            params.push(kind);
            assignments.push(format!("type = ?{}", params.len()));
        }
        if let Some(description) = &changes.description {
            params.push(description);
            assignments.push(format!("description = ?{}", params.len()));
        }
        if let Some(photo) = &changes.photo {
            params.push(photo);
            assignments.push(format!("photo = ?{}", params.len()));
        }

        params.push(&id);
        let id_idx = params.len();
        params.push(&owner_id);
        let owner_idx = params.len();

        let sql = format!(
            "UPDATE complaints SET {} WHERE id = ?{} AND owner_id = ?{}",
            assignments.join(", "),
            id_idx,
            owner_idx
        );

        self.with_conn_mut(|conn| {
            let changed = conn.execute(&sql, params.as_slice())?;
            Ok(changed > 0)
        })
    }

    /// Delete guarded by both id and owner. Returns false when nothing matched.
    pub fn delete_complaint(&self, id: &str, owner_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM complaints WHERE id = ?1 AND owner_id = ?2",
                [id, owner_id],
            )?;
            Ok(deleted > 0)
        })
    }
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn
        .prepare("SELECT id, username, credential, created_at FROM users WHERE username = ?1")?;

    stmt.query_row([username], |row| {
        Ok(UserRow {
            id: row.get(0)?,
            username: row.get(1)?,
            credential: row.get(2)?,
            created_at: row.get(3)?,
        })
    })
    .optional()
}

fn map_complaint_row(row: &Row<'_>) -> rusqlite::Result<ComplaintRow> {
    Ok(ComplaintRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        description: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        owner_id: row.get(5)?,
        photo_size: row.get::<_, Option<i64>>(6)?.unwrap_or(0),
        created_at: row.get(7)?,
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
