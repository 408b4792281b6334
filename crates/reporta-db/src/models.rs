//! Database row types. These map directly to SQLite rows and are kept apart
//! from the reporta-types API models so the DB layer stays independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub credential: String,
    pub created_at: String,
}

/// Complaint metadata. The photo BLOB is never loaded here, only its length.
pub struct ComplaintRow {
    pub id: String,
    pub kind: String,
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub owner_id: String,
    pub photo_size: i64,
    pub created_at: String,
}

pub struct NewComplaint<'a> {
    pub id: &'a str,
    pub kind: &'a str,
    pub description: Option<&'a str>,
    pub photo: &'a [u8],
    pub owner_id: &'a str,
    pub latitude: f64,
    pub longitude: f64,
}

/// Partial update. `None` leaves a column untouched; for `description`,
/// `Some(None)` clears it.
#[derive(Default)]
pub struct ComplaintChanges<'a> {
    pub kind: Option<&'a str>,
    pub description: Option<Option<&'a str>>,
    pub photo: Option<&'a [u8]>,
}

impl ComplaintChanges<'_> {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.description.is_none() && self.photo.is_none()
    }
}
