use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{
        Path, Query, State,
        rejection::{BytesRejection, JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use reporta_db::Database;
use reporta_db::is_foreign_key_violation;
use reporta_db::models::{ComplaintChanges, ComplaintRow, NewComplaint};
use reporta_types::api::{
    ComplaintResponse, CreateComplaintRequest, CreateComplaintResponse, DeleteComplaintQuery,
    StatusResponse, UpdateComplaintRequest, UploadComplaintQuery,
};
use reporta_types::models::Complaint;

use crate::auth::AuthStore;
use crate::error::ApiError;
use crate::geo::Coordinates;
use crate::ownership;
use crate::photo;
use crate::run_blocking;
use crate::state::AppState;

const MAX_KIND_LEN: usize = 64;

/// A complaint submission that has passed validation.
#[derive(Debug)]
pub struct NewComplaintInput {
    pub owner_username: String,
    pub kind: String,
    pub description: Option<String>,
    pub photo: Vec<u8>,
    pub location: Coordinates,
}

impl NewComplaintInput {
    pub fn new(
        owner_username: String,
        kind: String,
        description: Option<String>,
        photo: Vec<u8>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self, ApiError> {
        if owner_username.is_empty() {
            return Err(ApiError::invalid("username is required"));
        }
        Ok(Self {
            owner_username,
            kind: validate_kind(kind)?,
            description: normalize_description(description),
            photo: photo::check_photo_bytes(photo)?,
            location: Coordinates::new(latitude, longitude)?,
        })
    }
}

/// Fields to change on an existing complaint. `description: Some(None)` clears it.
#[derive(Debug, Default)]
pub struct ComplaintUpdate {
    pub kind: Option<String>,
    pub description: Option<Option<String>>,
    pub photo: Option<Vec<u8>>,
}

impl ComplaintUpdate {
    pub fn new(
        kind: Option<String>,
        description: Option<String>,
        photo: Option<Vec<u8>>,
    ) -> Result<Self, ApiError> {
        let update = Self {
            kind: kind.map(validate_kind).transpose()?,
            description: description.map(|d| normalize_description(Some(d))),
            photo: photo.map(photo::check_photo_bytes).transpose()?,
        };
        if update.kind.is_none() && update.description.is_none() && update.photo.is_none() {
            return Err(ApiError::invalid("nothing to update"));
        }
        Ok(update)
    }
}

fn validate_kind(kind: String) -> Result<String, ApiError> {
    let kind = kind.trim();
    if kind.is_empty() {
        return Err(ApiError::invalid("type is required"));
    }
    if kind.chars().count() > MAX_KIND_LEN {
        return Err(ApiError::invalid(format!(
            "type must be at most {} characters",
            MAX_KIND_LEN
        )));
    }
    Ok(kind.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description.filter(|d| !d.trim().is_empty())
}

/// Owns the complaints table. Mutations go through [`ownership::authorize`]
/// against the persisted owner.
#[derive(Clone)]
pub struct ComplaintStore {
    db: Arc<Database>,
    auth: AuthStore,
}

impl ComplaintStore {
    pub fn new(db: Arc<Database>, auth: AuthStore) -> Self {
        Self { db, auth }
    }

    pub fn create(&self, input: NewComplaintInput) -> Result<Uuid, ApiError> {
        let owner_id = self
            .auth
            .resolve_user_id(&input.owner_username)?
            .ok_or(ApiError::NotFound("User"))?;

        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let owner_str = owner_id.to_string();

        self.db
            .insert_complaint(&NewComplaint {
                id: &id_str,
                kind: &input.kind,
                description: input.description.as_deref(),
                photo: &input.photo,
                owner_id: &owner_str,
                latitude: input.location.latitude,
                longitude: input.location.longitude,
            })
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    ApiError::NotFound("User")
                } else {
                    ApiError::Internal(e)
                }
            })?;

        info!(
            "Complaint {} ({}) created by {} with {} byte photo",
            id,
            input.kind,
            input.owner_username,
            input.photo.len()
        );
        Ok(id)
    }

    pub fn get_by_id(&self, id: Uuid) -> Result<Complaint, ApiError> {
        let row = self
            .db
            .get_complaint(&id.to_string())?
            .ok_or(ApiError::NotFound("Complaint"))?;
        complaint_from_row(row)
    }

    /// Complaint plus its photo bytes, from a single read.
    pub fn get_with_photo(&self, id: Uuid) -> Result<(Complaint, Vec<u8>), ApiError> {
        let (row, photo) = self
            .db
            .get_complaint_with_photo(&id.to_string())?
            .ok_or(ApiError::NotFound("Complaint"))?;
        Ok((complaint_from_row(row)?, photo))
    }

    /// Every complaint, newest first. Unpaginated.
    pub fn list_all(&self) -> Result<Vec<Complaint>, ApiError> {
        self.db
            .list_complaints()?
            .into_iter()
            .map(complaint_from_row)
            .collect()
    }

    pub fn update(&self, id: Uuid, caller: Uuid, update: ComplaintUpdate) -> Result<(), ApiError> {
        let owner = self.persisted_owner(id)?;
        self.authorize(id, owner, caller)?;

        let changes = ComplaintChanges {
            kind: update.kind.as_deref(),
            description: update.description.as_ref().map(|d| d.as_deref()),
            photo: update.photo.as_deref(),
        };
        // Zero rows means the complaint vanished between the owner read and now.
        if !self
            .db
            .update_complaint(&id.to_string(), &owner.to_string(), &changes)?
        {
            return Err(ApiError::NotFound("Complaint"));
        }

        info!("Complaint {} updated by {}", id, caller);
        Ok(())
    }

    pub fn delete_by_id(&self, id: Uuid, caller: Uuid) -> Result<(), ApiError> {
        let owner = self.persisted_owner(id)?;
        self.authorize(id, owner, caller)?;

        if !self
            .db
            .delete_complaint(&id.to_string(), &owner.to_string())?
        {
            return Err(ApiError::NotFound("Complaint"));
        }

        info!("Complaint {} deleted by {}", id, caller);
        Ok(())
    }

    pub fn get_photo(&self, id: Uuid) -> Result<Vec<u8>, ApiError> {
        self.db
            .get_complaint_photo(&id.to_string())?
            .ok_or(ApiError::NotFound("Photo"))
    }

    fn persisted_owner(&self, id: Uuid) -> Result<Uuid, ApiError> {
        let owner = self
            .db
            .get_complaint_owner(&id.to_string())?
            .ok_or(ApiError::NotFound("Complaint"))?;
        parse_stored_uuid(&owner)
    }

    fn authorize(&self, id: Uuid, owner: Uuid, caller: Uuid) -> Result<(), ApiError> {
        ownership::authorize(owner, caller).require().inspect_err(|_| {
            warn!("Rejected mutation of complaint {} by non-owner {}", id, caller);
        })
    }
}

/// Path ids that are not UUIDs cannot name a complaint.
pub fn parse_complaint_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse().map_err(|_| ApiError::NotFound("Complaint"))
}

pub(crate) fn complaint_from_row(row: ComplaintRow) -> Result<Complaint, ApiError> {
    Ok(Complaint {
        id: parse_stored_uuid(&row.id)?,
        owner_id: parse_stored_uuid(&row.owner_id)?,
        created_at: parse_sqlite_timestamp(&row.created_at)?,
        kind: row.kind,
        description: row.description,
        latitude: row.latitude,
        longitude: row.longitude,
        photo_size: u64::try_from(row.photo_size).unwrap_or(0),
    })
}

fn parse_stored_uuid(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Corrupt id '{}': {}", raw, e)))
}

// SQLite's datetime('now') yields "YYYY-MM-DD HH:MM:SS" without a zone; it is UTC.
fn parse_sqlite_timestamp(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Corrupt created_at '{}': {}", raw, e)))
}

// -- Handlers --

/// POST /complaints — JSON body with the photo as base64 / data URL.
pub async fn create_complaint(
    State(state): State<AppState>,
    payload: Result<Json<CreateComplaintRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let photo = photo::decode_photo_text(&req.photo)?;
    let input = NewComplaintInput::new(
        req.username,
        req.kind,
        req.description,
        photo,
        req.latitude,
        req.longitude,
    )?;
    store_new_complaint(state, input).await
}

/// POST /complaints/upload — raw photo bytes as the body, metadata in the query.
pub async fn upload_complaint(
    State(state): State<AppState>,
    query: Result<Query<UploadComplaintQuery>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(meta) = query?;
    let body = body?;
    let input = NewComplaintInput::new(
        meta.username,
        meta.kind,
        meta.description,
        body.to_vec(),
        meta.latitude,
        meta.longitude,
    )?;
    store_new_complaint(state, input).await
}

async fn store_new_complaint(
    state: AppState,
    input: NewComplaintInput,
) -> Result<impl IntoResponse, ApiError> {
    let store = state.complaints.clone();
    let id = run_blocking(move || store.create(input)).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateComplaintResponse {
            success: true,
            message: "Complaint registered".into(),
            id,
        }),
    ))
}

/// GET /complaints
pub async fn list_complaints(
    State(state): State<AppState>,
) -> Result<Json<Vec<ComplaintResponse>>, ApiError> {
    let store = state.complaints.clone();
    let complaints = run_blocking(move || store.list_all()).await?;

    Ok(Json(
        complaints
            .into_iter()
            .map(|complaint| ComplaintResponse {
                complaint,
                photo: None,
                distance_km: None,
            })
            .collect(),
    ))
}

/// GET /complaints/{id} — full record with the photo inlined as base64.
pub async fn get_complaint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ComplaintResponse>, ApiError> {
    let id = parse_complaint_id(&id)?;
    let store = state.complaints.clone();
    let (complaint, photo_bytes) = run_blocking(move || store.get_with_photo(id)).await?;

    Ok(Json(ComplaintResponse {
        complaint,
        photo: Some(photo::encode_photo(&photo_bytes)),
        distance_km: None,
    }))
}

/// GET /complaints/photo/{id} — raw image bytes.
pub async fn get_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_complaint_id(&id).map_err(|_| ApiError::NotFound("Photo"))?;
    let store = state.complaints.clone();
    let bytes = run_blocking(move || store.get_photo(id)).await?;

    Ok(([(header::CONTENT_TYPE, photo::sniff_content_type(&bytes))], bytes))
}

/// GET /complaints/photo — a photo lookup must name a complaint.
pub async fn get_photo_without_id() -> ApiError {
    ApiError::invalid("complaint id is required")
}

/// PUT /complaints/{id}
pub async fn update_complaint(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateComplaintRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(req) = payload?;
    let photo = req
        .photo
        .as_deref()
        .map(photo::decode_photo_text)
        .transpose()?;
    let update = ComplaintUpdate::new(req.kind, req.description, photo)?;
    let id = parse_complaint_id(&id)?;
    let caller = req.owner_id;

    let store = state.complaints.clone();
    run_blocking(move || store.update(id, caller, update)).await?;

    Ok(Json(StatusResponse {
        success: true,
        message: "Complaint updated".into(),
    }))
}

/// DELETE /complaints/{id}?owner_id=
pub async fn delete_complaint(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<DeleteComplaintQuery>, QueryRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Query(query) = query?;
    let id = parse_complaint_id(&id)?;
    let caller = query.owner_id;

    let store = state.complaints.clone();
    run_blocking(move || store.delete_by_id(id, caller)).await?;

    Ok(Json(StatusResponse {
        success: true,
        message: "Complaint deleted".into(),
    }))
}
