use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Complaint;

/// Generic `{ success, message }` envelope used for acknowledgements and errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(alias = "password")]
    pub credential: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    #[serde(alias = "password")]
    pub credential: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub user_id: Uuid,
}

// -- Complaints --

/// JSON submission; `photo` is base64, optionally with a data-URL header.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateComplaintRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: Option<String>,
    pub photo: String,
    pub latitude: f64,
    pub longitude: f64,
    pub username: String,
}

/// Metadata for a binary upload, carried in the query string while the
/// request body holds the raw photo bytes.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadComplaintQuery {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateComplaintResponse {
    pub success: bool,
    pub message: String,
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateComplaintRequest {
    pub owner_id: Uuid,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteComplaintQuery {
    pub owner_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ComplaintResponse {
    #[serde(flatten)]
    pub complaint: Complaint,
    /// Base64 photo, only inlined when a single record is requested.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub photo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub distance_km: Option<f64>,
}
