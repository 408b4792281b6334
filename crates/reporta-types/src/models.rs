use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A geotagged incident report. The photo itself is served separately;
/// only its size travels with the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complaint {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub owner_id: Uuid,
    pub photo_size: u64,
    pub created_at: DateTime<Utc>,
}
