use std::sync::{Arc, LazyLock};

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use reporta_db::{Database, is_unique_violation};
use reporta_types::api::{AuthResponse, LoginRequest, RegisterRequest};

use crate::error::ApiError;
use crate::run_blocking;
use crate::state::AppState;

/// Verified against when the username is unknown, so a miss costs the same
/// as a wrong credential.
static DUMMY_HASH: LazyLock<Option<String>> = LazyLock::new(|| {
    hash_credential("reporta-dummy-credential").ok()
});

/// Owns the users table: registration and credential checks.
#[derive(Clone)]
pub struct AuthStore {
    db: Arc<Database>,
}

impl AuthStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn register(&self, username: &str, credential: &str) -> Result<Uuid, ApiError> {
        if username.is_empty() || credential.is_empty() {
            return Err(ApiError::invalid("username and credential are required"));
        }

        if self.db.get_user_by_username(username)?.is_some() {
            return Err(username_taken());
        }

        let credential_hash = hash_credential(credential)?;
        let user_id = Uuid::new_v4();

        // A concurrent registration can pass the check above; the UNIQUE
        // constraint settles it.
        self.db
            .create_user(&user_id.to_string(), username, &credential_hash)
            .map_err(|e| {
                if is_unique_violation(&e) {
                    username_taken()
                } else {
                    ApiError::Internal(e)
                }
            })?;

        info!("User {} registered as {}", username, user_id);
        Ok(user_id)
    }

    pub fn authenticate(&self, username: &str, credential: &str) -> Result<Uuid, ApiError> {
        let user = self.db.get_user_by_username(username)?;

        let Some(user) = user else {
            if let Some(dummy) = DUMMY_HASH.as_deref() {
                let _ = verify_credential(credential, dummy);
            }
            return Err(ApiError::Unauthorized);
        };

        if !verify_credential(credential, &user.credential)? {
            warn!("Failed login for {}", username);
            return Err(ApiError::Unauthorized);
        }

        user.id
            .parse()
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("Corrupt user id '{}': {}", user.id, e)))
    }

    pub fn resolve_user_id(&self, username: &str) -> Result<Option<Uuid>, ApiError> {
        self.db
            .get_user_id_by_username(username)?
            .map(|id| {
                id.parse().map_err(|e| {
                    ApiError::Internal(anyhow::anyhow!("Corrupt user id '{}': {}", id, e))
                })
            })
            .transpose()
    }
}

fn username_taken() -> ApiError {
    ApiError::Conflict("Username already exists".into())
}

fn hash_credential(credential: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(credential.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Credential hashing failed: {}", e)))
}

/// Ok(false) on mismatch; Err only when the stored hash is unreadable.
fn verify_credential(credential: &str, stored: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Corrupt credential hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(credential.as_bytes(), &parsed)
        .is_ok())
}

// -- Handlers --

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let store = state.auth.clone();
    let user_id = run_blocking(move || store.register(&req.username, &req.credential)).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            message: "Registration successful".into(),
            user_id,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;

    let store = state.auth.clone();
    let user_id = run_blocking(move || store.authenticate(&req.username, &req.credential)).await?;

    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful".into(),
        user_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use tempfile::TempDir;

    fn store() -> (TempDir, AuthStore) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("auth.db")).unwrap();
        (dir, AuthStore::new(Arc::new(db)))
    }

    #[test]
    fn register_then_authenticate() {
        let (_dir, auth) = store();
        let id = auth.register("ana", "s3cret-pass").unwrap();
        assert_eq!(auth.authenticate("ana", "s3cret-pass").unwrap(), id);
        assert_eq!(auth.resolve_user_id("ana").unwrap(), Some(id));
    }

    #[test]
    fn credential_is_stored_hashed() {
        let (_dir, auth) = store();
        auth.register("ana", "s3cret-pass").unwrap();
        let row = auth.db.get_user_by_username("ana").unwrap().unwrap();
        assert_ne!(row.credential, "s3cret-pass");
        assert!(row.credential.starts_with("$argon2id$"));
    }

    #[test]
    fn duplicate_registration_conflicts_and_keeps_first_credential() {
        let (_dir, auth) = store();
        let id = auth.register("ana", "first").unwrap();
        assert!(matches!(
            auth.register("ana", "second"),
            Err(ApiError::Conflict(_))
        ));
        assert_eq!(auth.authenticate("ana", "first").unwrap(), id);
        assert!(matches!(
            auth.authenticate("ana", "second"),
            Err(ApiError::Unauthorized)
        ));
    }

    #[test]
    fn concurrent_registrations_yield_one_winner() {
        let (_dir, auth) = store();
        let racers = 6;
        let barrier = Barrier::new(racers);

        let results: Vec<Result<Uuid, ApiError>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..racers)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        auth.register("racer", "pw")
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter(|r| r.is_err())
                .all(|r| matches!(r, Err(ApiError::Conflict(_))))
        );
    }

    #[test]
    fn wrong_credential_and_unknown_user_look_the_same() {
        let (_dir, auth) = store();
        auth.register("ana", "right").unwrap();

        let wrong = auth.authenticate("ana", "wrong").unwrap_err();
        let unknown = auth.authenticate("nobody", "right").unwrap_err();
        assert!(matches!(wrong, ApiError::Unauthorized));
        assert!(matches!(unknown, ApiError::Unauthorized));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[test]
    fn empty_fields_are_rejected_before_storage() {
        let (_dir, auth) = store();
        assert!(matches!(auth.register("", "pw"), Err(ApiError::InvalidInput(_))));
        assert!(matches!(auth.register("ana", ""), Err(ApiError::InvalidInput(_))));
        assert!(auth.resolve_user_id("ana").unwrap().is_none());
    }
}
