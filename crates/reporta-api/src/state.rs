use std::sync::Arc;

use reporta_db::Database;

use crate::auth::AuthStore;
use crate::complaints::ComplaintStore;
use crate::proximity::ProximityIndex;

pub type AppState = Arc<AppStateInner>;

/// Per-process service handles. Each store holds a shared reference to the
/// database; no other state is kept between requests.
pub struct AppStateInner {
    pub auth: AuthStore,
    pub complaints: ComplaintStore,
    pub proximity: ProximityIndex,
}

impl AppStateInner {
    pub fn new(db: Database) -> AppState {
        let db = Arc::new(db);
        let auth = AuthStore::new(db.clone());
        Arc::new(Self {
            complaints: ComplaintStore::new(db.clone(), auth.clone()),
            proximity: ProximityIndex::new(db),
            auth,
        })
    }
}
