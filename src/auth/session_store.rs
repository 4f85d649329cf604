//! Session storage keyed by signature.

use anyhow::Result;
use surrealdb::RecordId;
use tracing::debug;

use crate::db::{Db, SessionRecord};
use crate::types::SessionSig;

/// Session store for database operations.
///
/// Each session lives at record id `login_session:⟨sig⟩`, so saving under an
/// existing signature overwrites its owner and expiry (last writer wins).
#[derive(Clone)]
pub struct SessionStore {
    db: Db,
}

impl SessionStore {
    /// Create a new session store.
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create or overwrite the session stored under `sig`.
    pub async fn save(&self, uid: &RecordId, sig: &SessionSig, expired: i64) -> Result<()> {
        let query = r#"
            UPSERT type::thing('login_session', $sig) SET
                uid = $uid,
                sig = $sig,
                expired = $expired
        "#;

        self.db
            .query(query)
            .bind(("uid", uid.clone()))
            .bind(("sig", sig.as_str().to_string()))
            .bind(("expired", expired))
            .await?
            .check()?;

        debug!("Saved session for {} expiring at {}", uid, expired);
        Ok(())
    }

    /// Look up a session by signature.
    pub async fn read_by_sig(&self, sig: &str) -> Result<Option<SessionRecord>> {
        let query = "SELECT uid, sig, expired FROM type::thing('login_session', $sig)";

        let mut res = self.db
            .query(query)
            .bind(("sig", sig.to_string()))
            .await?;

        let sessions: Vec<SessionRecord> = res.take(0)?;
        Ok(sessions.into_iter().next())
    }

    /// Delete every session owned by `uid`, returning how many were removed.
    pub async fn remove_by_uid(&self, uid: &RecordId) -> Result<usize> {
        let query = "DELETE login_session WHERE uid = $uid RETURN BEFORE";

        let mut res = self.db
            .query(query)
            .bind(("uid", uid.clone()))
            .await?;

        let removed: Vec<SessionRecord> = res.take(0)?;
        Ok(removed.len())
    }

    /// All sessions owned by `uid`.
    #[cfg(test)]
    pub async fn list_by_uid(&self, uid: &RecordId) -> Result<Vec<SessionRecord>> {
        let query = "SELECT uid, sig, expired FROM login_session WHERE uid = $uid";

        let mut res = self.db
            .query(query)
            .bind(("uid", uid.clone()))
            .await?;

        let sessions: Vec<SessionRecord> = res.take(0)?;
        Ok(sessions)
    }
}
