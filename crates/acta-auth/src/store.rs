//! Session store
//!
//! Holds at most one session. Every mutation updates the durable slot and
//! the in-memory copy under the same write lock.

use crate::error::SessionError;
use crate::session::{BearerToken, Session, SessionSource};
use crate::slot::{MemorySlot, TokenSlot};
use parking_lot::RwLock;

/// Single source of truth for the current bearer token
#[derive(Debug)]
pub struct SessionStore {
    current: RwLock<Option<Session>>,
    slot: Box<dyn TokenSlot>,
}

impl SessionStore {
    /// Create an empty store over `slot`
    ///
    /// Whatever the slot already holds is ignored; use [`SessionStore::load`]
    /// to restore a persisted token.
    #[must_use]
    pub fn new(slot: impl TokenSlot + 'static) -> Self {
        Self {
            current: RwLock::new(None),
            slot: Box::new(slot),
        }
    }

    /// Store without durable persistence
    #[inline]
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemorySlot::new())
    }

    /// Restore the store from `slot`
    ///
    /// A restored session has unknown expiry.
    ///
    /// # Errors
    /// Returns `SessionError` if the slot cannot be read.
    pub fn load(slot: impl TokenSlot + 'static) -> Result<Self, SessionError> {
        let restored = slot.read()?.map(|token| {
            tracing::debug!("restored persisted session token");
            Session::new(BearerToken::new(token), SessionSource::IdentityProvider)
        });

        Ok(Self {
            current: RwLock::new(restored),
            slot: Box::new(slot),
        })
    }

    /// Current session
    #[must_use]
    pub fn get(&self) -> Option<Session> {
        self.current.read().clone()
    }

    /// Current bearer token
    #[must_use]
    pub fn token(&self) -> Option<BearerToken> {
        self.current.read().as_ref().map(|s| s.token().clone())
    }

    /// Whether no session is held
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.read().is_none()
    }

    /// Replace the current session and persist its token
    ///
    /// On error the previous session stays in place.
    ///
    /// # Errors
    /// Returns `SessionError` if the slot write fails.
    pub fn set(&self, session: Session) -> Result<(), SessionError> {
        let mut current = self.current.write();
        self.slot.write(session.token().as_str())?;
        *current = Some(session);
        Ok(())
    }

    /// Drop the current session from memory and from the slot
    ///
    /// Memory is cleared even if the slot removal fails.
    ///
    /// # Errors
    /// Returns `SessionError` if the slot removal fails.
    pub fn clear(&self) -> Result<(), SessionError> {
        let mut current = self.current.write();
        *current = None;
        self.slot.remove()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::FileSlot;

    fn session(token: &str) -> Session {
        Session::new(BearerToken::new(token), SessionSource::IdentityProvider)
    }

    #[test]
    fn set_overwrites_previous_token() {
        let store = SessionStore::in_memory();
        assert!(store.is_empty());

        store.set(session("first")).unwrap();
        store.set(session("second")).unwrap();

        assert_eq!(store.token(), Some(BearerToken::new("second")));
    }

    #[test]
    fn clear_empties_store() {
        let store = SessionStore::in_memory();
        store.set(session("token")).unwrap();
        store.clear().unwrap();
        assert!(store.get().is_none());
        assert!(store.token().is_none());
    }

    #[test]
    fn token_survives_reload() {
        let dir = tempfile::tempdir().unwrap();

        let store = SessionStore::load(FileSlot::new(dir.path())).unwrap();
        assert!(store.is_empty());
        store.set(session("persisted")).unwrap();
        drop(store);

        let reloaded = SessionStore::load(FileSlot::new(dir.path())).unwrap();
        let restored = reloaded.get().unwrap();
        assert_eq!(restored.token().as_str(), "persisted");
        assert_eq!(restored.expiry(), None);
    }

    #[test]
    fn clear_removes_persisted_token() {
        let dir = tempfile::tempdir().unwrap();

        let store = SessionStore::load(FileSlot::new(dir.path())).unwrap();
        store.set(session("persisted")).unwrap();
        store.clear().unwrap();
        drop(store);

        let reloaded = SessionStore::load(FileSlot::new(dir.path())).unwrap();
        assert!(reloaded.is_empty());
    }

    #[test]
    fn new_ignores_existing_slot_contents() {
        let store = SessionStore::new(MemorySlot::with_value("stale"));
        assert!(store.is_empty());
    }

    #[test]
    fn failed_write_keeps_previous_session() {
        #[derive(Debug)]
        struct ReadOnlySlot;

        impl TokenSlot for ReadOnlySlot {
            fn read(&self) -> Result<Option<String>, SessionError> {
                Ok(Some("original".to_string()))
            }
            fn write(&self, _value: &str) -> Result<(), SessionError> {
                Err(SessionError::io(
                    "/readonly",
                    std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                ))
            }
            fn remove(&self) -> Result<(), SessionError> {
                Ok(())
            }
        }

        let store = SessionStore::load(ReadOnlySlot).unwrap();
        assert!(store.set(session("new")).is_err());
        assert_eq!(store.token(), Some(BearerToken::new("original")));
    }
}
