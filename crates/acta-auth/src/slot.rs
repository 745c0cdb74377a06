//! Durable storage for the bearer token
//!
//! A slot persists exactly one string under [`SESSION_KEY`].

use crate::error::SessionError;
use parking_lot::Mutex;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Well-known key the token is stored under
pub const SESSION_KEY: &str = "acta.session.token";

/// Single-value durable slot
pub trait TokenSlot: Send + Sync + std::fmt::Debug {
    /// Read the stored token, if any
    ///
    /// # Errors
    /// Returns `SessionError` if the backing storage cannot be read.
    fn read(&self) -> Result<Option<String>, SessionError>;

    /// Overwrite the stored token
    ///
    /// # Errors
    /// Returns `SessionError` if the value cannot be persisted.
    fn write(&self, value: &str) -> Result<(), SessionError>;

    /// Remove the stored token; removing an empty slot is not an error
    ///
    /// # Errors
    /// Returns `SessionError` if the backing storage cannot be modified.
    fn remove(&self) -> Result<(), SessionError>;
}

/// File-backed slot
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the slot, so readers see either the old or the new token.
#[derive(Debug, Clone)]
pub struct FileSlot {
    dir: PathBuf,
    path: PathBuf,
}

impl FileSlot {
    /// Slot stored as `<dir>/acta.session.token`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let path = dir.join(SESSION_KEY);
        Self { dir, path }
    }

    /// Slot file location
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenSlot for FileSlot {
    fn read(&self) -> Result<Option<String>, SessionError> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let text =
                    String::from_utf8(bytes).map_err(|_| SessionError::Corrupt(self.path.clone()))?;
                let token = text.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionError::io(&self.path, e)),
        }
    }

    fn write(&self, value: &str) -> Result<(), SessionError> {
        fs::create_dir_all(&self.dir).map_err(|e| SessionError::io(&self.dir, e))?;

        let mut tmp =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| SessionError::io(&self.dir, e))?;
        tmp.write_all(value.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| SessionError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| SessionError::io(&self.path, e.error))?;
        Ok(())
    }

    fn remove(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::io(&self.path, e)),
        }
    }
}

/// In-memory slot; nothing survives the process
#[derive(Debug, Default)]
pub struct MemorySlot {
    value: Mutex<Option<String>>,
}

impl MemorySlot {
    /// Create empty slot
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create slot pre-filled with a token
    #[inline]
    #[must_use]
    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
        }
    }
}

impl TokenSlot for MemorySlot {
    fn read(&self) -> Result<Option<String>, SessionError> {
        Ok(self.value.lock().clone())
    }

    fn write(&self, value: &str) -> Result<(), SessionError> {
        *self.value.lock() = Some(value.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<(), SessionError> {
        *self.value.lock() = None;
        Ok(())
    }
}
