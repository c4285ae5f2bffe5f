//! In-memory [`SettingsRepository`].
//!
//! Used when the host runs with `--no-persist`, and by integration tests.
//! Saved records are kept in memory only and vanish with the process.

use std::sync::{Mutex, PoisonError};

use slideframe_core::{Settings, SettingsStore};

use crate::application::persistence::{RepositoryError, SettingsRepository};

#[derive(Debug, Default)]
pub struct InMemorySettingsRepository {
    settings: Mutex<Settings>,
    saves: Mutex<usize>,
}

impl InMemorySettingsRepository {
    /// A repository that initially holds `settings`.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
            saves: Mutex::new(0),
        }
    }

    /// The most recently saved (or initial) record.
    pub fn current(&self) -> Settings {
        self.settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SettingsRepository for InMemorySettingsRepository {
    fn load(&self) -> Result<Settings, RepositoryError> {
        Ok(self.current())
    }

    fn save(&self, settings: &Settings) -> Result<(), RepositoryError> {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = settings.clone();
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }

    fn save_current(&self, store: &SettingsStore) -> Result<(), RepositoryError> {
        let mut current = self.settings.lock().unwrap_or_else(PoisonError::into_inner);
        *current = store.snapshot();
        *self.saves.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
