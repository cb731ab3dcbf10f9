use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tempfile::NamedTempFile;

use crate::config::ResourceLayout;
use crate::models::{FamilyKey, FamilyProfile};
use crate::utils::error::{AppError, Result};

/// Loads and saves the variant records of one product family.
pub trait VariantStore: Send + Sync {
    fn load(&self, family: &FamilyKey) -> Result<FamilyProfile>;

    /// Either the whole profile is written or the previous copy stays intact.
    fn persist(&self, family: &FamilyKey, profile: &FamilyProfile) -> Result<()>;
}

/// Profiles kept as pretty-printed JSON under the resources tree.
#[derive(Debug, Clone)]
pub struct JsonProfileStore {
    layout: ResourceLayout,
}

impl JsonProfileStore {
    pub fn new(layout: ResourceLayout) -> Self {
        Self { layout }
    }
}

impl VariantStore for JsonProfileStore {
    fn load(&self, family: &FamilyKey) -> Result<FamilyProfile> {
        let path = self.layout.profile_path(family);
        let text = fs::read_to_string(&path)
            .map_err(|e| AppError::profile(family, format!("{}: {}", path.display(), e)))?;
        let mut profile: FamilyProfile = serde_json::from_str(&text)
            .map_err(|e| AppError::profile(family, format!("{}: {}", path.display(), e)))?;

        profile.normalize_ids(family)?;
        tracing::debug!(
            "Loaded {} variants for {} from {}",
            profile.variants.len(),
            family,
            path.display()
        );
        Ok(profile)
    }

    fn persist(&self, family: &FamilyKey, profile: &FamilyProfile) -> Result<()> {
        let target = self.layout.profile_path(family);
        let dir = target
            .parent()
            .ok_or_else(|| AppError::profile(family, "profile path has no parent directory"))?;
        fs::create_dir_all(dir)?;

        let content = serde_json::to_string_pretty(profile)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        // Rename replaces the old file in one step
        tmp.persist(&target).map_err(|e| AppError::Io(e.error))?;
        Ok(())
    }
}

/// Store that never touches the disk after being seeded.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    profiles: Arc<Mutex<HashMap<FamilyKey, FamilyProfile>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, family: FamilyKey, profile: FamilyProfile) -> Self {
        self.insert(family, profile);
        self
    }

    pub fn insert(&self, family: FamilyKey, profile: FamilyProfile) {
        self.profiles().insert(family, profile);
    }

    /// Current copy of a family's profile, as last persisted.
    pub fn snapshot(&self, family: &FamilyKey) -> Option<FamilyProfile> {
        self.profiles().get(family).cloned()
    }

    // Every write replaces a whole profile, so the map is whole even after a
    // panic elsewhere poisoned the lock.
    fn profiles(&self) -> MutexGuard<'_, HashMap<FamilyKey, FamilyProfile>> {
        self.profiles.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            tracing::warn!("Memory store lock was poisoned; recovering");
            poisoned.into_inner()
        })
    }
}

impl VariantStore for MemoryStore {
    fn load(&self, family: &FamilyKey) -> Result<FamilyProfile> {
        let mut profile = self
            .snapshot(family)
            .ok_or_else(|| AppError::profile(family, "no profile in memory store"))?;
        profile.normalize_ids(family)?;
        Ok(profile)
    }

    fn persist(&self, family: &FamilyKey, profile: &FamilyProfile) -> Result<()> {
        self.insert(family.clone(), profile.clone());
        Ok(())
    }
}
