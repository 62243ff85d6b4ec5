use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::legacy::{self, KeyValueStore};
use crate::models::{HeightUnit, ProfileDraft, UserProfile};
use crate::storage::Storage;
use crate::validation::ensure_positive_height;

/// What the service currently knows about the profile.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileState {
    /// Nothing has been read from storage yet.
    Uninitialized,
    Loaded(UserProfile),
    /// Storage was read and holds no profile.
    Empty,
}

impl ProfileState {
    #[must_use]
    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            ProfileState::Loaded(p) => Some(p),
            ProfileState::Uninitialized | ProfileState::Empty => None,
        }
    }
}

/// Whether saves are also copied into the legacy key/value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LegacyMirror {
    /// Only read the legacy copy once, to migrate it.
    MigrateOnly,
    /// Also write every saved profile back to the legacy copy (best effort).
    #[default]
    DualWrite,
}

/// Cached access to the single user profile.
///
/// The database is authoritative. Every change is published to subscribers.
pub struct ProfileService {
    storage: Arc<Storage>,
    legacy: Arc<dyn KeyValueStore>,
    mirror: LegacyMirror,
    state: watch::Sender<ProfileState>,
}

impl ProfileService {
    /// Create without touching storage. State starts as `Uninitialized`.
    pub fn new(storage: Arc<Storage>, legacy: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(ProfileState::Uninitialized);
        Self {
            storage,
            legacy,
            mirror: LegacyMirror::default(),
            state,
        }
    }

    #[must_use]
    pub fn with_mirror(mut self, mirror: LegacyMirror) -> Self {
        self.mirror = mirror;
        self
    }

    /// Create and immediately load from storage (migrating the legacy copy if needed).
    pub async fn load(storage: Arc<Storage>, legacy: Arc<dyn KeyValueStore>) -> Result<Self> {
        let service = Self::new(storage, legacy);
        service.initialize().await?;
        Ok(service)
    }

    /// Load the profile, importing the legacy copy when storage has none.
    ///
    /// Storage wins when both hold a profile.
    pub async fn initialize(&self) -> Result<ProfileState> {
        let state = if let Some(profile) = self.storage.get_user_profile().await? {
            debug!(id = %profile.id, "loaded profile from storage");
            ProfileState::Loaded(profile)
        } else if let Some(profile) = legacy::read_legacy_profile(self.legacy.as_ref()) {
            info!(id = %profile.id, "migrating legacy profile into storage");
            self.storage
                .put_user_profile(profile.clone())
                .await
                .context("Failed to migrate legacy profile")?;
            ProfileState::Loaded(profile)
        } else {
            ProfileState::Empty
        };
        self.state.send_replace(state.clone());
        Ok(state)
    }

    #[must_use]
    pub fn state(&self) -> ProfileState {
        self.state.borrow().clone()
    }

    /// The cached profile, without touching storage.
    #[must_use]
    pub fn current(&self) -> Option<UserProfile> {
        self.state.borrow().profile().cloned()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProfileState> {
        self.state.subscribe()
    }

    /// The cached profile, falling back to storage when nothing is loaded.
    pub async fn get_profile(&self) -> Result<Option<UserProfile>> {
        if let Some(profile) = self.current() {
            return Ok(Some(profile));
        }
        let stored = self.storage.get_user_profile().await?;
        let state = match &stored {
            Some(profile) => ProfileState::Loaded(profile.clone()),
            None => ProfileState::Empty,
        };
        self.state.send_replace(state);
        Ok(stored)
    }

    pub async fn is_profile_complete(&self) -> Result<bool> {
        Ok(self
            .get_profile()
            .await?
            .is_some_and(|p| p.is_complete()))
    }

    /// Merge `update` into the current profile (or a fresh one) and persist it.
    ///
    /// The cache is updated only after the write succeeds.
    pub async fn save_profile(&self, update: ProfileDraft) -> Result<UserProfile> {
        let base = self
            .get_profile()
            .await?
            .as_ref()
            .map(ProfileDraft::from)
            .unwrap_or_default();
        let profile = UserProfile::from_draft(base.merge(update));

        if let Err(e) = self.storage.put_user_profile(profile.clone()).await {
            error!(error = %e, "failed to save user profile");
            return Err(e.context("Failed to save user profile"));
        }
        self.mirror_to_legacy(&profile);

        info!(id = %profile.id, complete = profile.is_complete(), "saved user profile");
        self.state.send_replace(ProfileState::Loaded(profile.clone()));
        Ok(profile)
    }

    fn mirror_to_legacy(&self, profile: &UserProfile) {
        if self.mirror != LegacyMirror::DualWrite {
            return;
        }
        if let Err(e) = legacy::write_legacy_profile(self.legacy.as_ref(), profile) {
            warn!(error = %e, "could not mirror profile to legacy store");
        }
    }

    /// Set the height and remember `unit` as the display preference.
    pub async fn update_height(&self, height_cm: f64, unit: HeightUnit) -> Result<UserProfile> {
        ensure_positive_height(height_cm)?;
        self.save_profile(ProfileDraft {
            height_cm: Some(height_cm),
            preferred_height_unit: Some(unit),
            ..ProfileDraft::default()
        })
        .await
    }

    pub async fn update_name(&self, name: &str) -> Result<UserProfile> {
        self.save_profile(ProfileDraft {
            name: Some(name.trim().to_string()),
            ..ProfileDraft::default()
        })
        .await
    }

    pub async fn update_avatar(&self, avatar: &str) -> Result<UserProfile> {
        self.save_profile(ProfileDraft {
            avatar: Some(avatar.to_string()),
            ..ProfileDraft::default()
        })
        .await
    }

    /// Remove the profile from storage and the legacy copy.
    pub async fn clear_profile(&self) -> Result<()> {
        self.storage.clear_user_profile().await?;
        if let Err(e) = legacy::clear_legacy_profile(self.legacy.as_ref()) {
            warn!(error = %e, "could not clear legacy profile");
        }
        info!("cleared user profile");
        self.state.send_replace(ProfileState::Empty);
        Ok(())
    }
}
