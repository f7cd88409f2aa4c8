//! Process-wide cache of the signed-in user's profile.

use std::sync::{Arc, OnceLock};

use chrono::Utc;
use portrait_core::models::{ImageDescriptor, UserProfile};
use tokio::sync::RwLock;

static GLOBAL: OnceLock<ProfileStore> = OnceLock::new();

/// Shared handle to the cached profile record.
///
/// Clones share the same record. Writes happen under one lock, so readers
/// never observe a half-applied update.
#[derive(Clone, Debug, Default)]
pub struct ProfileStore {
    inner: Arc<RwLock<Option<UserProfile>>>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store shared by the whole process.
    pub fn global() -> Self {
        GLOBAL.get_or_init(ProfileStore::new).clone()
    }

    pub async fn current(&self) -> Option<UserProfile> {
        self.inner.read().await.clone()
    }

    pub async fn picture(&self) -> Option<ImageDescriptor> {
        self.inner.read().await.as_ref().and_then(UserProfile::picture)
    }

    /// Store a new record. A picture without an upload time is stamped
    /// here so later reads report the same descriptor.
    pub async fn replace(&self, mut profile: UserProfile) {
        stamp_picture(&mut profile);
        *self.inner.write().await = Some(profile);
    }

    /// Edit the cached record in place under a single write lock.
    ///
    /// Returns `false` when nothing is cached.
    pub async fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut UserProfile),
    {
        match self.inner.write().await.as_mut() {
            Some(profile) => {
                f(profile);
                stamp_picture(profile);
                true
            }
            None => false,
        }
    }

    /// Drop the cached picture, keeping the rest of the record.
    pub async fn clear_picture(&self) {
        if let Some(profile) = self.inner.write().await.as_mut() {
            profile.profile_picture = None;
        }
    }

    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }
}

fn stamp_picture(profile: &mut UserProfile) {
    if let Some(picture) = profile.profile_picture.as_mut() {
        if picture.uploaded_at.is_none() {
            picture.uploaded_at = Some(Utc::now());
        }
    }
}
