//! Three-phase signed-URL upload of a cropped picture.
//!
//! 1. ask the backend for a signed destination,
//! 2. PUT the bytes straight to storage,
//! 3. confirm, receiving the updated user record.
//!
//! Each attempt carries its own [`UploadAttempt`] state; a retry is a new
//! attempt starting again at phase 1.

use chrono::Utc;
use portrait_core::models::{
    ConfirmUploadRequest, EncodedImage, ImageDescriptor, UploadUrlRequest, UploadUrlResponse,
    UserProfile,
};
use portrait_core::AppError;
use uuid::Uuid;

use crate::store::ProfileStore;
use crate::{log_failure, require_token, ApiClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    RequestingDestination,
    Transferring,
    Confirming,
    Done,
    Failed,
}

impl UploadPhase {
    /// The phase that follows a successful step, if any.
    pub fn next(self) -> Option<UploadPhase> {
        match self {
            UploadPhase::Idle => Some(UploadPhase::RequestingDestination),
            UploadPhase::RequestingDestination => Some(UploadPhase::Transferring),
            UploadPhase::Transferring => Some(UploadPhase::Confirming),
            UploadPhase::Confirming => Some(UploadPhase::Done),
            UploadPhase::Done | UploadPhase::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, UploadPhase::Done | UploadPhase::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UploadPhase::Idle => "idle",
            UploadPhase::RequestingDestination => "requesting_destination",
            UploadPhase::Transferring => "transferring",
            UploadPhase::Confirming => "confirming",
            UploadPhase::Done => "done",
            UploadPhase::Failed => "failed",
        }
    }
}

/// State of a single upload attempt.
#[derive(Debug, Clone)]
pub struct UploadAttempt {
    id: Uuid,
    phase: UploadPhase,
    history: Vec<UploadPhase>,
}

impl Default for UploadAttempt {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadAttempt {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: UploadPhase::Idle,
            history: vec![UploadPhase::Idle],
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    /// Every phase the attempt went through, in order.
    pub fn history(&self) -> &[UploadPhase] {
        &self.history
    }

    /// Move to the next phase.
    pub fn advance(&mut self) -> Result<UploadPhase, AppError> {
        let next = self.phase.next().ok_or_else(|| {
            AppError::Internal(format!(
                "Upload attempt {} cannot advance from {}",
                self.id,
                self.phase.as_str()
            ))
        })?;
        self.enter(next);
        Ok(next)
    }

    /// Terminate the attempt. A finished attempt stays finished.
    pub fn fail(&mut self) {
        if !self.phase.is_terminal() {
            self.enter(UploadPhase::Failed);
        }
    }

    fn enter(&mut self, phase: UploadPhase) {
        tracing::debug!(
            attempt_id = %self.id,
            from = self.phase.as_str(),
            to = phase.as_str(),
            "Upload phase transition"
        );
        self.phase = phase;
        self.history.push(phase);
    }
}

/// Runs upload attempts against the profile API and keeps the profile cache
/// in step with the backend.
#[derive(Clone, Debug)]
pub struct UploadOrchestrator {
    client: ApiClient,
    store: ProfileStore,
}

impl UploadOrchestrator {
    pub fn new(client: ApiClient, store: ProfileStore) -> Self {
        Self { client, store }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Upload a cropped picture and return its descriptor.
    ///
    /// On success the cached profile is replaced by the confirmed record.
    /// On failure nothing is cached and nothing is rolled back.
    pub async fn upload_cropped_image(
        &self,
        auth_token: Option<&str>,
        image: &EncodedImage,
    ) -> Result<ImageDescriptor, AppError> {
        let mut attempt = UploadAttempt::new();
        self.run_attempt(&mut attempt, auth_token, image).await
    }

    /// Same as [`Self::upload_cropped_image`] with a caller-owned attempt, so
    /// the caller can inspect the phases it went through.
    #[tracing::instrument(
        skip(self, attempt, auth_token, image),
        fields(attempt_id = %attempt.id(), size_bytes = image.len())
    )]
    pub async fn run_attempt(
        &self,
        attempt: &mut UploadAttempt,
        auth_token: Option<&str>,
        image: &EncodedImage,
    ) -> Result<ImageDescriptor, AppError> {
        match self.execute(attempt, auth_token, image).await {
            Ok((descriptor, mut profile)) => {
                if let Some(picture) = profile.profile_picture.as_mut() {
                    picture.uploaded_at.get_or_insert(descriptor.uploaded_at);
                }
                self.store.replace(profile).await;
                tracing::info!(
                    file_path = %descriptor.file_path,
                    public_url = %descriptor.public_url,
                    "Profile picture uploaded"
                );
                Ok(descriptor)
            }
            Err(err) => {
                attempt.fail();
                log_failure(&err, "upload_profile_picture");
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        attempt: &mut UploadAttempt,
        auth_token: Option<&str>,
        image: &EncodedImage,
    ) -> Result<(ImageDescriptor, UserProfile), AppError> {
        let token = require_token(auth_token)?;
        if image.is_empty() {
            return Err(AppError::Internal("Refusing to upload an empty buffer".to_string()));
        }

        attempt.advance()?;
        let request = UploadUrlRequest {
            content_type: image.content_type.clone(),
            file_extension: image.file_extension().to_string(),
        };
        let destination = self.client.request_upload_url(Some(token), &request).await?;
        let content_type = destination
            .content_type
            .clone()
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| image.content_type.clone());

        attempt.advance()?;
        self.client
            .transfer_to_signed_url(&destination.signed_url, image.data.clone(), &content_type)
            .await?;

        attempt.advance()?;
        let confirm = ConfirmUploadRequest {
            file_path: destination.file_path.clone(),
            content_type: content_type.clone(),
        };
        let profile = self.client.confirm_upload(Some(token), &confirm).await?;

        attempt.advance()?;
        let descriptor = descriptor_from_confirmation(&profile, &destination, &content_type);
        Ok((descriptor, profile))
    }

    /// Remove the current picture and clear it from the cache.
    #[tracing::instrument(skip(self, auth_token))]
    pub async fn delete_image(&self, auth_token: Option<&str>) -> Result<(), AppError> {
        match self.client.delete_profile_picture(auth_token).await {
            Ok(()) => {
                self.store.clear_picture().await;
                tracing::info!("Profile picture removed");
                Ok(())
            }
            Err(err) => {
                log_failure(&err, "delete_profile_picture");
                Err(err)
            }
        }
    }
}

/// Build the descriptor from the confirmed record, falling back to what the
/// backend promised in phase 1.
fn descriptor_from_confirmation(
    profile: &UserProfile,
    destination: &UploadUrlResponse,
    content_type: &str,
) -> ImageDescriptor {
    let picture = profile.profile_picture.clone().unwrap_or_default();
    let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

    ImageDescriptor {
        file_path: non_empty(picture.file_path).unwrap_or_else(|| destination.file_path.clone()),
        public_url: non_empty(picture.public_url)
            .unwrap_or_else(|| destination.public_url.clone()),
        content_type: non_empty(picture.content_type).unwrap_or_else(|| content_type.to_string()),
        uploaded_at: picture.uploaded_at.unwrap_or_else(Utc::now),
    }
}
