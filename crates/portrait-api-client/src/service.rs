//! Profile-picture operations as a host application calls them.
//!
//! Wraps the [`UploadOrchestrator`] with a single-flight guard so a user
//! double-clicking "Upload" or "Remove" starts one attempt, not two.

use std::fmt;

use portrait_core::models::{EncodedImage, ImageDescriptor, SetUsernameResponse, UserProfile};
use portrait_core::{AppError, ClientConfig};

use crate::single_flight::SingleFlight;
use crate::store::ProfileStore;
use crate::upload::UploadOrchestrator;
use crate::{log_failure, require_token, ApiClient};

/// What a single-flight key guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Upload,
    Delete,
}

/// In-flight work is keyed by the session it runs for and the operation.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FlightKey {
    session: String,
    operation: Operation,
}

impl FlightKey {
    pub fn new(session: impl Into<String>, operation: Operation) -> Self {
        Self {
            session: session.into(),
            operation,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }
}

impl fmt::Debug for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlightKey")
            .field("session", &"<redacted>")
            .field("operation", &self.operation)
            .finish()
    }
}

#[derive(Clone)]
pub struct ProfilePictureService {
    orchestrator: UploadOrchestrator,
    uploads: SingleFlight<FlightKey, ImageDescriptor>,
    deletions: SingleFlight<FlightKey, ()>,
}

impl ProfilePictureService {
    pub fn new(orchestrator: UploadOrchestrator) -> Self {
        Self {
            orchestrator,
            uploads: SingleFlight::new(),
            deletions: SingleFlight::new(),
        }
    }

    /// Service backed by the process-wide [`ProfileStore`].
    pub fn from_config(config: &ClientConfig) -> Result<Self, AppError> {
        let client = ApiClient::from_config(config)?;
        Ok(Self::new(UploadOrchestrator::new(
            client,
            ProfileStore::global(),
        )))
    }

    pub fn client(&self) -> &ApiClient {
        self.orchestrator.client()
    }

    pub fn store(&self) -> &ProfileStore {
        self.orchestrator.store()
    }

    /// Upload a cropped picture. A second call for the same session while one
    /// is running receives that run's result.
    pub async fn upload(
        &self,
        auth_token: Option<&str>,
        image: EncodedImage,
    ) -> Result<ImageDescriptor, AppError> {
        let token = require_token(auth_token)?.to_string();
        let orchestrator = self.orchestrator.clone();
        let key = FlightKey::new(token.clone(), Operation::Upload);

        self.uploads
            .run(key, move || async move {
                orchestrator
                    .upload_cropped_image(Some(&token), &image)
                    .await
            })
            .await
    }

    /// Remove the current picture, collapsing concurrent requests.
    pub async fn remove(&self, auth_token: Option<&str>) -> Result<(), AppError> {
        let token = require_token(auth_token)?.to_string();
        let orchestrator = self.orchestrator.clone();
        let key = FlightKey::new(token.clone(), Operation::Delete);

        self.deletions
            .run(key, move || async move {
                orchestrator.delete_image(Some(&token)).await
            })
            .await
    }

    /// Fetch the signed-in user's profile and cache it.
    pub async fn refresh(&self, auth_token: Option<&str>) -> Result<UserProfile, AppError> {
        match self.client().get_current_user(auth_token).await {
            Ok(profile) => {
                self.store().replace(profile.clone()).await;
                Ok(profile)
            }
            Err(err) => {
                log_failure(&err, "get_current_user");
                Err(err)
            }
        }
    }

    /// Public profile of another user. The cache is not involved.
    pub async fn lookup(&self, username: &str) -> Result<UserProfile, AppError> {
        self.client().get_user_by_username(username).await
    }

    /// Set the username and reflect it in the cached profile.
    pub async fn set_username(
        &self,
        auth_token: Option<&str>,
        username: &str,
    ) -> Result<SetUsernameResponse, AppError> {
        let response = self.client().set_username(auth_token, username).await?;
        let username = response.username.clone();
        self.store()
            .update(|profile| profile.username = Some(username))
            .await;
        Ok(response)
    }
}
