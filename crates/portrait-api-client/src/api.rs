//! Typed endpoints of the profile API.
//!
//! Paths are relative to the configured base URL, which already carries the
//! `/api` prefix.

use bytes::Bytes;
use portrait_core::models::{
    ConfirmUploadRequest, SetUsernameRequest, SetUsernameResponse, UploadUrlRequest,
    UploadUrlResponse, UserProfile,
};
use portrait_core::AppError;
use reqwest::header::CONTENT_TYPE;

use crate::{require_token, ApiClient};

pub const CURRENT_USER_PATH: &str = "/users/me";
pub const USERNAME_PATH: &str = "/users/username";
pub const UPLOAD_URL_PATH: &str = "/users/me/profile-picture/upload-url";
pub const CONFIRM_UPLOAD_PATH: &str = "/users/me/profile-picture/confirm";
pub const PROFILE_PICTURE_PATH: &str = "/users/me/profile-picture";

impl ApiClient {
    /// Profile of the signed-in user.
    pub async fn get_current_user(&self, token: Option<&str>) -> Result<UserProfile, AppError> {
        let token = require_token(token)?;
        self.get(CURRENT_USER_PATH, Some(token), "Failed to fetch profile")
            .await
    }

    /// Public profile by username. No authentication.
    pub async fn get_user_by_username(&self, username: &str) -> Result<UserProfile, AppError> {
        let path = format!("{}/{}", USERNAME_PATH, urlencoding::encode(username));
        self.get(&path, None, "Failed to fetch user profile").await
    }

    pub async fn set_username(
        &self,
        token: Option<&str>,
        username: &str,
    ) -> Result<SetUsernameResponse, AppError> {
        let token = require_token(token)?;
        let body = SetUsernameRequest {
            username: username.to_string(),
        };
        self.post_json(USERNAME_PATH, token, &body, "Failed to set username")
            .await
    }

    /// Ask the backend for a signed write destination.
    pub async fn request_upload_url(
        &self,
        token: Option<&str>,
        request: &UploadUrlRequest,
    ) -> Result<UploadUrlResponse, AppError> {
        let token = require_token(token)?;
        self.post_json(UPLOAD_URL_PATH, token, request, "Failed to get upload URL")
            .await
    }

    /// PUT the bytes to a signed URL.
    ///
    /// The signed URL is its own credential: no `Authorization` header is
    /// sent, and any failure is reported as [`AppError::Transfer`].
    pub async fn transfer_to_signed_url(
        &self,
        signed_url: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), AppError> {
        let response = self
            .client()
            .put(signed_url)
            .header(CONTENT_TYPE, content_type)
            .timeout(self.transfer_timeout())
            .body(data)
            .send()
            .await
            .map_err(|e| AppError::Transfer {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Transfer {
                status: Some(status.as_u16()),
                message: format!("Storage rejected the upload with status {}", status),
            });
        }
        Ok(())
    }

    /// Tell the backend the transfer finished. Returns the updated user record.
    pub async fn confirm_upload(
        &self,
        token: Option<&str>,
        request: &ConfirmUploadRequest,
    ) -> Result<UserProfile, AppError> {
        let token = require_token(token)?;
        self.post_json(CONFIRM_UPLOAD_PATH, token, request, "Failed to confirm upload")
            .await
    }

    pub async fn delete_profile_picture(&self, token: Option<&str>) -> Result<(), AppError> {
        let token = require_token(token)?;
        self.delete(
            PROFILE_PICTURE_PATH,
            token,
            "Failed to remove profile picture",
        )
        .await
    }
}
