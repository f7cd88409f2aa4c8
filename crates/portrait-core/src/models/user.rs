use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::image::ImageDescriptor;
use crate::constants::DEFAULT_DISPLAY_NAME;

/// Profile picture as stored on the user record.
///
/// Every field is optional on the wire: a removed picture comes back as an
/// empty object or `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePicture {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl ProfilePicture {
    /// A complete descriptor, when path and URL are both present.
    pub fn descriptor(&self) -> Option<ImageDescriptor> {
        let file_path = self.file_path.clone().filter(|p| !p.is_empty())?;
        let public_url = self.public_url.clone().filter(|u| !u.is_empty())?;
        Some(ImageDescriptor {
            file_path,
            public_url,
            content_type: self.content_type.clone().unwrap_or_default(),
            uploaded_at: self.uploaded_at.unwrap_or_else(Utc::now),
        })
    }
}

impl From<ImageDescriptor> for ProfilePicture {
    fn from(descriptor: ImageDescriptor) -> Self {
        Self {
            file_path: Some(descriptor.file_path),
            public_url: Some(descriptor.public_url),
            content_type: Some(descriptor.content_type),
            uploaded_at: Some(descriptor.uploaded_at),
        }
    }
}

/// User record returned by the profile API.
///
/// Fields the pipeline relies on are typed; everything else the backend sends
/// is kept in `extra` so a full-record replace never loses data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<ProfilePicture>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// Current picture, if the record carries a complete one.
    pub fn picture(&self) -> Option<ImageDescriptor> {
        self.profile_picture.as_ref().and_then(ProfilePicture::descriptor)
    }

    /// Public URL to display, if any.
    pub fn picture_url(&self) -> Option<&str> {
        self.profile_picture
            .as_ref()
            .and_then(|p| p.public_url.as_deref())
            .filter(|u| !u.is_empty())
    }

    /// "First Last", or a generic title when the profile has no name.
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => format!("{} {}", name, self.last_name.as_deref().unwrap_or(""))
                .trim()
                .to_string(),
            None => DEFAULT_DISPLAY_NAME.to_string(),
        }
    }

    /// Avatar fallback: first letter of each word of the display name.
    pub fn initials(&self) -> String {
        self.display_name()
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .collect()
    }
}
