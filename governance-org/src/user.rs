//! Directory users as seen by the governance core
//!
//! Users are owned by the identity provider. The core only reads them to
//! resolve emails, render names and populate member pickers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user entry from the external directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// User ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Email address (unique in the directory)
    pub email: String,

    /// Avatar URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl UserSummary {
    /// Creates a new user entry with a fresh ID.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            email: email.into(),
            image: None,
        }
    }

    /// Case-insensitive substring match on name or email.
    ///
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.email.to_lowercase().contains(needle)
    }
}
