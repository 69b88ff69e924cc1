//! Caller identity passed into every core operation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// The authenticated principal for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentUser {
    /// Credential presented by the caller, forwarded for audit logging.
    pub auth: Option<String>,
    pub user: User,
}

impl CurrentUser {
    pub fn new(username: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            auth: None,
            user: User {
                username: username.into(),
                roles,
            },
        }
    }

    pub fn username(&self) -> &str {
        &self.user.username
    }
}
