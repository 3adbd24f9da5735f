//! User Model

use serde::{Deserialize, Serialize};

/// Logged-in user as stored under the session token key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: i64,
    pub nick_name: String,
    #[serde(default)]
    pub icon: Option<String>,
}
