use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum::{Display, EnumString};

/// Access role read from a user's profile record.
///
/// Matching is exact: `"Admin"` or `"admin "` is not admin.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    /// No profile, an unrecognised role string, or the profile could not be read.
    #[default]
    Unknown,
}

impl Role {
    /// Only admins may flip control flags.
    pub fn can_control(self) -> bool {
        self == Self::Admin
    }

    fn from_field(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some("admin") => Self::Admin,
            Some("user") => Self::User,
            _ => Self::Unknown,
        }
    }
}

/// The record stored at `users/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub role: Role,
    pub email: Option<String>,
}

impl UserProfile {
    pub fn from_value(value: &Value) -> Self {
        Self {
            role: Role::from_field(value.get("role")),
            email: value.get("email").and_then(Value::as_str).map(str::to_owned),
        }
    }

    /// The record written for a freshly registered account.
    pub fn new_user_record(email: &str) -> Value {
        json!({ "role": Role::User.to_string(), "email": email })
    }
}

/// An authenticated identity-provider session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
}

/// Store location of a user's profile record.
pub fn profile_path(user_id: &str) -> String {
    format!("users/{user_id}")
}
