use serde::{Deserialize, Serialize};

/// A user as returned by the user detail and listing-owner serializers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: Option<String>,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
}

/// User details embedded in the login response and cached under `userInfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UserInfo {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "first_name")]
    pub firstname: Option<String>,
    #[serde(default, alias = "last_name")]
    pub lastname: Option<String>,
    #[serde(default, alias = "phonenumber")]
    pub phone_number: Option<String>,
    pub bio: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    pub profile_picture: Option<String>,
}

impl UserInfo {
    pub fn display_name(&self) -> String {
        match (&self.firstname, &self.lastname) {
            (Some(first), Some(last)) if !first.is_empty() => format!("{} {}", first, last),
            (Some(first), _) if !first.is_empty() => first.clone(),
            _ => self.username.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Sign-up payload for `POST /users/users/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: Option<UserInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    pub user: Option<UserInfo>,
}
