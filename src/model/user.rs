use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Payroll,
    Camera,
    Reporting,
    Ai,
    Analyst,
}

impl Role {
    /// Roles listed on the manager administration screen
    pub const MANAGERS: [Role; 5] = [Role::Payroll, Role::Camera, Role::Reporting, Role::Ai, Role::Analyst];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Payroll => "payroll",
            Role::Camera => "camera",
            Role::Reporting => "reporting",
            Role::Ai => "ai",
            Role::Analyst => "analyst",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "payroll" => Ok(Role::Payroll),
            "camera" => Ok(Role::Camera),
            "reporting" => Ok(Role::Reporting),
            "ai" => Ok(Role::Ai),
            "analyst" => Ok(Role::Analyst),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

fn default_department() -> String {
    "UPSIDA".to_string()
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    #[serde(default = "default_department")]
    pub department: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub last_login: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl User {
    pub fn new(username: &str, email: &str, name: &str, role: Role) -> Self {
        User {
            id: None,
            username: username.trim().to_string(),
            email: email.trim().to_lowercase(),
            password_hash: String::new(),
            name: name.trim().to_string(),
            role,
            department: default_department(),
            is_active: true,
            last_login: None,
            refresh_token: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

/// User as exposed over the API, never carries the hash or refresh token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub department: String,
    pub is_active: bool,
    pub last_login: Option<String>,
    pub created_at: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id_hex(),
            username: user.username.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            department: user.department.clone(),
            is_active: user.is_active,
            last_login: user.last_login.clone(),
            created_at: user.created_at.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_through_str() {
        for role in [Role::Admin, Role::Payroll, Role::Camera, Role::Reporting, Role::Ai, Role::Analyst] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("operator".parse::<Role>().is_err());
    }

    #[test]
    fn test_new_user_normalizes_email() {
        let user = User::new(" ravi ", " Ravi@Example.COM ", "Ravi", Role::Camera);
        assert_eq!(user.username, "ravi");
        assert_eq!(user.email, "ravi@example.com");
        assert_eq!(user.department, "UPSIDA");
        assert!(user.is_active);
    }

    #[test]
    fn test_profile_hides_secrets() {
        let mut user = User::new("ravi", "ravi@example.com", "Ravi", Role::Camera);
        user.password_hash = "hash".to_string();
        user.refresh_token = Some("token".to_string());
        let json = serde_json::to_value(UserProfile::from(&user)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("refreshToken").is_none());
        assert_eq!(json["role"], "camera");
    }
}
