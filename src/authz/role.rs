use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The closed set of account roles.
///
/// Roles carry no ordering: Admin is not implicitly "above" anyone, every
/// rule lists the roles it admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    #[serde(rename = "Admin")]
    Admin,
    #[serde(rename = "Project Manager")]
    ProjectManager,
    #[serde(rename = "Project Lead")]
    ProjectLead,
    #[serde(rename = "Developer")]
    Developer,
    #[serde(rename = "Client")]
    Client,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::ProjectManager,
        Role::ProjectLead,
        Role::Developer,
        Role::Client,
    ];

    /// Storage and wire label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::ProjectManager => "Project Manager",
            Role::ProjectLead => "Project Lead",
            Role::Developer => "Developer",
            Role::Client => "Client",
        }
    }

    pub fn is_one_of(&self, roles: &[Role]) -> bool {
        roles.contains(self)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Developer
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a valid choice.")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| UnknownRole(value.to_string()))
    }
}
