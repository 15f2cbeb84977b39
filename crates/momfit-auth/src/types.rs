use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse access tier of a role. Decisions are made from grants; the level is
/// descriptive metadata for listings and seeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    Owner,
    Admin,
    Member,
    Guest,
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessLevel::Owner => f.pad("owner"),
            AccessLevel::Admin => f.pad("admin"),
            AccessLevel::Member => f.pad("member"),
            AccessLevel::Guest => f.pad("guest"),
        }
    }
}

impl std::str::FromStr for AccessLevel {
    type Err = crate::error::AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "owner" => Ok(AccessLevel::Owner),
            "admin" => Ok(AccessLevel::Admin),
            "member" => Ok(AccessLevel::Member),
            "guest" => Ok(AccessLevel::Guest),
            _ => Err(crate::error::AuthError::InvalidInput(format!(
                "unknown access level: {s}"
            ))),
        }
    }
}

/// One `{scope, action, resource}` unit. Used both for grants attached to a
/// role and for the permission a caller asks about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Permission {
    pub scope: String,
    pub action: String,
    pub resource: String,
}

impl Permission {
    pub fn new(scope: &str, action: &str, resource: &str) -> Self {
        Self {
            scope: scope.to_string(),
            action: action.to_string(),
            resource: resource.to_string(),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.scope, self.action, self.resource)
    }
}

impl std::str::FromStr for Permission {
    type Err = crate::error::AuthError;

    /// Parse `scope:action:resource`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [scope, action, resource]
                if !scope.is_empty() && !action.is_empty() && !resource.is_empty() =>
            {
                Ok(Permission::new(scope, action, resource))
            }
            _ => Err(crate::error::AuthError::InvalidInput(format!(
                "expected scope:action:resource, got '{s}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub access_level: AccessLevel,
    pub description: String,
    pub permissions: Vec<Permission>,
    pub created_at: DateTime<Utc>,
}

/// A role bound to a user, joined with the role definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRoleAssignment {
    pub id: String,
    pub user_id: String,
    pub role: Role,
    /// `None` means the assignment applies globally.
    pub community_id: Option<String>,
    pub assigned_by: Option<String>,
    pub assigned_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl UserRoleAssignment {
    pub fn is_global(&self) -> bool {
        self.community_id.is_none()
    }

    /// An assignment is inert from its expiry instant onwards.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|exp| exp > now)
    }

    pub fn applies_to(&self, community_id: &str) -> bool {
        self.community_id.as_deref() == Some(community_id)
    }
}

/// Row to insert when assigning a role.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAssignment {
    pub user_id: String,
    pub role_id: String,
    pub community_id: Option<String>,
    pub assigned_by: Option<String>,
    pub assigned_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub access_level: AccessLevel,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRoleRequest {
    pub description: Option<String>,
    pub access_level: Option<AccessLevel>,
    pub permissions: Option<Vec<Permission>>,
}
