use crate::types::{AccessLevel, Permission};

pub const GLOBAL_SCOPE: &str = "global";
pub const COMMUNITY_SCOPE: &str = "community";

pub const READ: &str = "read";
pub const WRITE: &str = "write";
pub const MANAGE: &str = "manage";

pub const WILDCARD_RESOURCE: &str = "*";

/// Holding a global assignment of the role with this name grants everything.
pub const OWNER_ROLE: &str = "Owner";

/// Roles created by `seed_defaults`: (name, level, description, grants).
pub const DEFAULT_ROLES: &[(&str, AccessLevel, &str, &[(&str, &str, &str)])] = &[
    (
        OWNER_ROLE,
        AccessLevel::Owner,
        "Platform owner with every permission",
        &[(GLOBAL_SCOPE, MANAGE, WILDCARD_RESOURCE)],
    ),
    (
        "Admin",
        AccessLevel::Admin,
        "Community administrator",
        &[(COMMUNITY_SCOPE, MANAGE, WILDCARD_RESOURCE)],
    ),
    (
        "Member",
        AccessLevel::Member,
        "Community member",
        &[
            (COMMUNITY_SCOPE, READ, WILDCARD_RESOURCE),
            (COMMUNITY_SCOPE, WRITE, "messages"),
            (COMMUNITY_SCOPE, WRITE, "rsvps"),
        ],
    ),
    (
        "Guest",
        AccessLevel::Guest,
        "Read-only visitor",
        &[
            (COMMUNITY_SCOPE, READ, "events"),
            (COMMUNITY_SCOPE, READ, "messages"),
        ],
    ),
];

/// Whether `grant` satisfies `requested`.
///
/// Scope matching is asymmetric: a `global` grant satisfies a request in any
/// scope, but a grant in any other scope never satisfies a `global` request.
/// `manage` covers every action and `*` covers every resource.
pub fn grant_matches(grant: &Permission, requested: &Permission) -> bool {
    (grant.scope == GLOBAL_SCOPE || grant.scope == requested.scope)
        && (grant.action == MANAGE || grant.action == requested.action)
        && (grant.resource == WILDCARD_RESOURCE || grant.resource == requested.resource)
}

pub fn any_grant_matches<'a>(
    grants: impl IntoIterator<Item = &'a Permission>,
    requested: &Permission,
) -> bool {
    grants.into_iter().any(|g| grant_matches(g, requested))
}
