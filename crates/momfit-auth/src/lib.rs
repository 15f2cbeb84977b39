pub mod error;
pub mod permissions;
pub mod resolver;
pub mod store;
pub mod types;

pub use error::AuthError;
pub use permissions::{grant_matches, OWNER_ROLE};
pub use resolver::RoleResolver;
pub use store::{RoleStore, SqliteRoleStore};
pub use types::*;
