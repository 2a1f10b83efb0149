use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Access level granted by an API key.
///
/// Stored as text in `api_keys.permission`; the database constrains the
/// column to these four values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiKeyPermission {
    Read,
    Write,
    Delete,
    FullAccess,
}

impl ApiKeyPermission {
    pub fn allows_read(self) -> bool {
        matches!(self, Self::Read | Self::FullAccess)
    }

    pub fn allows_write(self) -> bool {
        matches!(self, Self::Write | Self::FullAccess)
    }

    pub fn allows_delete(self) -> bool {
        matches!(self, Self::Delete | Self::FullAccess)
    }
}

impl FromStr for ApiKeyPermission {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READ" => Ok(Self::Read),
            "WRITE" => Ok(Self::Write),
            "DELETE" => Ok(Self::Delete),
            "FULL_ACCESS" => Ok(Self::FullAccess),
            _ => Err(()),
        }
    }
}

/// The user identity an API key resolves to, carried in request extensions
/// by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    /// Permission level of the key this request authenticated with
    pub permission: ApiKeyPermission,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_parsing() {
        assert_eq!(
            "FULL_ACCESS".parse::<ApiKeyPermission>(),
            Ok(ApiKeyPermission::FullAccess)
        );
        assert_eq!("READ".parse::<ApiKeyPermission>(), Ok(ApiKeyPermission::Read));
        assert!("read".parse::<ApiKeyPermission>().is_err());
        assert!("ADMIN".parse::<ApiKeyPermission>().is_err());
    }

    #[test]
    fn test_full_access_covers_everything() {
        let p = ApiKeyPermission::FullAccess;
        assert!(p.allows_read());
        assert!(p.allows_write());
        assert!(p.allows_delete());
    }

    #[test]
    fn test_levels_are_disjoint() {
        assert!(ApiKeyPermission::Read.allows_read());
        assert!(!ApiKeyPermission::Read.allows_write());
        assert!(!ApiKeyPermission::Read.allows_delete());

        assert!(ApiKeyPermission::Write.allows_write());
        assert!(!ApiKeyPermission::Write.allows_read());

        assert!(ApiKeyPermission::Delete.allows_delete());
        assert!(!ApiKeyPermission::Delete.allows_write());
    }
}
