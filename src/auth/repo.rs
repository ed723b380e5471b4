use std::collections::HashMap;

use crate::auth::repo_types::UserRecord;

/// Lookup-by-username capability over the user directory.
pub trait CredentialStore: Send + Sync {
    fn find(&self, username: &str) -> Option<UserRecord>;
}

/// Directory fixed at startup; never mutated afterwards.
#[derive(Debug, Default)]
pub struct StaticUserDirectory {
    users: HashMap<String, UserRecord>,
}

impl StaticUserDirectory {
    pub fn new(users: impl IntoIterator<Item = UserRecord>) -> Self {
        Self {
            users: users
                .into_iter()
                .map(|u| (u.username.clone(), u))
                .collect(),
        }
    }
}

impl CredentialStore for StaticUserDirectory {
    fn find(&self, username: &str) -> Option<UserRecord> {
        self.users.get(username).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, disabled: bool) -> UserRecord {
        UserRecord {
            username: name.into(),
            password_hash: "hash".into(),
            disabled,
        }
    }

    #[test]
    fn find_returns_known_users_only() {
        let dir = StaticUserDirectory::new([record("admin", false), record("old", true)]);
        assert_eq!(dir.find("admin").unwrap().username, "admin");
        assert!(dir.find("old").unwrap().disabled);
        assert!(dir.find("ADMIN").is_none());
        assert!(dir.find("").is_none());
    }
}
