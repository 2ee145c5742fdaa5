use std::collections::HashMap;

use crate::signaling::{
    auth::{IdentityError, IdentityResolver, UserProfile},
    protocol::UserId,
};

/// Fixed set of known users with their profiles.
#[derive(Debug, Default)]
pub struct InMemoryIdentities {
    users: HashMap<UserId, UserProfile>,
}

impl InMemoryIdentities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(
        mut self,
        user_id: impl Into<UserId>,
        name: impl Into<String>,
        avatar: Option<&str>,
    ) -> Self {
        self.users.insert(
            user_id.into(),
            UserProfile {
                name: name.into(),
                avatar: avatar.map(str::to_owned),
            },
        );
        self
    }
}

impl IdentityResolver for InMemoryIdentities {
    fn verify_join(&self, user_id: &str) -> Result<(), IdentityError> {
        if user_id.is_empty() {
            return Err(IdentityError::EmptyUserId);
        }
        if self.users.contains_key(user_id) {
            Ok(())
        } else {
            Err(IdentityError::UnknownUser(user_id.to_owned()))
        }
    }

    fn profile(&self, user_id: &str) -> Option<UserProfile> {
        self.users.get(user_id).cloned()
    }
}

/// Accepts any non-empty user id and knows no profiles.
#[derive(Debug, Default)]
pub struct AllowAllIdentities;

impl IdentityResolver for AllowAllIdentities {
    fn verify_join(&self, user_id: &str) -> Result<(), IdentityError> {
        if user_id.is_empty() {
            Err(IdentityError::EmptyUserId)
        } else {
            Ok(())
        }
    }

    fn profile(&self, _user_id: &str) -> Option<UserProfile> {
        None
    }
}
