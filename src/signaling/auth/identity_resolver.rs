use crate::signaling::auth::IdentityError;

/// Display data for a user as the rest of the chat application knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub name: String,
    pub avatar: Option<String>,
}

/// Pluggable source of user identities.
///
/// The relay does not authenticate; this decides whether a `join` is
/// accepted and what `callerInfo` accompanies an offer.
pub trait IdentityResolver: Send + Sync {
    fn verify_join(&self, user_id: &str) -> Result<(), IdentityError>;

    fn profile(&self, user_id: &str) -> Option<UserProfile>;
}
