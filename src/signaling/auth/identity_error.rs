use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("empty user id")]
    EmptyUserId,
    #[error("unknown user '{0}'")]
    UnknownUser(String),
}
