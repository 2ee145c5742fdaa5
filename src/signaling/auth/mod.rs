mod identity_error;
mod identity_resolver;
mod in_memory_identities;
pub use identity_error::IdentityError;
pub use identity_resolver::{IdentityResolver, UserProfile};
pub use in_memory_identities::{AllowAllIdentities, InMemoryIdentities};
