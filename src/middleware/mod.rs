pub mod auth;
pub mod auth_context;

pub use auth::{Claims, IdentityMiddleware};
pub use auth_context::{AuthenticatedUser, MaybeUser};
