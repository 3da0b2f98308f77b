//! API request and response data models.
//!
//! API models are distinct from database models so the storage representation can change
//! without breaking clients. All models are annotated with `utoipa` for the generated docs.
//!
//! - [`registry`]: Registry rows and listing parameters
//! - [`children`]: Enrollment requests and enrolled children
//! - [`users`]: The authenticated principal and platform roles
//! - [`pagination`]: Shared `skip`/`limit` parameters

pub mod children;
pub mod pagination;
pub mod registry;
pub mod users;
