//! Authentication and authorization.
//!
//! The service does not issue sessions. An upstream auth gateway authenticates the caller and
//! forwards the principal as trusted request headers (names configured under
//! `auth.proxy_header`):
//!
//! - user id (UUID)
//! - role: `super_admin`, `school_admin`, `canteen_manager` or `parent`
//! - school id (UUID, optional)
//!
//! # Modules
//!
//! - [`current_user`]: The [`CurrentUser`](crate::api::models::users::CurrentUser) extractor
//! - [`permissions`]: Role to permission table and the [`RequiresPermission`](permissions::RequiresPermission) extractor
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use canteen::auth::permissions::{operation, resource, RequiresPermission};
//!
//! async fn import(current_user: RequiresPermission<resource::Registry, operation::CreateOwn>) {
//!     tracing::info!("import requested by {}", current_user.id);
//! }
//! ```

pub mod current_user;
pub mod permissions;
