//! Database record models matching table schemas.
//!
//! These models are used by repositories and by the [`crate::db::store::Store`]
//! implementations to return query results and accept insertion data. They are kept distinct
//! from the API models in [`crate::api::models`] so storage and wire formats can evolve
//! independently.
//!
//! - [`schools`]: School records (read mostly, owned by the school management screens)
//! - [`registry_rows`]: Imported registry rows and their normalized identity
//! - [`children`]: Enrolled children bound to parent accounts

pub mod children;
pub mod registry_rows;
pub mod schools;
