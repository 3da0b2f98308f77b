//! Repository implementations for database access.
//!
//! Each repository:
//! - Wraps a SQLx connection or transaction
//! - Provides strongly-typed operations for one table
//! - Returns domain models from [`crate::db::models`]
//! - Uses the connection's transaction for ACID guarantees
//!
//! # Available Repositories
//!
//! - [`Schools`]: School lookup and the cached student count
//! - [`RegistryRows`]: Registry replacement and the lookups used by enrollment matching
//! - [`Children`]: Enrolled children
//!
//! ```ignore
//! use canteen::db::handlers::RegistryRows;
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let mut repo = RegistryRows::new(&mut tx);
//!     repo.delete_for_school(school_id).await?;
//!     repo.insert_batch(&rows).await?;
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod children;
pub mod registry_rows;
pub mod schools;

pub use children::Children;
pub use registry_rows::RegistryRows;
pub use schools::Schools;
