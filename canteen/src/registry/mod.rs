//! Student registry reconciliation.
//!
//! A school admin uploads the school's student list ([`import`]), which is extracted
//! ([`extract`]), mapped onto registry fields ([`interpret`]), normalized ([`normalize`]) and
//! stored. Parents later declare their child and [`matcher`] binds the declaration to one
//! registry student.

pub mod extract;
pub mod import;
pub mod interpret;
pub mod matcher;
pub mod normalize;

pub use import::{ImportError, ImportSummary, RegistryUpload, import_registry};
pub use matcher::{DeclaredChild, EnrollmentError, enroll_child};
