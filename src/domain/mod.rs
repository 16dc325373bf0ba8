//! User records and the rules a new record must satisfy.

pub mod user;
pub mod validation;

pub use user::{UserCandidate, UserRecord};
pub use validation::{GENDERS, SchemaProfile, ValidationError, validate};
