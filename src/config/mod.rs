//! Build configuration.
//!
//! Resolves either the individual CLI flags or a `--json` build request
//! into one immutable [`BuildConfig`]. Mixing both sources is rejected, and
//! the completeness rules for cloning, pushing, and substituters are
//! enforced identically for either source.

mod document;
mod model;
mod resolve;
pub mod schema;


// Re-export public API
pub use model::{BuildConfig, CloneSpec, PushSpec, Substituter};
pub use resolve::resolve;
pub use schema::{JsonSchemaValidator, Validator};
