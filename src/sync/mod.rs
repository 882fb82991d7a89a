//! Working-copy synchronization.
//!
//! Decides between reusing, cloning, or purging and re-cloning the local
//! checkout, then carries the decision out through git:
//!
//! | Local state | Action |
//! |---|---|
//! | no checkout at the working directory | `Clone` |
//! | checkout whose `origin` equals the credentialed URL | `Pull` |
//! | checkout with a different or missing `origin` | `PurgeAndClone` |
//!
//! Purge-and-clone is not atomic: a crash in between leaves no working
//! copy, which the next run sees as "no checkout" and clones again.

mod operations;
mod url;


pub use operations::{LocalState, SyncAction, inspect, synchronize};
pub use url::RepoUrl;
