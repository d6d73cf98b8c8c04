//! metabase-git-sync: Metabase collections and cards mirrored into git
//!
//! Walks the collection hierarchy of a Metabase instance, resolves every card
//! to its SQL text, writes the result as a directory tree of JSON metadata and
//! `.sql` files, and commits that tree as one git revision.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod materialize;
pub mod model;
pub mod report;
pub mod resolver;
pub mod snapshot;
pub mod sync;
pub mod tree;
