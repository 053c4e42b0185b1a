//! Links
//!
//! Immutable (source, predicate, target) triples with provenance, the
//! queries that select them, and the diffs that move them between the local
//! store and a link language.

pub mod diff;
pub mod expression;
pub mod query;

pub use diff::{LinkDiff, RemoteDiff};
pub use expression::{ExpressionProof, Link, LinkExpression, LinkKey};
pub use query::LinkQuery;
