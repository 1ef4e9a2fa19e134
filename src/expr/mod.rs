//! Client supplied filter and update expressions.
//!
//! Callers send expressions as JSON; they are compiled once per call into a
//! [`Predicate`] (for `get-values` / `take-values`) or a [`Transform`] (for
//! `update`) before any storage access. Field references are JSON pointers
//! into the record, `""` meaning the whole record.
//!
//! ```text
//! {"and": [{"eq": ["/state", "open"]}, {"gt": ["/amount", 10]}]}
//! {"where": {"eq": ["/id", 1]}, "set": {"/state": "done"}, "remove": ["/lock"]}
//! {"where": {"exists": "/tmp"}, "replace": null}
//! ```
mod predicate;
mod transform;

#[cfg(test)]
mod expr_test;

pub use predicate::CompareOp;
pub use predicate::Predicate;
pub use transform::Transform;
