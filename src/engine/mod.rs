//! Rule engines.
//!
//! Both engines are file-agnostic: they take a document (tree or lines) and
//! a list of rules, apply the rules in order and return the [`Change`]s they
//! made. Attaching changes to files is the dispatcher's job.
//!
//! [`Change`]: crate::record::Change

pub mod errors;
pub mod structural;
pub mod textual;

pub use errors::RuleError;
pub use textual::TextOutcome;
