//! Testing helpers: ad-hoc bindable records and change logs.
//!
//! Use [`Record`] to assemble object graphs without declaring Rust types, and
//! [`ChangeLog`] to capture the notifications an object raises as plain text
//! for snapshot-style assertions.

pub mod record;
pub mod changes;

pub use changes::ChangeLog;
pub use record::Record;
