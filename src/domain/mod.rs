//! Domain models for the blueprint tool
//!
//! Plain data shared by every layer: the blueprint tree, operation records
//! and receipts. No I/O happens here.

mod cancel;
mod operation;
mod tree;

pub use cancel::CancelToken;
pub use operation::{Operation, OperationKind, Receipt};
pub use tree::{Node, NodeKind, Tree};
