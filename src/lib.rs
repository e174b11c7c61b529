//! blueprint - project layouts as plain text
//!
//! A blueprint is an indentation-based listing of directories (`name/`) and
//! files. This crate parses blueprints into trees, generates folders from
//! trees, reverses folders back into blueprints, and keeps a history of every
//! layout-changing operation so it can be undone and redone.

pub mod cli;
pub mod domain;
pub mod engine;
pub mod service;
pub mod source;
pub mod storage;

pub use domain::{Node, NodeKind, Operation, OperationKind, Receipt, Tree};
