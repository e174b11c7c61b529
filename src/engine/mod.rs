//! # Transformation Engine
//!
//! The three mappings between representations of a project layout, plus the
//! checks that run between them.
//!
//! | From | To | Type |
//! |------|----|------|
//! | Blueprint text | Tree | [`Parser`] |
//! | Tree | Blueprint text | [`Parser::serialize`] / [`Parser::write`] |
//! | Tree | Folder on disk | [`Generator`] |
//! | Folder on disk | Tree | [`Reverser`] |
//!
//! [`Validator`] prunes reserved entries and rejects unsafe trees before
//! generation. [`sync`] removes folder entries a blueprint no longer names.
//!
//! All operations are synchronous and take a [`CancelToken`](crate::domain::CancelToken)
//! through `with_cancel`.

mod generator;
mod parser;
mod reverser;
pub mod sync;
mod validator;

pub use generator::{GenerateError, GenerateFailure, GenerateOptions, Generator};
pub use parser::{
    sanitize_name, serialize, Diagnostic, ParseError, Parsed, Parser, BLUEPRINT_EXTENSION,
};
pub use reverser::{insert_path, ReverseError, Reverser};
pub use validator::{ValidationError, ValidationReport, Validator, DEFAULT_RESERVED};
