//! Sketch source parser
//!
//! This module turns sketch text into the lowered representation the
//! interpreter runs:
//! - [`extract`]: comment stripping, globals, `setup`/`loop`/function bodies,
//!   statement segmentation
//! - [`statements`] and [`expressions`]: lowering statement and expression text
//!   into [`ast`] nodes
//! - [`scan`]: the bracket- and literal-aware text helpers both layers share
//!
//! # Dialect
//!
//! The accepted language is a loose subset of Arduino C: declared types are
//! discarded, expressions beyond the recognised calls go through a restricted
//! arithmetic grammar, and anything unrecognised is kept as an ignored
//! statement. Parsing never fails.

pub mod ast;
pub mod expressions;
pub mod extract;
pub mod scan;
pub mod statements;

pub use ast::SourceLocation;
pub use extract::{extract, ExtractedSketch};
