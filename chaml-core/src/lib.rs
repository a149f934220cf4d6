//! Core of the CHaml template compiler.
//!
//! CHaml compiles indentation-structured Haml templates into HTML4, HTML5
//! or XHTML. The pipeline is roughly:
//!
//!   template text
//!     -> lexer      (indent-tagged lines)
//!     -> multiline  (pipe and attribute continuations joined)
//!     -> tree       (first-child / next-sibling tree, `-#` removed)
//!     -> resolve    (filters, scripts and attributes evaluated)
//!     -> emit       (tags, comments, doctypes and escaping)
//!     -> flatten    (markup text)
//!
//! Embedded code is evaluated through the [`ScriptEvaluator`] trait; the
//! crate ships a small safe [`Interpreter`] implementing it. Front ends
//! (the `chaml` CLI) depend on this crate rather than reimplementing the
//! pipeline.

// ---------------------------------------------------------------------
// Error handling and options
// ---------------------------------------------------------------------

pub mod error;
pub mod options;

// ---------------------------------------------------------------------
// Storage: arena, slices and lines
// ---------------------------------------------------------------------

pub mod arena;
pub mod line;

// ---------------------------------------------------------------------
// Front-end: lines, continuations and the indentation tree
// ---------------------------------------------------------------------

pub(crate) mod scan;
pub mod lexer;
pub mod multiline;
pub mod tree;

// ---------------------------------------------------------------------
// Dynamic resolution: scripts, filters and attributes
// ---------------------------------------------------------------------

pub mod script;
pub(crate) mod interpolate;
pub(crate) mod attributes;
pub(crate) mod program;
pub mod preserve;
pub(crate) mod filters;
pub mod resolve;

// ---------------------------------------------------------------------
// Back-end: emission, escaping and serialization
// ---------------------------------------------------------------------

pub mod doctype;
pub mod escape;
pub mod emit;
pub mod flatten;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{Engine, compile};
pub use error::{CoreError, OptionError, ScriptError};
pub use options::{Format, OptionValue, Options};
pub use script::{Interpreter, ScriptEvaluator, Value};
