//! # Code Generation
//!
//! JavaScript emission for NodeCanvas graphs.

mod js_codegen;
mod writer;

pub use js_codegen::{CodeGenerator, PROGRAM_BINDINGS};
pub use writer::CodeWriter;
