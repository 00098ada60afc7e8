//! # NodeCanvas Graph Compiler (NCGC)
//!
//! Compiler for transforming NodeCanvas visual node graphs into executable
//! JavaScript source code.
//!
//! NodeCanvas programs are directed graphs of typed blocks: `exec` ports
//! carry control flow, `data` ports carry values. NCGC owns the mutable
//! graph representation, the validation rules that keep edits well-defined,
//! and the generation engine that lowers a graph snapshot to a single
//! program text driving a 2D canvas and a small variable/function runtime.
//!
//! ## Quick Start
//!
//! ```rust
//! use ncgc::{compile_graph, NodeGraph, NodeRegistry};
//!
//! let registry = NodeRegistry::builtin();
//! let mut graph = NodeGraph::new();
//! let start = graph.create_node(&registry, "start", 40.0, 40.0).unwrap().id;
//! let pen = graph.create_node(&registry, "setPenWidth", 220.0, 40.0).unwrap().id;
//! graph.create_connection(start, "out", pen, "in").unwrap();
//!
//! let code = compile_graph(&graph);
//! assert!(code.contains("ctx.lineWidth"));
//! ```
//!
//! ## Architecture
//!
//! NCGC follows a simple pipeline:
//!
//! 1. **Registry Lookup** - Node blueprints come from a queryable type table
//! 2. **Graph Editing** - Validated mutation of nodes and connections
//! 3. **Entry Selection** - Start flag, game loop driver, event hats
//! 4. **Execution Traversal** - Cycle-safe depth-first walk of exec edges
//! 5. **Data Resolution** - Memoized recursive expression synthesis
//!
//! Saved workspaces round-trip through [`NodeGraph::to_json`] and
//! [`NodeGraph::from_json`]; loading migrates every node against the live
//! registry so the persisted format stays forward-compatible as the palette
//! evolves.

pub mod codegen;
pub mod compiler;
pub mod error;
pub mod graph;
pub mod registry;

// Re-export the main compilation API
pub use compiler::compile_graph;

// Re-export the core types for convenience
pub use codegen::{CodeGenerator, PROGRAM_BINDINGS};
pub use error::GraphError;
pub use graph::{Connection, Node, NodeGraph, NodeId};
pub use registry::{DataKind, NodeBlueprint, NodeRegistry, PortDecl, PortKind};
