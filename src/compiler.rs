//! # NodeCanvas Compiler
//!
//! Main entry point for compiling node graphs to JavaScript.

use crate::codegen::CodeGenerator;
use crate::graph::NodeGraph;

/// Compile a NodeCanvas graph to JavaScript source text.
///
/// This is the main entry point for the compiler. It takes a visual node
/// graph and generates an equivalent JavaScript program that draws on a 2D
/// canvas and drives the small NodeCanvas runtime surface.
///
/// Compilation cannot fail: a graph with no entry point yields an
/// explanatory placeholder program, and structural gaps inside an otherwise
/// valid graph degrade to commented placeholders in the output. The graph is
/// only read — callers may keep editing it between runs.
///
/// The produced text expects the host to evaluate it with the bindings named
/// by [`crate::codegen::PROGRAM_BINDINGS`], in that order: the output canvas,
/// its 2D drawing context, a key-press registration hook, a point-in-time
/// key-state query, and an audio context.
///
/// # Examples
///
/// ```rust
/// use ncgc::{compile_graph, NodeGraph, NodeRegistry};
///
/// let registry = NodeRegistry::builtin();
/// let mut graph = NodeGraph::new();
/// let start = graph.create_node(&registry, "start", 40.0, 40.0).unwrap().id;
/// let circle = graph.create_node(&registry, "drawCircle", 220.0, 40.0).unwrap().id;
/// graph.create_connection(start, "out", circle, "in").unwrap();
///
/// let code = compile_graph(&graph);
/// assert!(code.contains("ctx.arc"));
/// ```
pub fn compile_graph(graph: &NodeGraph) -> String {
    tracing::info!("[NCGC] Starting NodeCanvas compilation");
    tracing::info!(
        "[NCGC] Graph: {} nodes, {} connections",
        graph.nodes().len(),
        graph.connections().len()
    );

    let generator = CodeGenerator::new(graph);
    let code = generator.generate_program();

    tracing::info!("[NCGC] Code generation complete ({} bytes)", code.len());
    code
}
