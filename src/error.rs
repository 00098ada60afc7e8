//! # Graph Errors
//!
//! Error taxonomy for structural edits against the graph IR.
//!
//! Every variant is a *structural reject*: the attempted mutation violated a
//! graph invariant, the IR was left unchanged, and the variant doubles as the
//! diagnostic reported to the caller. Code generation never produces these —
//! generation degrades to commented placeholders instead of failing.

use thiserror::Error;

use crate::graph::NodeId;
use crate::registry::{DataKind, PortKind};

#[derive(Debug, Error)]
pub enum GraphError {
    /// The requested node type has no registry blueprint.
    #[error("unknown node type \"{0}\"")]
    UnknownType(String),

    /// A connection endpoint referenced a node id not present in the graph.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    /// A connection endpoint referenced a port id the node does not declare.
    #[error("port '{port}' not found on node {node}")]
    PortNotFound { node: NodeId, port: String },

    /// An execution port may not connect a node to itself.
    #[error("execution port cannot connect node {0} to itself")]
    ExecSelfLoop(NodeId),

    /// Exec ports connect only to exec ports, data ports only to data ports.
    #[error("port kind mismatch ('{from}' to '{to}')")]
    PortKindMismatch { from: PortKind, to: PortKind },

    /// Data ports must agree on data type unless either side is `any`.
    #[error("data type mismatch ('{from}' to '{to}')")]
    DataTypeMismatch { from: DataKind, to: DataKind },

    /// The exact edge already exists.
    #[error("this exact connection path already exists")]
    DuplicateConnection,
}
