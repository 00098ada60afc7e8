//! # Graph IR
//!
//! The mutable program representation: node instances, typed connections, and
//! the validation rules that keep structural edits well-defined. All mutation
//! goes through [`NodeGraph`]; rejected edits leave the graph untouched and
//! return the reason as a [`GraphError`].
//!
//! The persisted JSON format (`{nodes, connections, nextNodeId}`, camelCase
//! keys throughout) is what the NodeCanvas editor saves and loads;
//! [`NodeGraph::from_json`] migrates every loaded node against the live
//! registry so old files keep working as the palette evolves.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::GraphError;
use crate::registry::{DataKind, NodeRegistry, PortDecl, PortKind};

/// Node ids are positive, monotonically assigned, and never reused within a
/// session.
pub type NodeId = u64;

/// One placed node. `inputs`/`outputs` are deep copies of the blueprint's
/// port lists, so per-instance edits (a literal's value, a tweaked default)
/// never alias another instance of the same type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    /// Editor placement only; not load-bearing for generation.
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub inputs: Vec<PortDecl>,
    #[serde(default)]
    pub outputs: Vec<PortDecl>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A directed edge between an output port and an input port, tagged with the
/// port kinds and data types of both endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Opaque, session-unique. Uniqueness is the contract, not
    /// reproducibility.
    pub id: String,
    pub from_node: NodeId,
    pub from_port: String,
    pub from_port_type: PortKind,
    pub from_data_type: DataKind,
    pub to_node: NodeId,
    pub to_port: String,
    pub to_port_type: PortKind,
    pub to_data_type: DataKind,
}

/// The graph itself. Nodes are kept in creation order, which makes entry
/// selection and function hoisting deterministic.
#[derive(Clone, Debug)]
pub struct NodeGraph {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    next_node_id: NodeId,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            connections: Vec::new(),
            next_node_id: 1,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn next_node_id(&self) -> NodeId {
        self.next_node_id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Every connection where `id` is source or target.
    pub fn connections_for_node(&self, id: NodeId) -> impl Iterator<Item = &Connection> + '_ {
        self.connections
            .iter()
            .filter(move |c| c.from_node == id || c.to_node == id)
    }

    /// The (at most one) connection feeding a given input port.
    pub fn connection_to_input(&self, to_node: NodeId, to_port: &str) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|c| c.to_node == to_node && c.to_port == to_port)
    }

    /// Create a node of a registered type at the given editor position.
    ///
    /// Ports and properties are deep-copied from the blueprint. Literal-like
    /// types (`number`, `string`, `randomNumber`) additionally seed their
    /// editable properties from the blueprint defaults so the instance is
    /// valid before the user ever touches it.
    pub fn create_node(
        &mut self,
        registry: &NodeRegistry,
        node_type: &str,
        x: f64,
        y: f64,
    ) -> Result<&Node, GraphError> {
        let Some(bp) = registry.blueprint_of(node_type) else {
            tracing::warn!("cannot create node: unknown type \"{node_type}\"");
            return Err(GraphError::UnknownType(node_type.to_string()));
        };

        let id = self.next_node_id;
        self.next_node_id += 1;

        let mut node = Node {
            id,
            node_type: node_type.to_string(),
            x: x.round(),
            y: y.round(),
            inputs: bp.inputs.clone(),
            outputs: bp.outputs.clone(),
            properties: bp.properties.clone(),
        };

        match node_type {
            "number" | "string" => {
                let seed = node
                    .inputs
                    .iter()
                    .find(|p| p.id == "value")
                    .and_then(|p| p.default.clone());
                if let Some(seed) = seed {
                    node.properties.insert("value".to_string(), seed);
                }
            }
            "randomNumber" => {
                node.properties
                    .entry("min".to_string())
                    .or_insert_with(|| json!(1));
                node.properties
                    .entry("max".to_string())
                    .or_insert_with(|| json!(100));
            }
            _ => {}
        }

        self.nodes.push(node);
        let idx = self.nodes.len() - 1;
        Ok(&self.nodes[idx])
    }

    /// Create a connection between an output port and an input port.
    ///
    /// Checks run in order: both nodes exist, both ports exist (source looked
    /// up in `outputs`, target in `inputs`), no exec self-loop, matching port
    /// kinds, matching data types unless either side is `any`. On success any
    /// connection already feeding the target input is superseded first, then
    /// an exact duplicate of the requested edge is rejected if one remains.
    pub fn create_connection(
        &mut self,
        from_node: NodeId,
        from_port: &str,
        to_node: NodeId,
        to_port: &str,
    ) -> Result<&Connection, GraphError> {
        let from_decl = self.output_port(from_node, from_port)?;
        let to_decl = self.input_port(to_node, to_port)?;

        if from_node == to_node
            && from_decl.port_type == PortKind::Exec
            && to_decl.port_type == PortKind::Exec
        {
            tracing::warn!("connection canceled: exec self-loop on node {from_node}");
            return Err(GraphError::ExecSelfLoop(from_node));
        }
        if from_decl.port_type != to_decl.port_type {
            tracing::warn!(
                "connection canceled: port kind mismatch ('{}' to '{}')",
                from_decl.port_type,
                to_decl.port_type
            );
            return Err(GraphError::PortKindMismatch {
                from: from_decl.port_type,
                to: to_decl.port_type,
            });
        }
        if from_decl.port_type == PortKind::Data
            && from_decl.data_type != DataKind::Any
            && to_decl.data_type != DataKind::Any
            && from_decl.data_type != to_decl.data_type
        {
            tracing::warn!(
                "connection canceled: data type mismatch ('{}' to '{}')",
                from_decl.data_type,
                to_decl.data_type
            );
            return Err(GraphError::DataTypeMismatch {
                from: from_decl.data_type,
                to: to_decl.data_type,
            });
        }

        let from_port_type = from_decl.port_type;
        let from_data_type = from_decl.data_type;
        let to_port_type = to_decl.port_type;
        let to_data_type = to_decl.data_type;

        // An input port holds at most one incoming connection; a new edge
        // silently supersedes the old one.
        if let Some(pos) = self
            .connections
            .iter()
            .position(|c| c.to_node == to_node && c.to_port == to_port)
        {
            let old = self.connections.remove(pos);
            tracing::debug!("superseding connection {} into {to_node}.{to_port}", old.id);
        }

        if self.connections.iter().any(|c| {
            c.from_node == from_node
                && c.from_port == from_port
                && c.to_node == to_node
                && c.to_port == to_port
        }) {
            tracing::warn!("connection canceled: exact path already exists");
            return Err(GraphError::DuplicateConnection);
        }

        let connection = Connection {
            id: format!(
                "conn_{from_node}_{from_port}_{to_node}_{to_port}_{}",
                Uuid::new_v4()
            ),
            from_node,
            from_port: from_port.to_string(),
            from_port_type,
            from_data_type,
            to_node,
            to_port: to_port.to_string(),
            to_port_type,
            to_data_type,
        };
        self.connections.push(connection);
        let idx = self.connections.len() - 1;
        Ok(&self.connections[idx])
    }

    /// Remove a node and every connection touching it.
    pub fn remove_node(&mut self, id: NodeId) {
        self.connections
            .retain(|c| c.from_node != id && c.to_node != id);
        self.nodes.retain(|n| n.id != id);
        tracing::debug!("node {id} and its connections removed");
    }

    /// Remove a connection by id. No-op if absent.
    pub fn remove_connection(&mut self, connection_id: &str) {
        let before = self.connections.len();
        self.connections.retain(|c| c.id != connection_id);
        if self.connections.len() < before {
            tracing::debug!("connection {connection_id} removed");
        }
    }

    /// Override an input port's default value on one node instance.
    pub fn set_input_default(
        &mut self,
        node_id: NodeId,
        port_id: &str,
        value: Value,
    ) -> Result<(), GraphError> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        let port = node
            .inputs
            .iter_mut()
            .find(|p| p.id == port_id)
            .ok_or_else(|| GraphError::PortNotFound {
                node: node_id,
                port: port_id.to_string(),
            })?;
        port.default = Some(value);
        Ok(())
    }

    /// Set an entry in one node instance's property bag.
    pub fn set_property(
        &mut self,
        node_id: NodeId,
        key: &str,
        value: Value,
    ) -> Result<(), GraphError> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        node.properties.insert(key.to_string(), value);
        Ok(())
    }

    /// Export the whole graph verbatim.
    pub fn to_json(&self) -> Value {
        json!({
            "nodes": self.nodes,
            "connections": self.connections,
            "nextNodeId": self.next_node_id,
        })
    }

    /// Rebuild a graph from persisted JSON, migrating every node against the
    /// live registry.
    ///
    /// Never fails: a malformed payload resets to an empty graph, malformed
    /// records are skipped, and nodes whose type has left the registry are
    /// dropped together with their incident connections. A missing
    /// `nextNodeId` is recomputed as the maximum loaded node id plus one.
    ///
    /// Loaded nodes keep only their previously saved per-instance input
    /// defaults and properties; port lists are re-derived from the current
    /// blueprint, which makes old files forward-compatible with palette
    /// changes (removed ports vanish, new ports appear with their defaults).
    pub fn from_json(data: Value, registry: &NodeRegistry) -> Self {
        let Some(payload) = data.as_object() else {
            tracing::warn!("from_json: invalid payload, resetting to empty graph");
            return Self::new();
        };

        let raw_nodes = payload
            .get("nodes")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let raw_connections = payload
            .get("connections")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let saved_next = payload.get("nextNodeId").and_then(Value::as_u64);

        let mut nodes: Vec<Node> = Vec::new();
        let mut dropped: HashSet<NodeId> = HashSet::new();
        let mut max_loaded_id: NodeId = 0;

        for raw in raw_nodes {
            let mut node: Node = match serde_json::from_value(raw) {
                Ok(node) => node,
                Err(err) => {
                    tracing::warn!("from_json: skipping malformed node record: {err}");
                    continue;
                }
            };
            max_loaded_id = max_loaded_id.max(node.id);

            let Some(bp) = registry.blueprint_of(&node.node_type) else {
                tracing::warn!(
                    "from_json: dropping node {} of unknown type \"{}\"",
                    node.id,
                    node.node_type
                );
                dropped.insert(node.id);
                continue;
            };

            // Re-derive ports from the live blueprint, keeping saved
            // per-instance input defaults.
            let mut inputs = bp.inputs.clone();
            for base in inputs.iter_mut() {
                if let Some(saved) = node.inputs.iter().find(|p| p.id == base.id) {
                    if let Some(default) = &saved.default {
                        base.default = Some(default.clone());
                    }
                }
            }
            node.inputs = inputs;
            node.outputs = bp.outputs.clone();

            // Blueprint properties first, saved values win.
            let mut properties = bp.properties.clone();
            for (key, value) in std::mem::take(&mut node.properties) {
                properties.insert(key, value);
            }
            node.properties = properties;

            nodes.push(node);
        }

        let connections: Vec<Connection> = raw_connections
            .into_iter()
            .filter_map(|raw| match serde_json::from_value::<Connection>(raw) {
                Ok(conn) => Some(conn),
                Err(err) => {
                    tracing::warn!("from_json: skipping malformed connection record: {err}");
                    None
                }
            })
            .filter(|c| !dropped.contains(&c.from_node) && !dropped.contains(&c.to_node))
            .collect();

        let next_node_id = saved_next.unwrap_or(max_loaded_id + 1).max(1);

        tracing::debug!(
            "from_json: loaded {} nodes, {} connections",
            nodes.len(),
            connections.len()
        );

        Self {
            nodes,
            connections,
            next_node_id,
        }
    }

    fn output_port(&self, node_id: NodeId, port_id: &str) -> Result<PortDecl, GraphError> {
        let node = self
            .node(node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        node.outputs
            .iter()
            .find(|p| p.id == port_id)
            .cloned()
            .ok_or_else(|| GraphError::PortNotFound {
                node: node_id,
                port: port_id.to_string(),
            })
    }

    fn input_port(&self, node_id: NodeId, port_id: &str) -> Result<PortDecl, GraphError> {
        let node = self
            .node(node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        node.inputs
            .iter()
            .find(|p| p.id == port_id)
            .cloned()
            .ok_or_else(|| GraphError::PortNotFound {
                node: node_id,
                port: port_id.to_string(),
            })
    }
}

impl Default for NodeGraph {
    fn default() -> Self {
        Self::new()
    }
}
