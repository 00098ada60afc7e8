//! # Node Type Registry
//!
//! The blueprint table the rest of the crate compiles against. Each entry maps
//! a type name to the ports and properties a node of that type is born with;
//! the graph IR deep-copies blueprints into instances and never mutates the
//! table, so a registry can back any number of graphs at once.
//!
//! Node "type" is a closed set of variants dispatched by string tag. New types
//! are added by registering entries, not by subclassing anything — hosts that
//! extend the palette call [`NodeRegistry::register`] before building graphs.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Whether a port carries control flow or a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    Exec,
    Data,
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortKind::Exec => write!(f, "exec"),
            PortKind::Data => write!(f, "data"),
        }
    }
}

/// Declared type of a data port. `Any` is a wildcard on either end of a
/// connection; `Exec` is the marker type exec ports carry on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Number,
    String,
    Boolean,
    Color,
    Expression,
    Any,
    Exec,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataKind::Number => "number",
            DataKind::String => "string",
            DataKind::Boolean => "boolean",
            DataKind::Color => "color",
            DataKind::Expression => "expression",
            DataKind::Any => "any",
            DataKind::Exec => "exec",
        };
        write!(f, "{name}")
    }
}

/// One port declaration. Blueprint port lists are ordered; `id` is stable
/// across instances and is what connections reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDecl {
    pub id: String,
    pub name: String,
    pub port_type: PortKind,
    pub data_type: DataKind,
    /// Default value used when the port has no incoming connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Immutable per-type blueprint: what a freshly created node looks like.
#[derive(Clone, Debug)]
pub struct NodeBlueprint {
    /// Palette display name.
    pub title: String,
    /// Palette grouping tag.
    pub category: String,
    pub inputs: Vec<PortDecl>,
    pub outputs: Vec<PortDecl>,
    /// Free-form per-type bag (literal values, fill flags, ...).
    pub properties: Map<String, Value>,
}

/// Registry of node type blueprints, keyed by type name.
///
/// Queries are read-only; the graph IR consults `type_exists`/`blueprint_of`
/// when creating nodes and when migrating loaded graphs.
pub struct NodeRegistry {
    types: HashMap<String, NodeBlueprint>,
    // Palette order: insertion order of first registration.
    order: Vec<String>,
}

impl NodeRegistry {
    /// An empty registry. Mostly useful in tests; hosts usually start from
    /// [`NodeRegistry::builtin`].
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn type_exists(&self, node_type: &str) -> bool {
        self.types.contains_key(node_type)
    }

    pub fn blueprint_of(&self, node_type: &str) -> Option<&NodeBlueprint> {
        self.types.get(node_type)
    }

    /// Palette display name for a type, falling back to the type name itself.
    pub fn title_of<'a>(&'a self, node_type: &'a str) -> &'a str {
        self.types
            .get(node_type)
            .map(|bp| bp.title.as_str())
            .unwrap_or(node_type)
    }

    /// Register (or replace) a blueprint. Replacing keeps the original
    /// palette position.
    pub fn register(&mut self, node_type: impl Into<String>, blueprint: NodeBlueprint) {
        let node_type = node_type.into();
        if !self.types.contains_key(&node_type) {
            self.order.push(node_type.clone());
        }
        self.types.insert(node_type, blueprint);
    }

    /// Blueprints in palette order.
    pub fn node_types(&self) -> impl Iterator<Item = (&str, &NodeBlueprint)> + '_ {
        self.order
            .iter()
            .filter_map(|ty| self.types.get(ty).map(|bp| (ty.as_str(), bp)))
    }

    /// The full built-in NodeCanvas palette.
    pub fn builtin() -> Self {
        let mut reg = Self::new();

        // --- Control Flow ---
        reg.register(
            "start",
            blueprint("Start Flag! 🏁", "control", vec![], vec![exec_out("out", "▶ Go")], no_props()),
        );
        reg.register(
            "gameLoop",
            blueprint(
                "Game Loop 🏃‍♂️",
                "control",
                vec![],
                vec![exec_out("tick", "On Every Frame")],
                no_props(),
            ),
        );
        reg.register(
            "whenKeyPressed",
            blueprint(
                "When [Key] Pressed ⌨️",
                "control",
                vec![data_in("key", "Key", DataKind::String, json!("space"))],
                vec![exec_out("out", "▶ Do This")],
                no_props(),
            ),
        );
        reg.register(
            "repeat",
            blueprint(
                "Do Again! 🔁",
                "control",
                vec![
                    exec_in(),
                    data_in("count", "How Many Times?", DataKind::Number, json!(3)),
                ],
                vec![
                    exec_out("body", "Repeat This"),
                    exec_out("out", "▶ After Repeating"),
                ],
                no_props(),
            ),
        );
        reg.register(
            "if",
            blueprint(
                "If This...Then 🤔",
                "control",
                vec![
                    exec_in(),
                    data_in("condition", "If True?", DataKind::Boolean, json!(true)),
                ],
                vec![
                    exec_out("then", "Do This (If True)"),
                    exec_out("else", "Do This (If False)"),
                    exec_out("out", "▶ After If"),
                ],
                no_props(),
            ),
        );
        reg.register(
            "while",
            blueprint(
                "Keep Doing If... 🔄",
                "control",
                vec![
                    exec_in(),
                    data_in("condition", "Keep Going If True?", DataKind::Boolean, json!(false)),
                ],
                vec![
                    exec_out("body", "Do This While True"),
                    exec_out("out", "▶ After Loop"),
                ],
                no_props(),
            ),
        );

        // --- Drawing & Motion ---
        reg.register(
            "moveTo",
            blueprint(
                "Jump Pen 🤸",
                "drawing",
                vec![
                    exec_in(),
                    data_in("x", "X spot", DataKind::Number, json!(50)),
                    data_in("y", "Y spot", DataKind::Number, json!(50)),
                ],
                vec![exec_out("out", "▶ Next")],
                no_props(),
            ),
        );
        reg.register(
            "lineTo",
            blueprint(
                "Draw Line! 📏",
                "drawing",
                vec![
                    exec_in(),
                    data_in("x", "To X", DataKind::Number, json!(150)),
                    data_in("y", "To Y", DataKind::Number, json!(150)),
                ],
                vec![exec_out("out", "▶ Next")],
                no_props(),
            ),
        );
        reg.register(
            "setColor",
            blueprint(
                "Pen Color 🎨",
                "drawing",
                vec![
                    exec_in(),
                    data_in("color", "Color", DataKind::Color, json!("#FF6347")),
                ],
                vec![exec_out("out", "▶ Next")],
                no_props(),
            ),
        );
        reg.register(
            "setPenWidth",
            blueprint(
                "Pen Size 🖊️",
                "drawing",
                vec![exec_in(), data_in("width", "Size", DataKind::Number, json!(3))],
                vec![exec_out("out", "▶ Next")],
                no_props(),
            ),
        );
        reg.register(
            "drawCircle",
            blueprint(
                "Draw Circle ⭕",
                "drawing",
                vec![
                    exec_in(),
                    data_in("x", "Center X", DataKind::Number, json!(100)),
                    data_in("y", "Center Y", DataKind::Number, json!(100)),
                    data_in("radius", "Big-ness", DataKind::Number, json!(25)),
                ],
                vec![exec_out("out", "▶ Next")],
                props(&[("fill", json!(true))]),
            ),
        );
        reg.register(
            "drawRectangle",
            blueprint(
                "Draw Box 📦",
                "drawing",
                vec![
                    exec_in(),
                    data_in("x", "X spot", DataKind::Number, json!(50)),
                    data_in("y", "Y spot", DataKind::Number, json!(50)),
                    data_in("width", "Wide", DataKind::Number, json!(50)),
                    data_in("height", "Tall", DataKind::Number, json!(50)),
                ],
                vec![exec_out("out", "▶ Next")],
                props(&[("fill", json!(true))]),
            ),
        );
        reg.register(
            "clearCanvas",
            blueprint(
                "Erase All 🧹",
                "drawing",
                vec![exec_in()],
                vec![exec_out("out", "▶ Next")],
                no_props(),
            ),
        );
        reg.register(
            "drawText",
            blueprint(
                "Write Text ✏️",
                "drawing",
                vec![
                    exec_in(),
                    data_in("text", "Words", DataKind::String, json!("Hello!")),
                    data_in("x", "X Spot", DataKind::Number, json!(10)),
                    data_in("y", "Y Spot", DataKind::Number, json!(20)),
                    data_in("color", "Color", DataKind::Color, json!("#333333")),
                    data_in("font", "Font Style", DataKind::String, json!("16px Arial")),
                ],
                vec![exec_out("out", "▶ Next")],
                no_props(),
            ),
        );
        reg.register(
            "say",
            blueprint(
                "Say Bubble 💬",
                "drawing",
                vec![
                    exec_in(),
                    data_in("message", "Words to Say", DataKind::String, json!("Hi!")),
                    data_in("targetX", "Near X", DataKind::Number, json!(100)),
                    data_in("targetY", "Near Y", DataKind::Number, json!(100)),
                ],
                vec![exec_out("out", "▶ Next")],
                no_props(),
            ),
        );
        reg.register(
            "changeXBy",
            blueprint(
                "Change X by ➡️",
                "drawing",
                vec![
                    exec_in(),
                    data_in("variableName", "Which X Var?", DataKind::String, json!("objectX")),
                    data_in("amount", "By How Much?", DataKind::Number, json!(10)),
                ],
                vec![exec_out("out", "▶ Next")],
                no_props(),
            ),
        );
        reg.register(
            "setXTo",
            blueprint(
                "Set X to ➡️",
                "drawing",
                vec![
                    exec_in(),
                    data_in("variableName", "Which X Var?", DataKind::String, json!("objectX")),
                    data_in("value", "To What Spot?", DataKind::Number, json!(0)),
                ],
                vec![exec_out("out", "▶ Next")],
                no_props(),
            ),
        );
        reg.register(
            "changeYBy",
            blueprint(
                "Change Y by ⬆️",
                "drawing",
                vec![
                    exec_in(),
                    data_in("variableName", "Which Y Var?", DataKind::String, json!("objectY")),
                    data_in("amount", "By How Much?", DataKind::Number, json!(10)),
                ],
                vec![exec_out("out", "▶ Next")],
                no_props(),
            ),
        );
        reg.register(
            "setYTo",
            blueprint(
                "Set Y to ⬆️",
                "drawing",
                vec![
                    exec_in(),
                    data_in("variableName", "Which Y Var?", DataKind::String, json!("objectY")),
                    data_in("value", "To What Spot?", DataKind::Number, json!(0)),
                ],
                vec![exec_out("out", "▶ Next")],
                no_props(),
            ),
        );

        // --- Procedural & Sound ---
        reg.register(
            "function",
            blueprint(
                "Make a Recipe 📜",
                "procedural",
                vec![
                    exec_in(),
                    data_in("name", "Recipe Name", DataKind::String, json!("myCoolRecipe")),
                ],
                vec![exec_out("body", "Recipe Steps"), exec_out("out", "▶ Next")],
                no_props(),
            ),
        );
        reg.register(
            "callFunction",
            blueprint(
                "Use Recipe ✨",
                "procedural",
                vec![
                    exec_in(),
                    data_in("name", "Which Recipe?", DataKind::String, json!("myCoolRecipe")),
                ],
                vec![exec_out("out", "▶ Next")],
                no_props(),
            ),
        );
        reg.register(
            "playSound",
            blueprint(
                "Play Sound 🎶",
                "procedural",
                vec![
                    exec_in(),
                    data_in("soundName", "Sound Name", DataKind::String, json!("click")),
                ],
                vec![exec_out("out", "▶ Next")],
                no_props(),
            ),
        );

        // --- Variables ---
        reg.register(
            "setVariable",
            blueprint(
                "Save a Thing 💾",
                "variables",
                vec![
                    exec_in(),
                    data_in("name", "Thing Name", DataKind::String, json!("score")),
                    data_in("value", "Thing Value", DataKind::Expression, json!("0")),
                ],
                vec![exec_out("out", "▶ Next")],
                no_props(),
            ),
        );
        reg.register(
            "getVariable",
            blueprint(
                "Get Saved Thing 🔍",
                "variables",
                vec![data_in("name", "Thing Name", DataKind::String, json!("score"))],
                vec![data_out("value", "Get Value", DataKind::Any)],
                no_props(),
            ),
        );

        // --- Data Literals, Input & Operators ---
        reg.register(
            "number",
            blueprint(
                "Number Block 🔢",
                "data",
                vec![data_in("value", "Value", DataKind::Number, json!(10))],
                vec![data_out("value", "Number", DataKind::Number)],
                props(&[("value", json!(10))]),
            ),
        );
        reg.register(
            "string",
            blueprint(
                "Text Block 🔡",
                "data",
                vec![data_in("value", "Text", DataKind::String, json!("Hello!"))],
                vec![data_out("value", "Text Out", DataKind::String)],
                props(&[("value", json!("Hello!"))]),
            ),
        );
        reg.register(
            "randomNumber",
            blueprint(
                "Random Number 🎲",
                "data",
                vec![
                    data_in("min", "Min", DataKind::Number, json!(1)),
                    data_in("max", "Max", DataKind::Number, json!(100)),
                ],
                vec![data_out("value", "Random #", DataKind::Number)],
                props(&[("min", json!(1)), ("max", json!(100))]),
            ),
        );
        reg.register(
            "getMouseX",
            blueprint(
                "Mouse X Spot 🖱️↔️",
                "data",
                vec![],
                vec![data_out("x", "Mouse X", DataKind::Number)],
                no_props(),
            ),
        );
        reg.register(
            "add",
            binary_number_op("Add (+)", "Sum (+)", json!(0), json!(0)),
        );
        reg.register(
            "subtract",
            binary_number_op("Subtract (-)", "Difference (-)", json!(0), json!(0)),
        );
        reg.register(
            "multiply",
            binary_number_op("Multiply (*)", "Product (*)", json!(1), json!(1)),
        );
        reg.register(
            "divide",
            binary_number_op("Divide (/)", "Quotient (/)", json!(0), json!(1)),
        );
        reg.register(
            "lessThan",
            comparison_op("Less Than (<)", "Is A < B", json!(0), json!(50)),
        );
        reg.register(
            "equalTo",
            comparison_op("Equal To (=)", "Is A = B", json!(0), json!(0)),
        );
        reg.register(
            "greaterThan",
            comparison_op("Greater Than (>)", "Is A > B", json!(50), json!(0)),
        );
        reg.register(
            "and",
            blueprint(
                "And (&&)",
                "data",
                vec![
                    data_in("a", "Bool A", DataKind::Boolean, json!(true)),
                    data_in("b", "Bool B", DataKind::Boolean, json!(true)),
                ],
                vec![data_out("result", "A and B", DataKind::Boolean)],
                no_props(),
            ),
        );
        reg.register(
            "or",
            blueprint(
                "Or (||)",
                "data",
                vec![
                    data_in("a", "Bool A", DataKind::Boolean, json!(false)),
                    data_in("b", "Bool B", DataKind::Boolean, json!(false)),
                ],
                vec![data_out("result", "A or B", DataKind::Boolean)],
                no_props(),
            ),
        );
        reg.register(
            "not",
            blueprint(
                "Not (!)",
                "data",
                vec![data_in("a", "Boolean", DataKind::Boolean, json!(false))],
                vec![data_out("result", "Not A", DataKind::Boolean)],
                no_props(),
            ),
        );

        reg
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn blueprint(
    title: &str,
    category: &str,
    inputs: Vec<PortDecl>,
    outputs: Vec<PortDecl>,
    properties: Map<String, Value>,
) -> NodeBlueprint {
    NodeBlueprint {
        title: title.to_string(),
        category: category.to_string(),
        inputs,
        outputs,
        properties,
    }
}

fn exec_in() -> PortDecl {
    PortDecl {
        id: "in".to_string(),
        name: "Do This".to_string(),
        port_type: PortKind::Exec,
        data_type: DataKind::Exec,
        default: None,
    }
}

fn exec_out(id: &str, name: &str) -> PortDecl {
    PortDecl {
        id: id.to_string(),
        name: name.to_string(),
        port_type: PortKind::Exec,
        data_type: DataKind::Exec,
        default: None,
    }
}

fn data_in(id: &str, name: &str, data_type: DataKind, default: Value) -> PortDecl {
    PortDecl {
        id: id.to_string(),
        name: name.to_string(),
        port_type: PortKind::Data,
        data_type,
        default: Some(default),
    }
}

fn data_out(id: &str, name: &str, data_type: DataKind) -> PortDecl {
    PortDecl {
        id: id.to_string(),
        name: name.to_string(),
        port_type: PortKind::Data,
        data_type,
        default: None,
    }
}

fn no_props() -> Map<String, Value> {
    Map::new()
}

fn props(entries: &[(&str, Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn binary_number_op(title: &str, result_name: &str, a: Value, b: Value) -> NodeBlueprint {
    blueprint(
        title,
        "data",
        vec![
            data_in("a", "Num 1", DataKind::Number, a),
            data_in("b", "Num 2", DataKind::Number, b),
        ],
        vec![data_out("result", result_name, DataKind::Number)],
        no_props(),
    )
}

fn comparison_op(title: &str, result_name: &str, a: Value, b: Value) -> NodeBlueprint {
    blueprint(
        title,
        "data",
        vec![
            data_in("a", "Val A", DataKind::Any, a),
            data_in("b", "Val B", DataKind::Any, b),
        ],
        vec![data_out("result", result_name, DataKind::Boolean)],
        no_props(),
    )
}
