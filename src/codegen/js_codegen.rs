//! # JavaScript Code Generator
//!
//! Walks a [`NodeGraph`](crate::graph::NodeGraph) snapshot and emits a single
//! JavaScript program that drives a 2D canvas context plus a small runtime
//! surface (variable store, key-event registration, input-state query).
//!
//! Two interleaved traversals do the work: a depth-first walk along `exec`
//! connections that emits statements in execution order, and a recursive,
//! memoized resolution of `data` inputs into inline expressions. All per-run
//! state lives in a [`GenCtx`] threaded explicitly through the walk — the
//! generator itself holds only borrows of the graph, so it is trivially
//! re-entrant and never needs resetting between runs.
//!
//! Generation is total: structural gaps in the graph (missing sources,
//! dangling targets, re-entered nodes) degrade to commented placeholders so
//! the rest of the program stays runnable.

use std::collections::{HashMap, HashSet};

use serde_json::{json, Value};

use crate::graph::{Connection, Node, NodeGraph, NodeId};
use crate::registry::{DataKind, PortKind};

use super::writer::CodeWriter;

/// Parameter names the generated program expects, in the exact order the
/// host must supply them when constructing the callable, e.g.
/// `new Function('canvas', 'ctx', 'registerKeyPressAction',
/// 'isKeyCurrentlyPressed', 'globalAudioCtx', code)`.
pub const PROGRAM_BINDINGS: [&str; 5] = [
    "canvas",
    "ctx",
    "registerKeyPressAction",
    "isKeyCurrentlyPressed",
    "globalAudioCtx",
];

/// Generated `while` loops break out past this many iterations, since the
/// source graph cannot statically prove termination.
const WHILE_ITERATION_CEILING: u32 = 25_000;

const NO_ENTRY_PROGRAM: &str = "// No Start Flag, Game Loop, or Event nodes found. Add one to begin your program!\n// Nothing to run.";

/// Shared runtime scaffolding emitted ahead of any program logic: the
/// variable store, game-loop bookkeeping, sound helpers, and initial drawing
/// state.
const RUNTIME_PRELUDE: &str = r##""use strict";
let variables = {};
let animationFrameId_gameLoop = null;
let isGameLoopRunning = false;

// --- Audio Context & Sound Functions ---
let audioCtxOuter = null;
function ensureAudioContext() { if (!audioCtxOuter || audioCtxOuter.state === 'closed') { try { audioCtxOuter = new (window.AudioContext || window.webkitAudioContext)(); if (audioCtxOuter.state === 'suspended') { audioCtxOuter.resume().catch(e=>console.warn('Audio resume failed:',e));} } catch(e) { console.error('Web Audio API not supported or context creation failed.', e); audioCtxOuter = null; return null;} } return audioCtxOuter; }
const sounds = {
  'click': (audioCtx) => { if(!audioCtx) return; const o = audioCtx.createOscillator(); o.type = 'triangle'; o.frequency.setValueAtTime(800, audioCtx.currentTime); o.frequency.linearRampToValueAtTime(400, audioCtx.currentTime + 0.05); o.connect(audioCtx.destination); o.start(); o.stop(audioCtx.currentTime + 0.05); },
  'boop': (audioCtx) => { if(!audioCtx) return; const o = audioCtx.createOscillator(); o.type = 'sine'; o.frequency.setValueAtTime(440, audioCtx.currentTime); o.connect(audioCtx.destination); o.start(); o.stop(audioCtx.currentTime + 0.1); },
  'laser': (audioCtx) => { if(!audioCtx) return; const o = audioCtx.createOscillator(); const g = audioCtx.createGain(); o.type = 'sawtooth'; o.frequency.setValueAtTime(1200, audioCtx.currentTime); o.frequency.exponentialRampToValueAtTime(100, audioCtx.currentTime + 0.2); g.gain.setValueAtTime(0.3, audioCtx.currentTime); g.gain.exponentialRampToValueAtTime(0.001, audioCtx.currentTime + 0.2); o.connect(g); g.connect(audioCtx.destination); o.start(); o.stop(audioCtx.currentTime + 0.2); }
};
function playNodeSound(soundNameStr) { const audioCtx = ensureAudioContext(); if (!audioCtx) { return; } try { if(sounds[soundNameStr]) { sounds[soundNameStr](audioCtx); } else { console.warn('Sound not found: ' + soundNameStr); } } catch(e) { console.error('Error playing sound "'+soundNameStr+'":', e); } }

// --- Drawing Initializations ---
if (canvas && ctx) {
  ctx.font = '16px Arial';
  ctx.strokeStyle = '#000000'; ctx.fillStyle = '#000000'; ctx.lineWidth = 2; ctx.beginPath();
} else { console.warn("Canvas or Ctx not available during drawing state init."); }
"##;

/// Per-run traversal state. Built fresh at the top of every
/// [`CodeGenerator::generate_program`] call and threaded through the walk.
#[derive(Default)]
struct GenCtx {
    /// `(node, input port) -> resolved expression`. Shared across the whole
    /// run so fan-out consumers of one value receive identical text.
    memo: HashMap<(NodeId, String), String>,
    /// Function-defining nodes already emitted; a function is defined once
    /// no matter how many call sites or branches reference it.
    emitted_fns: HashSet<NodeId>,
    /// Set while hoisting one-time setup ahead of the game loop.
    tick_hoisting: bool,
}

/// Outcome of resolving one data source before final text rendering.
enum Resolved {
    /// Raw target-language expression, emitted verbatim.
    Expr(String),
    /// Plain value, quoted according to its JSON kind.
    Scalar(Value),
    /// Nothing to resolve; falls back to the type-appropriate zero.
    Absent,
}

/// Compiles one graph snapshot into JavaScript text.
pub struct CodeGenerator<'a> {
    graph: &'a NodeGraph,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(graph: &'a NodeGraph) -> Self {
        Self { graph }
    }

    /// Generate the complete program.
    ///
    /// Entry selection: the first `start` node, the first `gameLoop` node,
    /// and every `whenKeyPressed` node. Function definitions are hoisted
    /// ahead of all entry-point code. When no entry exists at all the result
    /// is a harmless placeholder program rather than an error.
    pub fn generate_program(&self) -> String {
        let mut ctx = GenCtx::default();

        let nodes = self.graph.nodes();
        let game_loop = nodes.iter().find(|n| n.node_type == "gameLoop");
        let start = nodes.iter().find(|n| n.node_type == "start");
        let hats: Vec<&Node> = nodes
            .iter()
            .filter(|n| n.node_type == "whenKeyPressed")
            .collect();

        if game_loop.is_none() && start.is_none() && hats.is_empty() {
            return NO_ENTRY_PROGRAM.to_string();
        }

        tracing::debug!(
            "entry selection: start={:?}, gameLoop={:?}, eventHats={}",
            start.map(|n| n.id),
            game_loop.map(|n| n.id),
            hats.len()
        );

        let mut w = CodeWriter::new();
        w.line("// Generated by the NodeCanvas graph compiler.");
        w.raw(RUNTIME_PRELUDE);

        for func in nodes.iter().filter(|n| n.node_type == "function") {
            self.emit_function_definition(func, &mut ctx, &mut w);
        }

        w.blank();
        w.line("// --- Event Handler Registrations & Main Program Logic ---");
        w.line("ensureAudioContext();");
        for hat in &hats {
            self.emit_event_registration(hat, &mut ctx, &mut w);
        }

        if let Some(driver) = game_loop {
            ctx.tick_hoisting = true;
            if let Some(start) = start {
                // Setup reachable from the start node runs once, ahead of
                // the first tick, not on every frame.
                let mut setup = CodeWriter::new();
                let mut visited = HashSet::new();
                self.emit_exec(start, &mut visited, &mut ctx, &mut setup);
                let setup = setup.finish();
                if !setup.trim().is_empty() && !setup.trim_start().starts_with("/*") {
                    w.blank();
                    w.line("// --- One-time Setup from Start Node ---");
                    w.raw(&setup);
                    w.line("// --- End of One-time Setup ---");
                }
            }
            self.emit_game_loop(driver, &mut ctx, &mut w);
        } else if let Some(start) = start {
            w.blank();
            let mut visited = HashSet::new();
            self.emit_exec(start, &mut visited, &mut ctx, &mut w);
        } else {
            w.blank();
            w.line("// console.log('NodeCanvas script setup complete. Awaiting events or game loop ticks.');");
        }

        w.finish()
    }

    /// Depth-first emission along exec connections.
    ///
    /// `visited` is the set of nodes on the *current linear path*. A node may
    /// be emitted once per sibling branch (each nested construct descends
    /// with a fresh set) but re-entry on the same path emits a benign marker
    /// and stops, which is what keeps exec cycles from recursing forever.
    fn emit_exec(
        &self,
        node: &Node,
        visited: &mut HashSet<NodeId>,
        ctx: &mut GenCtx,
        w: &mut CodeWriter,
    ) {
        if visited.contains(&node.id) {
            w.line(format!(
                "/* Loop detected: re-entry to node {} (ID {}) skipped in current path. */",
                node.node_type, node.id
            ));
            return;
        }
        if node.node_type == "start"
            && ctx.tick_hoisting
            && self.first_exec_connection(node.id, "out").is_none()
        {
            w.line(format!(
                "/* Start node (ID {}) without outgoing connections ignored during game loop generation. */",
                node.id
            ));
            return;
        }
        visited.insert(node.id);

        let inputs: HashMap<String, String> = node
            .inputs
            .iter()
            .filter(|p| p.port_type == PortKind::Data)
            .map(|p| (p.id.clone(), self.resolve_data_input(node, &p.id, ctx)))
            .collect();

        match node.node_type.as_str() {
            "start" => w.line(format!("// Start Node (ID {}) Execution Path", node.id)),
            "gameLoop" => w.line(format!(
                "// Game Loop Node (ID {}) - its tick logic is defined and started elsewhere.",
                node.id
            )),
            "whenKeyPressed" => w.line(format!(
                "// When Key Pressed Node (ID {}) - its actions are registered as event handlers.",
                node.id
            )),
            "moveTo" => {
                let x = resolved_or(&inputs, "x", "0");
                let y = resolved_or(&inputs, "y", "0");
                w.line(format!("if(ctx) {{ ctx.moveTo({x}, {y}); }}"));
            }
            "lineTo" => {
                let x = resolved_or(&inputs, "x", "0");
                let y = resolved_or(&inputs, "y", "0");
                w.line(format!(
                    "if(ctx) {{ ctx.lineTo({x}, {y}); ctx.stroke(); ctx.beginPath(); }}"
                ));
            }
            "setColor" => {
                let color = resolved_or(&inputs, "color", "\"#000000\"");
                w.line(format!(
                    "if(ctx) {{ ctx.strokeStyle = {color}; ctx.fillStyle = {color}; }}"
                ));
            }
            "setPenWidth" => {
                let width = resolved_or(&inputs, "width", "1");
                w.line(format!("if(ctx) {{ ctx.lineWidth = {width}; }}"));
            }
            "drawCircle" => {
                let x = resolved_or(&inputs, "x", "0");
                let y = resolved_or(&inputs, "y", "0");
                let radius = resolved_or(&inputs, "radius", "10");
                let fill = if wants_fill(node) { " ctx.fill();" } else { "" };
                w.line(format!(
                    "if(ctx) {{ ctx.beginPath(); ctx.arc({x}, {y}, Math.max(0, {radius}), 0, Math.PI * 2); ctx.stroke();{fill} ctx.beginPath(); }}"
                ));
            }
            "drawRectangle" => {
                let x = resolved_or(&inputs, "x", "0");
                let y = resolved_or(&inputs, "y", "0");
                let width = resolved_or(&inputs, "width", "10");
                let height = resolved_or(&inputs, "height", "10");
                let fill = if wants_fill(node) { " ctx.fill();" } else { "" };
                w.line(format!(
                    "if(ctx) {{ ctx.beginPath(); ctx.rect({x}, {y}, Math.max(0, {width}), Math.max(0, {height})); ctx.stroke();{fill} ctx.beginPath(); }}"
                ));
            }
            "clearCanvas" => w.line(
                "if(ctx && canvas) { ctx.clearRect(0, 0, canvas.width, canvas.height); ctx.beginPath(); }",
            ),
            "drawText" => {
                let text = resolved_or(&inputs, "text", "''");
                let x = resolved_or(&inputs, "x", "0");
                let y = resolved_or(&inputs, "y", "20");
                let color = resolved_or(&inputs, "color", "'#000000'");
                let font = resolved_or(&inputs, "font", "'16px Arial'");
                w.line("if(ctx) { const prevFontDT_ = ctx.font; const prevFillDT_ = ctx.fillStyle; const prevAlignDT_ = ctx.textAlign; const prevBaselineDT_ = ctx.textBaseline;");
                w.indent();
                w.line(format!(
                    "ctx.font = {font}; ctx.fillStyle = {color}; ctx.textAlign = 'left'; ctx.textBaseline = 'top';"
                ));
                w.line(format!("ctx.fillText({text}, {x}, {y});"));
                w.line("ctx.font = prevFontDT_; ctx.fillStyle = prevFillDT_; ctx.textAlign = prevAlignDT_; ctx.textBaseline = prevBaselineDT_; }");
                w.dedent();
            }
            "say" => {
                let message = resolved_or(&inputs, "message", "''");
                let target_x = resolved_or(&inputs, "targetX", "0");
                let target_y = resolved_or(&inputs, "targetY", "0");
                w.line("if(ctx) { const prevFontS_ = ctx.font; const prevFillS_ = ctx.fillStyle; const prevAlignS_ = ctx.textAlign; const prevBaselineS_ = ctx.textBaseline;");
                w.indent();
                w.line("ctx.font = 'bold 14px Nunito, sans-serif'; ctx.fillStyle = '#555555'; ctx.textAlign = 'center'; ctx.textBaseline = 'bottom';");
                w.line(format!(
                    "ctx.fillText({message}, {target_x}, Number({target_y}) - 5);"
                ));
                w.line("ctx.font = prevFontS_; ctx.fillStyle = prevFillS_; ctx.textAlign = prevAlignS_; ctx.textBaseline = prevBaselineS_; }");
                w.dedent();
            }
            "changeXBy" => {
                let name = resolved_or(&inputs, "variableName", "\"\"");
                let amount = resolved_or(&inputs, "amount", "0");
                w.line(variable_nudge(name, amount, "changeXBy"));
            }
            "changeYBy" => {
                let name = resolved_or(&inputs, "variableName", "\"\"");
                let amount = resolved_or(&inputs, "amount", "0");
                w.line(variable_nudge(name, amount, "changeYBy"));
            }
            "setXTo" | "setYTo" => {
                let name = resolved_or(&inputs, "variableName", "\"\"");
                let value = resolved_or(&inputs, "value", "0");
                w.line(format!("variables[{name}] = ({value});"));
            }
            "repeat" => {
                let count = resolved_or(&inputs, "count", "0");
                w.line(format!("for (let i = 0; i < ({count}); i++) {{"));
                w.indent();
                let mut body_visited = HashSet::new();
                self.emit_connected_exec(node.id, "body", &mut body_visited, ctx, w);
                w.dedent();
                w.line("}");
            }
            "if" => {
                let condition = resolved_or(&inputs, "condition", "false");
                // Both arms are always emitted; literal conditions are not
                // folded at generation time.
                w.line(format!("if ({condition}) {{"));
                w.indent();
                let mut then_visited = HashSet::new();
                self.emit_connected_exec(node.id, "then", &mut then_visited, ctx, w);
                w.dedent();
                w.line("} else {");
                w.indent();
                let mut else_visited = HashSet::new();
                self.emit_connected_exec(node.id, "else", &mut else_visited, ctx, w);
                w.dedent();
                w.line("}");
            }
            "while" => {
                let condition = resolved_or(&inputs, "condition", "false");
                w.line(format!("let whileGuard_{} = 0;", node.id));
                w.line(format!("while ({condition}) {{"));
                w.indent();
                w.line(format!(
                    "if (whileGuard_{}++ > {WHILE_ITERATION_CEILING}) {{ console.warn(\"While loop (ID {}) iteration limit exceeded (25k).\"); break; }}",
                    node.id, node.id
                ));
                let mut body_visited = HashSet::new();
                self.emit_connected_exec(node.id, "body", &mut body_visited, ctx, w);
                w.dedent();
                w.line("}");
            }
            "setVariable" => {
                let name = resolved_or(&inputs, "name", "\"\"");
                let value = resolved_or(&inputs, "value", "undefined");
                w.line(format!("variables[{name}] = {value};"));
            }
            "callFunction" => {
                let name = strip_quotes(resolved_or(&inputs, "name", "\"\"")).to_string();
                w.line(format!(
                    "if(typeof {name} === 'function') {{ {name}(); }} else {{ console.warn('Attempted to call undefined/undeclared function: {name}'); }}"
                ));
            }
            "playSound" => {
                let sound = strip_quotes(resolved_or(&inputs, "soundName", "\"\"")).to_string();
                w.line(format!("playNodeSound('{sound}');"));
            }
            "function" => w.line(format!(
                "// Function definition node (ID {}) hoisted above; main flow continues.",
                node.id
            )),
            other => w.line(format!(
                "// Node type {other} (ID {}) has no specific exec code generation logic.",
                node.id
            )),
        }

        // Fall-through continuation is a true continuation of the same path,
        // so it reuses the caller's visited set. Driver and hat nodes have no
        // sequential continuation.
        if node.node_type != "gameLoop" && node.node_type != "whenKeyPressed" {
            self.emit_connected_exec(node.id, "out", visited, ctx, w);
        }
    }

    /// Follow the first exec connection leaving `from_port` and emit its
    /// target. A dangling target degrades to a commented placeholder.
    fn emit_connected_exec(
        &self,
        from_node: NodeId,
        from_port: &str,
        visited: &mut HashSet<NodeId>,
        ctx: &mut GenCtx,
        w: &mut CodeWriter,
    ) {
        let Some(conn) = self.first_exec_connection(from_node, from_port) else {
            return;
        };
        match self.graph.node(conn.to_node) {
            Some(next) => self.emit_exec(next, visited, ctx, w),
            None => w.line(format!(
                "/* Error: Next node (ID {}) in exec path from {from_node}.{from_port} not found. */",
                conn.to_node
            )),
        }
    }

    fn first_exec_connection(&self, from_node: NodeId, from_port: &str) -> Option<&Connection> {
        self.graph.connections().iter().find(|c| {
            c.from_node == from_node
                && c.from_port == from_port
                && c.from_port_type == PortKind::Exec
        })
    }

    /// Hoist one function definition. Emitted at most once per node, with a
    /// fresh visited set — entering the body is not a re-entry of the outer
    /// path.
    fn emit_function_definition(&self, func: &Node, ctx: &mut GenCtx, w: &mut CodeWriter) {
        if !ctx.emitted_fns.insert(func.id) {
            return;
        }

        let resolved = self.resolve_data_input(func, "name", ctx);
        let name = strip_quotes(&resolved).to_string();
        if !is_valid_identifier(&name) {
            w.line(format!(
                "/* Invalid function name: {resolved} (Node ID {}). Skipping definition. */",
                func.id
            ));
            return;
        }

        tracing::debug!("hoisting function definition '{name}' (node {})", func.id);
        w.blank();
        w.line(format!("function {name}() {{"));
        w.indent();
        let mut visited = HashSet::new();
        self.emit_connected_exec(func.id, "body", &mut visited, ctx, w);
        w.dedent();
        w.line("}");
    }

    /// Lower one event-hat node to a named handler function plus its
    /// registration against the host's key-press hook.
    fn emit_event_registration(&self, hat: &Node, ctx: &mut GenCtx, w: &mut CodeWriter) {
        // The key name resolves against a scratch cache so handler-local
        // lookups neither pollute nor reuse the main run's memo table.
        let saved_memo = std::mem::take(&mut ctx.memo);
        let key_expr = self.resolve_data_input(hat, "key", ctx);
        ctx.memo = saved_memo;
        let key = strip_quotes(&key_expr).to_lowercase();

        let mut body = CodeWriter::new();
        body.indent();
        body.indent();
        let mut visited = HashSet::new();
        self.emit_connected_exec(hat.id, "out", &mut visited, ctx, &mut body);
        let action = body.finish();

        if action.trim().is_empty() || action.trim_start().starts_with("/*") {
            w.line(format!(
                "/* 'When Key Pressed' for \"{key}\" (ID {}) has no actions connected or actions were skipped. */",
                hat.id
            ));
            return;
        }

        let sanitized: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        let handler = format!("handleKeyPress_node{}_{sanitized}", hat.id);

        w.line(format!("function {handler}() {{"));
        w.raw(&action);
        w.line("}");
        w.line(format!(
            "if (typeof registerKeyPressAction === 'function') {{ registerKeyPressAction({}, {handler}); }}",
            js_string(&key)
        ));
        w.line(format!(
            "else {{ console.warn(\"'registerKeyPressAction' not available. Cannot register key event for node ID {}.\"); }}",
            hat.id
        ));
    }

    /// Lower the tick driver to a perpetually rescheduling callback guarded
    /// by a running flag, with start/stop entry points and an auto-start.
    fn emit_game_loop(&self, driver: &Node, ctx: &mut GenCtx, w: &mut CodeWriter) {
        let mut body = CodeWriter::new();
        body.indent();
        let mut visited = HashSet::new();
        self.emit_connected_exec(driver.id, "tick", &mut visited, ctx, &mut body);
        let tick_body = body.finish();

        w.blank();
        w.line("function gameLoopTick_generated(timestamp) {");
        w.indent();
        w.line("if (!isGameLoopRunning) { if(animationFrameId_gameLoop) { cancelAnimationFrame(animationFrameId_gameLoop); } return; }");
        w.dedent();
        w.raw(&tick_body);
        w.indent();
        w.line("animationFrameId_gameLoop = requestAnimationFrame(gameLoopTick_generated);");
        w.dedent();
        w.line("}");
        w.blank();
        w.line("function startGameLoop_generated() {");
        w.indent();
        w.line("if (animationFrameId_gameLoop) { cancelAnimationFrame(animationFrameId_gameLoop); }");
        w.line("isGameLoopRunning = true;");
        w.line("animationFrameId_gameLoop = requestAnimationFrame(gameLoopTick_generated);");
        w.line("console.log(\"NodeCanvas Game Loop Started\");");
        w.dedent();
        w.line("}");
        w.blank();
        w.line("function stopGameLoop_generated() {");
        w.indent();
        w.line("isGameLoopRunning = false;");
        w.line("if (animationFrameId_gameLoop) { cancelAnimationFrame(animationFrameId_gameLoop); animationFrameId_gameLoop = null; }");
        w.line("console.log(\"NodeCanvas Game Loop Stopped\");");
        w.dedent();
        w.line("}");
        w.blank();
        w.line("if (typeof startGameLoop_generated === 'function') { startGameLoop_generated(); }");
    }

    /// Resolve one data input to an inline expression, memoized per run.
    ///
    /// The memo entry is pre-seeded with a placeholder before descending, so
    /// circular data dependencies short-circuit to the placeholder instead
    /// of recursing without bound.
    fn resolve_data_input(&self, target: &Node, input_id: &str, ctx: &mut GenCtx) -> String {
        let key = (target.id, input_id.to_string());
        if let Some(hit) = ctx.memo.get(&key) {
            return hit.clone();
        }
        ctx.memo.insert(
            key.clone(),
            format!(
                "undefined /* Error: Circular data dependency at {}.{input_id} */",
                target.id
            ),
        );
        let text = self.resolve_data_input_uncached(target, input_id, ctx);
        ctx.memo.insert(key, text.clone());
        text
    }

    fn resolve_data_input_uncached(
        &self,
        target: &Node,
        input_id: &str,
        ctx: &mut GenCtx,
    ) -> String {
        let mut resolved = None;

        if let Some(conn) = self.graph.connection_to_input(target.id, input_id) {
            let Some(source) = self.graph.node(conn.from_node) else {
                return "undefined /* Error: Source node missing */".to_string();
            };
            resolved = self.resolve_source(source, ctx);
        }

        let resolved = match resolved {
            Some(resolved) => resolved,
            // No incoming connection, or a source type resolution knows
            // nothing about: fall back to the port's declared default.
            None => {
                let Some(decl) = target.inputs.iter().find(|p| p.id == input_id) else {
                    return format!(
                        "undefined /* Error: Input {input_id} on {} missing */",
                        target.node_type
                    );
                };
                match &decl.default {
                    None | Some(Value::Null) => Resolved::Absent,
                    Some(value) if decl.data_type == DataKind::Expression => {
                        Resolved::Expr(raw_text(value))
                    }
                    Some(Value::String(text))
                        if matches!(decl.data_type, DataKind::Number | DataKind::Boolean)
                            && looks_like_expression(text) =>
                    {
                        Resolved::Expr(text.clone())
                    }
                    Some(value) => Resolved::Scalar(value.clone()),
                }
            }
        };

        match resolved {
            Resolved::Expr(text) => text,
            Resolved::Scalar(Value::Null) | Resolved::Absent => {
                let data_type = target
                    .inputs
                    .iter()
                    .find(|p| p.id == input_id)
                    .map(|p| p.data_type);
                type_zero(data_type)
            }
            Resolved::Scalar(value @ Value::String(_)) => value.to_string(),
            Resolved::Scalar(Value::Number(n)) => n.to_string(),
            Resolved::Scalar(Value::Bool(b)) => b.to_string(),
            // Arrays/objects have no literal form here; stringify then quote.
            Resolved::Scalar(other) => Value::String(other.to_string()).to_string(),
        }
    }

    /// Dispatch on the *source* node's type to build its output expression.
    /// Returns `None` for source types resolution knows nothing about.
    fn resolve_source(&self, source: &Node, ctx: &mut GenCtx) -> Option<Resolved> {
        let resolved = match source.node_type.as_str() {
            "getVariable" => {
                let name = self.resolve_data_input(source, "name", ctx);
                Resolved::Expr(format!("variables[{name}]"))
            }
            "number" => {
                Resolved::Scalar(source.properties.get("value").cloned().unwrap_or(json!(0)))
            }
            "string" => {
                Resolved::Scalar(source.properties.get("value").cloned().unwrap_or(json!("")))
            }
            "randomNumber" => {
                let min = self.resolve_data_input(source, "min", ctx);
                let max = self.resolve_data_input(source, "max", ctx);
                Resolved::Expr(format!(
                    "(Math.floor(Math.random() * ((Number({max})) - (Number({min})) + 1)) + (Number({min})))"
                ))
            }
            "getMouseX" => Resolved::Expr(
                "(typeof window.nodeCanvasRuntime_mouseX !== 'undefined' ? window.nodeCanvasRuntime_mouseX : (canvas ? canvas.width/2 : 200))"
                    .to_string(),
            ),
            "add" => self.binary_expr(source, "+", ctx),
            "subtract" => self.binary_expr(source, "-", ctx),
            "multiply" => self.binary_expr(source, "*", ctx),
            "divide" => {
                let a = self.resolve_data_input(source, "a", ctx);
                let b = self.resolve_data_input(source, "b", ctx);
                // Divisor guarded against zero.
                Resolved::Expr(format!("(({a}) / (({b}) || 1))"))
            }
            "lessThan" => self.binary_expr(source, "<", ctx),
            "equalTo" => self.binary_expr(source, "===", ctx),
            "greaterThan" => self.binary_expr(source, ">", ctx),
            "and" => self.binary_expr(source, "&&", ctx),
            "or" => self.binary_expr(source, "||", ctx),
            "not" => {
                let a = self.resolve_data_input(source, "a", ctx);
                Resolved::Expr(format!("(!({a}))"))
            }
            _ => return None,
        };
        Some(resolved)
    }

    /// Operators are inlined, never extracted to temporaries; nested operator
    /// graphs produce nested parenthesized text.
    fn binary_expr(&self, source: &Node, op: &str, ctx: &mut GenCtx) -> Resolved {
        let a = self.resolve_data_input(source, "a", ctx);
        let b = self.resolve_data_input(source, "b", ctx);
        Resolved::Expr(format!("(({a}) {op} ({b}))"))
    }
}

fn resolved_or<'m>(inputs: &'m HashMap<String, String>, id: &str, fallback: &'m str) -> &'m str {
    inputs.get(id).map(String::as_str).unwrap_or(fallback)
}

fn wants_fill(node: &Node) -> bool {
    node.properties
        .get("fill")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn variable_nudge(name: &str, amount: &str, op: &str) -> String {
    format!(
        "if (typeof variables[{name}] === 'number') {{ variables[{name}] += ({amount}); }} else if (variables[{name}] === undefined) {{ variables[{name}] = ({amount}); }} else {{ console.warn('Variable ' + {name} + ' not a number for {op}.'); }}"
    )
}

fn type_zero(data_type: Option<DataKind>) -> String {
    match data_type {
        Some(DataKind::Number) => "0",
        Some(DataKind::String) | Some(DataKind::Color) => "\"\"",
        Some(DataKind::Boolean) => "false",
        _ => "undefined",
    }
    .to_string()
}

/// Render an expression-typed default verbatim: string values are already
/// target-language text, anything else falls back to its JSON rendering.
fn raw_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn js_string(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

/// Strip one pair of surrounding double quotes, if present.
fn strip_quotes(text: &str) -> &str {
    let text = text.strip_prefix('"').unwrap_or(text);
    text.strip_suffix('"').unwrap_or(text)
}

fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Heuristic reclassification of a string default declared `number`/`boolean`
/// as raw expression text.
///
/// Triggers: references into the runtime surface (`variables.`, `Math.`,
/// `canvas.`, `window.`), any arithmetic/comparison/logic operator character,
/// or an identifier-followed-by-call shape. Deliberately loose — a default
/// like `"1-2-2024"` is treated as an expression. Saved graphs depend on
/// these exact triggers, so they stay as-is.
fn looks_like_expression(text: &str) -> bool {
    if text.contains("variables.")
        || text.contains("Math.")
        || text.contains("canvas.")
        || text.contains("window.")
    {
        return true;
    }
    if text
        .chars()
        .any(|c| matches!(c, '+' | '-' | '*' | '/' | '%' | '&' | '|' | '<' | '>' | '=' | '!'))
    {
        return true;
    }
    has_call_shape(text)
}

/// Matches `ident ( ... )` anywhere in the text.
fn has_call_shape(text: &str) -> bool {
    for (i, c) in text.char_indices() {
        if !(c.is_ascii_alphabetic() || c == '_') {
            continue;
        }
        let rest = &text[i..];
        let ident_end = rest
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
            .map(|(j, _)| j)
            .unwrap_or(rest.len());
        let after = rest[ident_end..].trim_start();
        if let Some(tail) = after.strip_prefix('(') {
            if tail.contains(')') {
                return true;
            }
        }
    }
    false
}
