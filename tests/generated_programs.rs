//! Integration tests: graph → generated JavaScript.
//!
//! Each test builds a small graph through the IR (or loads one, for shapes
//! the editing API refuses to construct) and checks the emitted program
//! text line by line.

use ncgc::{compile_graph, NodeGraph, NodeRegistry, PROGRAM_BINDINGS};
use pretty_assertions::assert_eq;
use serde_json::json;

fn init_logs() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn setup() -> (NodeGraph, NodeRegistry) {
    init_logs();
    (NodeGraph::new(), NodeRegistry::builtin())
}

fn node_record(id: u64, node_type: &str) -> serde_json::Value {
    json!({ "id": id, "type": node_type, "x": 0, "y": 0 })
}

fn exec_conn(id: &str, from: u64, from_port: &str, to: u64, to_port: &str) -> serde_json::Value {
    json!({
        "id": id,
        "fromNode": from, "fromPort": from_port, "fromPortType": "exec", "fromDataType": "exec",
        "toNode": to, "toPort": to_port, "toPortType": "exec", "toDataType": "exec",
    })
}

/// Index of the first line containing `needle`, with a readable panic.
fn line_index(code: &str, needle: &str) -> usize {
    code.lines()
        .position(|l| l.contains(needle))
        .unwrap_or_else(|| panic!("line containing {needle:?} not found in:\n{code}"))
}

// ─── Entry selection ─────────────────────────────────────────────────────

#[test]
fn empty_graph_yields_noop_program() {
    let (graph, _registry) = setup();
    assert_eq!(
        compile_graph(&graph),
        "// No Start Flag, Game Loop, or Event nodes found. Add one to begin your program!\n// Nothing to run."
    );
}

#[test]
fn graph_without_entry_nodes_yields_noop_program() {
    let (mut graph, registry) = setup();
    graph.create_node(&registry, "number", 0.0, 0.0).unwrap();
    graph.create_node(&registry, "moveTo", 0.0, 0.0).unwrap();
    let code = compile_graph(&graph);
    assert!(code.starts_with("// No Start Flag"));
}

#[test]
fn straight_line_program_emits_in_execution_order() {
    let (mut graph, registry) = setup();
    let start = graph.create_node(&registry, "start", 0.0, 0.0).unwrap().id;
    let move_to = graph.create_node(&registry, "moveTo", 0.0, 0.0).unwrap().id;
    let line_to = graph.create_node(&registry, "lineTo", 0.0, 0.0).unwrap().id;
    graph.create_connection(start, "out", move_to, "in").unwrap();
    graph.create_connection(move_to, "out", line_to, "in").unwrap();

    let code = compile_graph(&graph);
    assert!(code.contains("\"use strict\";"));
    assert!(code.contains("let variables = {};"));
    let start_marker = line_index(&code, "// Start Node (ID 1) Execution Path");
    let move_stmt = line_index(&code, "if(ctx) { ctx.moveTo(50, 50); }");
    let line_stmt = line_index(
        &code,
        "if(ctx) { ctx.lineTo(150, 150); ctx.stroke(); ctx.beginPath(); }",
    );
    assert!(start_marker < move_stmt && move_stmt < line_stmt);
}

// ─── Control constructs ──────────────────────────────────────────────────

#[test]
fn repeat_lowers_to_counted_loop_wrapping_body() {
    let (mut graph, registry) = setup();
    let start = graph.create_node(&registry, "start", 0.0, 0.0).unwrap().id;
    let repeat = graph.create_node(&registry, "repeat", 0.0, 0.0).unwrap().id;
    let circle = graph.create_node(&registry, "drawCircle", 0.0, 0.0).unwrap().id;
    let line_to = graph.create_node(&registry, "lineTo", 0.0, 0.0).unwrap().id;
    graph.set_input_default(repeat, "count", json!(5)).unwrap();
    graph.create_connection(start, "out", repeat, "in").unwrap();
    graph.create_connection(repeat, "body", circle, "in").unwrap();
    graph.create_connection(repeat, "out", line_to, "in").unwrap();

    let code = compile_graph(&graph);
    let lines: Vec<&str> = code.lines().collect();
    let head = lines
        .iter()
        .position(|l| *l == "for (let i = 0; i < (5); i++) {")
        .expect("counted loop header");
    // Loop body is exactly the chain reachable from the `body` port.
    assert_eq!(
        lines[head + 1],
        "  if(ctx) { ctx.beginPath(); ctx.arc(100, 100, Math.max(0, 25), 0, Math.PI * 2); ctx.stroke(); ctx.fill(); ctx.beginPath(); }"
    );
    assert_eq!(lines[head + 2], "}");
    // Fall-through continuation follows the closed loop.
    assert!(lines[head + 3].contains("ctx.lineTo(150, 150)"));
}

#[test]
fn if_emits_both_arms_even_for_literal_condition() {
    let (mut graph, registry) = setup();
    let start = graph.create_node(&registry, "start", 0.0, 0.0).unwrap().id;
    let branch = graph.create_node(&registry, "if", 0.0, 0.0).unwrap().id;
    let move_to = graph.create_node(&registry, "moveTo", 0.0, 0.0).unwrap().id;
    let line_to = graph.create_node(&registry, "lineTo", 0.0, 0.0).unwrap().id;
    graph.create_connection(start, "out", branch, "in").unwrap();
    graph.create_connection(branch, "then", move_to, "in").unwrap();
    graph.create_connection(branch, "else", line_to, "in").unwrap();

    let code = compile_graph(&graph);
    // Condition default is the literal `true`, but no folding happens.
    let head = line_index(&code, "if (true) {");
    let then_stmt = line_index(&code, "ctx.moveTo(50, 50)");
    let else_head = line_index(&code, "} else {");
    let else_stmt = line_index(&code, "ctx.lineTo(150, 150)");
    assert!(head < then_stmt && then_stmt < else_head && else_head < else_stmt);
}

#[test]
fn shared_node_is_emitted_in_both_sibling_branches() {
    init_logs();
    let registry = NodeRegistry::builtin();
    // Both arms of the branch target the same node — a shape only loaded
    // graphs can carry, since interactive edits supersede the older edge.
    let data = json!({
        "nodes": [
            node_record(1, "start"),
            node_record(2, "if"),
            node_record(3, "drawCircle"),
        ],
        "connections": [
            exec_conn("c1", 1, "out", 2, "in"),
            exec_conn("c2", 2, "then", 3, "in"),
            exec_conn("c3", 2, "else", 3, "in"),
        ],
        "nextNodeId": 4,
    });
    let graph = NodeGraph::from_json(data, &registry);
    let code = compile_graph(&graph);
    assert_eq!(
        code.matches("ctx.arc(100, 100").count(),
        2,
        "each sibling branch must emit the shared node"
    );
}

#[test]
fn exec_cycle_emits_guard_marker_and_terminates() {
    init_logs();
    let registry = NodeRegistry::builtin();
    let data = json!({
        "nodes": [
            node_record(1, "start"),
            node_record(2, "moveTo"),
            node_record(3, "lineTo"),
        ],
        "connections": [
            exec_conn("c1", 1, "out", 2, "in"),
            exec_conn("c2", 2, "out", 3, "in"),
            exec_conn("c3", 3, "out", 2, "in"),
        ],
        "nextNodeId": 4,
    });
    let graph = NodeGraph::from_json(data, &registry);
    let code = compile_graph(&graph);
    assert!(code.contains(
        "/* Loop detected: re-entry to node moveTo (ID 2) skipped in current path. */"
    ));
    assert_eq!(code.matches("ctx.moveTo(50, 50)").count(), 1);
}

#[test]
fn while_carries_iteration_ceiling() {
    let (mut graph, registry) = setup();
    let start = graph.create_node(&registry, "start", 0.0, 0.0).unwrap().id;
    let guard = graph.create_node(&registry, "while", 0.0, 0.0).unwrap().id;
    let move_to = graph.create_node(&registry, "moveTo", 0.0, 0.0).unwrap().id;
    graph.set_input_default(guard, "condition", json!(true)).unwrap();
    graph.create_connection(start, "out", guard, "in").unwrap();
    graph.create_connection(guard, "body", move_to, "in").unwrap();

    let code = compile_graph(&graph);
    assert!(code.contains(&format!("let whileGuard_{guard} = 0;")));
    assert!(code.contains("while (true) {"));
    assert!(code.contains(&format!(
        "if (whileGuard_{guard}++ > 25000) {{ console.warn(\"While loop (ID {guard}) iteration limit exceeded (25k).\"); break; }}"
    )));
}

// ─── Data resolution ─────────────────────────────────────────────────────

#[test]
fn unconnected_inputs_fall_back_to_declared_defaults() {
    let (mut graph, registry) = setup();
    let start = graph.create_node(&registry, "start", 0.0, 0.0).unwrap().id;
    let move_to = graph.create_node(&registry, "moveTo", 0.0, 0.0).unwrap().id;
    let text = graph.create_node(&registry, "drawText", 0.0, 0.0).unwrap().id;
    let set_var = graph.create_node(&registry, "setVariable", 0.0, 0.0).unwrap().id;
    graph.set_input_default(move_to, "x", json!(10)).unwrap();
    graph.set_input_default(text, "text", json!("hi")).unwrap();
    graph.set_input_default(set_var, "value", json!("a+1")).unwrap();
    graph.create_connection(start, "out", move_to, "in").unwrap();
    graph.create_connection(move_to, "out", text, "in").unwrap();
    graph.create_connection(text, "out", set_var, "in").unwrap();

    let code = compile_graph(&graph);
    // number default 10 -> numeric literal.
    assert!(code.contains("ctx.moveTo(10, 50);"));
    // string default "hi" -> quoted.
    assert!(code.contains("ctx.fillText(\"hi\", 10, 20);"));
    // expression default a+1 -> raw, unquoted.
    assert!(code.contains("variables[\"score\"] = a+1;"));
}

#[test]
fn expression_looking_number_default_is_emitted_raw() {
    let (mut graph, registry) = setup();
    let start = graph.create_node(&registry, "start", 0.0, 0.0).unwrap().id;
    let move_to = graph.create_node(&registry, "moveTo", 0.0, 0.0).unwrap().id;
    graph
        .set_input_default(move_to, "x", json!("variables.x + 1"))
        .unwrap();
    graph.set_input_default(move_to, "y", json!(null)).unwrap();
    graph.create_connection(start, "out", move_to, "in").unwrap();

    let code = compile_graph(&graph);
    // The heuristic keeps power-user text unquoted; an absent default falls
    // back to the numeric zero.
    assert!(code.contains("ctx.moveTo(variables.x + 1, 0);"));
}

#[test]
fn literal_and_operator_sources_resolve_inline() {
    let (mut graph, registry) = setup();
    let start = graph.create_node(&registry, "start", 0.0, 0.0).unwrap().id;
    let move_to = graph.create_node(&registry, "moveTo", 0.0, 0.0).unwrap().id;
    let num = graph.create_node(&registry, "number", 0.0, 0.0).unwrap().id;
    let add = graph.create_node(&registry, "add", 0.0, 0.0).unwrap().id;
    graph.set_property(num, "value", json!(5)).unwrap();
    graph.create_connection(num, "value", add, "a").unwrap();
    graph.create_connection(num, "value", add, "b").unwrap();
    graph.create_connection(add, "result", move_to, "x").unwrap();
    graph.create_connection(start, "out", move_to, "in").unwrap();

    let code = compile_graph(&graph);
    // Diamond: one literal feeds both operands; operators inline, fully
    // parenthesized, never extracted to temporaries.
    assert!(code.contains("ctx.moveTo(((5) + (5)), 50);"));
}

#[test]
fn divide_guards_divisor_against_zero() {
    let (mut graph, registry) = setup();
    let start = graph.create_node(&registry, "start", 0.0, 0.0).unwrap().id;
    let move_to = graph.create_node(&registry, "moveTo", 0.0, 0.0).unwrap().id;
    let div = graph.create_node(&registry, "divide", 0.0, 0.0).unwrap().id;
    graph.create_connection(div, "result", move_to, "x").unwrap();
    graph.create_connection(start, "out", move_to, "in").unwrap();

    let code = compile_graph(&graph);
    assert!(code.contains("ctx.moveTo(((0) / ((1) || 1)), 50);"));
}

#[test]
fn variable_and_mouse_sources_resolve_to_runtime_reads() {
    let (mut graph, registry) = setup();
    let start = graph.create_node(&registry, "start", 0.0, 0.0).unwrap().id;
    let branch = graph.create_node(&registry, "if", 0.0, 0.0).unwrap().id;
    let get = graph.create_node(&registry, "getVariable", 0.0, 0.0).unwrap().id;
    let mouse = graph.create_node(&registry, "getMouseX", 0.0, 0.0).unwrap().id;
    let less = graph.create_node(&registry, "lessThan", 0.0, 0.0).unwrap().id;
    graph.create_connection(get, "value", less, "a").unwrap();
    graph.create_connection(mouse, "x", less, "b").unwrap();
    graph.create_connection(less, "result", branch, "condition").unwrap();
    graph.create_connection(start, "out", branch, "in").unwrap();

    let code = compile_graph(&graph);
    // Named-variable reads index into the store; the pointer source reads
    // the published cursor global with a canvas-midpoint fallback.
    assert!(code.contains("(variables[\"score\"]) < ("));
    assert!(code.contains(
        "typeof window.nodeCanvasRuntime_mouseX !== 'undefined' ? window.nodeCanvasRuntime_mouseX : (canvas ? canvas.width/2 : 200)"
    ));
}

#[test]
fn random_number_lowers_to_floored_random_expression() {
    let (mut graph, registry) = setup();
    let start = graph.create_node(&registry, "start", 0.0, 0.0).unwrap().id;
    let move_to = graph.create_node(&registry, "moveTo", 0.0, 0.0).unwrap().id;
    let random = graph.create_node(&registry, "randomNumber", 0.0, 0.0).unwrap().id;
    graph.create_connection(random, "value", move_to, "x").unwrap();
    graph.create_connection(start, "out", move_to, "in").unwrap();

    let code = compile_graph(&graph);
    assert!(code.contains(
        "ctx.moveTo((Math.floor(Math.random() * ((Number(100)) - (Number(1)) + 1)) + (Number(1))), 50);"
    ));
}

#[test]
fn memoization_keeps_fanout_consumers_identical_and_runs_deterministic() {
    let (mut graph, registry) = setup();
    let start = graph.create_node(&registry, "start", 0.0, 0.0).unwrap().id;
    let move_to = graph.create_node(&registry, "moveTo", 0.0, 0.0).unwrap().id;
    let num = graph.create_node(&registry, "number", 0.0, 0.0).unwrap().id;
    graph.set_property(num, "value", json!(7)).unwrap();
    graph.create_connection(num, "value", move_to, "x").unwrap();
    graph.create_connection(num, "value", move_to, "y").unwrap();
    graph.create_connection(start, "out", move_to, "in").unwrap();

    let first = compile_graph(&graph);
    assert!(first.contains("ctx.moveTo(7, 7);"));
    // Per-run state resets on every call: output is stable across runs.
    assert_eq!(first, compile_graph(&graph));
}

// ─── Functions, hats, game loop ──────────────────────────────────────────

#[test]
fn function_definitions_are_hoisted_and_emitted_once() {
    let (mut graph, registry) = setup();
    let start = graph.create_node(&registry, "start", 0.0, 0.0).unwrap().id;
    let func = graph.create_node(&registry, "function", 0.0, 0.0).unwrap().id;
    let circle = graph.create_node(&registry, "drawCircle", 0.0, 0.0).unwrap().id;
    let call_a = graph.create_node(&registry, "callFunction", 0.0, 0.0).unwrap().id;
    let call_b = graph.create_node(&registry, "callFunction", 0.0, 0.0).unwrap().id;
    graph.create_connection(func, "body", circle, "in").unwrap();
    graph.create_connection(start, "out", call_a, "in").unwrap();
    graph.create_connection(call_a, "out", call_b, "in").unwrap();

    let code = compile_graph(&graph);
    assert_eq!(code.matches("function myCoolRecipe() {").count(), 1);
    let def = line_index(&code, "function myCoolRecipe() {");
    let main = line_index(&code, "// Start Node");
    assert!(def < main, "definitions precede entry-point code");
    assert_eq!(
        code.matches("if(typeof myCoolRecipe === 'function') { myCoolRecipe(); }")
            .count(),
        2
    );
}

#[test]
fn function_node_in_main_flow_passes_through() {
    let (mut graph, registry) = setup();
    let start = graph.create_node(&registry, "start", 0.0, 0.0).unwrap().id;
    let func = graph.create_node(&registry, "function", 0.0, 0.0).unwrap().id;
    let move_to = graph.create_node(&registry, "moveTo", 0.0, 0.0).unwrap().id;
    graph.create_connection(start, "out", func, "in").unwrap();
    graph.create_connection(func, "out", move_to, "in").unwrap();

    let code = compile_graph(&graph);
    let marker = line_index(&code, "hoisted above; main flow continues");
    let next = line_index(&code, "ctx.moveTo(50, 50)");
    assert!(marker < next);
}

#[test]
fn invalid_function_name_is_skipped_with_placeholder() {
    let (mut graph, registry) = setup();
    let start = graph.create_node(&registry, "start", 0.0, 0.0).unwrap().id;
    let func = graph.create_node(&registry, "function", 0.0, 0.0).unwrap().id;
    graph.set_input_default(func, "name", json!("my recipe")).unwrap();
    graph.create_connection(start, "out", func, "in").unwrap();

    let code = compile_graph(&graph);
    assert!(code.contains("/* Invalid function name: \"my recipe\" (Node ID 2). Skipping definition. */"));
}

#[test]
fn event_hat_registers_named_handler() {
    let (mut graph, registry) = setup();
    let hat = graph.create_node(&registry, "whenKeyPressed", 0.0, 0.0).unwrap().id;
    let sound = graph.create_node(&registry, "playSound", 0.0, 0.0).unwrap().id;
    graph.create_connection(hat, "out", sound, "in").unwrap();

    let code = compile_graph(&graph);
    assert!(code.contains("function handleKeyPress_node1_space() {"));
    assert!(code.contains("    playNodeSound('click');"));
    assert!(code.contains(
        "if (typeof registerKeyPressAction === 'function') { registerKeyPressAction(\"space\", handleKeyPress_node1_space); }"
    ));
    // Hats alone leave the main section idle.
    assert!(code.contains("Awaiting events or game loop ticks"));
}

#[test]
fn unconnected_event_hat_degrades_to_placeholder() {
    let (mut graph, registry) = setup();
    graph.create_node(&registry, "whenKeyPressed", 0.0, 0.0).unwrap();
    let code = compile_graph(&graph);
    assert!(code.contains(
        "/* 'When Key Pressed' for \"space\" (ID 1) has no actions connected or actions were skipped. */"
    ));
}

#[test]
fn game_loop_scaffolding_and_one_time_setup() {
    let (mut graph, registry) = setup();
    let driver = graph.create_node(&registry, "gameLoop", 0.0, 0.0).unwrap().id;
    let clear = graph.create_node(&registry, "clearCanvas", 0.0, 0.0).unwrap().id;
    let start = graph.create_node(&registry, "start", 0.0, 0.0).unwrap().id;
    let color = graph.create_node(&registry, "setColor", 0.0, 0.0).unwrap().id;
    graph.create_connection(driver, "tick", clear, "in").unwrap();
    graph.create_connection(start, "out", color, "in").unwrap();

    let code = compile_graph(&graph);
    let setup_marker = line_index(&code, "// --- One-time Setup from Start Node ---");
    let color_stmt = line_index(&code, "ctx.strokeStyle = \"#FF6347\"");
    let tick_fn = line_index(&code, "function gameLoopTick_generated(timestamp) {");
    assert!(setup_marker < color_stmt && color_stmt < tick_fn);

    assert!(code.contains("  if(ctx && canvas) { ctx.clearRect(0, 0, canvas.width, canvas.height); ctx.beginPath(); }"));
    assert!(code.contains("animationFrameId_gameLoop = requestAnimationFrame(gameLoopTick_generated);"));
    assert!(code.contains("function startGameLoop_generated() {"));
    assert!(code.contains("function stopGameLoop_generated() {"));
    assert!(code.contains("if (typeof startGameLoop_generated === 'function') { startGameLoop_generated(); }"));
}

#[test]
fn disconnected_start_is_ignored_during_game_loop_generation() {
    let (mut graph, registry) = setup();
    let driver = graph.create_node(&registry, "gameLoop", 0.0, 0.0).unwrap().id;
    let clear = graph.create_node(&registry, "clearCanvas", 0.0, 0.0).unwrap().id;
    graph.create_node(&registry, "start", 0.0, 0.0).unwrap();
    graph.create_connection(driver, "tick", clear, "in").unwrap();

    let code = compile_graph(&graph);
    assert!(!code.contains("// --- One-time Setup from Start Node ---"));
}

// ─── Failure semantics & contract ────────────────────────────────────────

#[test]
fn dangling_next_node_degrades_to_placeholder() {
    init_logs();
    let registry = NodeRegistry::builtin();
    let data = json!({
        "nodes": [node_record(1, "start")],
        "connections": [exec_conn("c1", 1, "out", 99, "in")],
        "nextNodeId": 2,
    });
    let graph = NodeGraph::from_json(data, &registry);
    let code = compile_graph(&graph);
    assert!(code.contains("/* Error: Next node (ID 99) in exec path from 1.out not found. */"));
}

#[test]
fn exec_fanout_consults_only_the_first_edge() {
    let (mut graph, registry) = setup();
    let start = graph.create_node(&registry, "start", 0.0, 0.0).unwrap().id;
    let first = graph.create_node(&registry, "moveTo", 0.0, 0.0).unwrap().id;
    let second = graph.create_node(&registry, "lineTo", 0.0, 0.0).unwrap().id;
    graph.create_connection(start, "out", first, "in").unwrap();
    graph.create_connection(start, "out", second, "in").unwrap();

    let code = compile_graph(&graph);
    assert!(code.contains("ctx.moveTo(50, 50)"));
    assert!(!code.contains("ctx.lineTo(150, 150)"));
}

#[test]
fn program_binding_contract_is_stable() {
    assert_eq!(
        PROGRAM_BINDINGS,
        [
            "canvas",
            "ctx",
            "registerKeyPressAction",
            "isKeyCurrentlyPressed",
            "globalAudioCtx"
        ]
    );
}

#[test]
fn variable_motion_ops_read_and_write_the_store() {
    let (mut graph, registry) = setup();
    let start = graph.create_node(&registry, "start", 0.0, 0.0).unwrap().id;
    let nudge = graph.create_node(&registry, "changeXBy", 0.0, 0.0).unwrap().id;
    let place = graph.create_node(&registry, "setYTo", 0.0, 0.0).unwrap().id;
    graph.create_connection(start, "out", nudge, "in").unwrap();
    graph.create_connection(nudge, "out", place, "in").unwrap();

    let code = compile_graph(&graph);
    assert!(code.contains("variables[\"objectX\"] += (10);"));
    assert!(code.contains("variables[\"objectY\"] = (0);"));
}
