use irflow_core::{CompareOp, IRBuilder, Instruction, InstructionId, InstructionKind, Program, Type};
use irflow_dataflow::{
    instruction_node, BarrierGuard, DataFlowGraph, GuardCondition, GuardRegistry,
};
use pretty_assertions::assert_eq;
use std::collections::HashSet;

/// A branch on a boolean value validates that value when it is true.
struct TruthyCheck;

impl BarrierGuard for TruthyCheck {
    fn checks(&self, condition: &GuardCondition<'_>, instruction: &Instruction, outcome: bool) -> bool {
        outcome && condition.instruction().id == instruction.id
    }
}

/// A branch on a boolean value validates that value when it is false.
struct FalsyCheck;

impl BarrierGuard for FalsyCheck {
    fn checks(&self, condition: &GuardCondition<'_>, instruction: &Instruction, outcome: bool) -> bool {
        !outcome && condition.instruction().id == instruction.id
    }
}

/// `v < bound` validates `v` when true.
struct BelowBound;

impl BarrierGuard for BelowBound {
    fn checks(&self, condition: &GuardCondition<'_>, instruction: &Instruction, outcome: bool) -> bool {
        match condition.instruction().kind {
            InstructionKind::Compare {
                op: CompareOp::Lt,
                left,
                ..
            } => outcome && left == instruction.id,
            _ => false,
        }
    }
}

struct IfElse {
    program: Program,
    x: InstructionId,
    then_use: InstructionId,
    else_use: InstructionId,
    join_use: InstructionId,
}

/// `if (x) { use(x) } else { use(x) }; use(x)`
fn if_else() -> IfElse {
    let mut builder = IRBuilder::new();
    let mut func = builder.function("check");
    func.param("x", Type::Bool);

    let then_block = func.create_block_id();
    let else_block = func.create_block_id();
    let join = func.create_block_id();

    let x = {
        let mut b = func.entry_block();
        let x = b.init_param(0).unwrap();
        b.branch(x, then_block, else_block).unwrap();
        x
    };
    let then_use = {
        let mut b = func.switch_to_block(then_block).unwrap();
        let u = b.copy(x, Type::Bool);
        b.jump(join).unwrap();
        u
    };
    let else_use = {
        let mut b = func.switch_to_block(else_block).unwrap();
        let u = b.copy(x, Type::Bool);
        b.jump(join).unwrap();
        u
    };
    let join_use = {
        let mut b = func.switch_to_block(join).unwrap();
        let u = b.copy(x, Type::Bool);
        b.return_void().unwrap();
        u
    };
    func.build().unwrap();

    IfElse {
        program: builder.finish().unwrap(),
        x,
        then_use,
        else_use,
        join_use,
    }
}

#[test]
fn test_guard_covers_only_the_checked_branch() {
    let p = if_else();
    let graph = DataFlowGraph::new(&p.program);

    let guarded = graph.guarded_nodes(&TruthyCheck);
    assert_eq!(guarded, HashSet::from([instruction_node(p.then_use)]));
    assert!(!guarded.contains(&instruction_node(p.else_use)));
    assert!(!guarded.contains(&instruction_node(p.join_use)));
    assert!(!guarded.contains(&instruction_node(p.x)));
}

#[test]
fn test_false_outcome_guards_else_branch() {
    let p = if_else();
    let graph = DataFlowGraph::new(&p.program);

    assert_eq!(
        graph.guarded_nodes(&FalsyCheck),
        HashSet::from([instruction_node(p.else_use)])
    );
    assert!(graph.is_guarded(instruction_node(p.else_use), &FalsyCheck));
    assert!(!graph.is_guarded(instruction_node(p.then_use), &FalsyCheck));
}

#[test]
fn test_registry_over_both_outcomes() {
    let p = if_else();
    let graph = DataFlowGraph::new(&p.program);
    let mut registry = GuardRegistry::new();
    registry.register(TruthyCheck).register(FalsyCheck);

    let guarded = registry.guarded_nodes(&graph);
    assert_eq!(
        guarded,
        HashSet::from([instruction_node(p.then_use), instruction_node(p.else_use)])
    );
    assert!(!registry.is_guarded(&graph, instruction_node(p.join_use)));
}

#[test]
fn test_branch_with_identical_targets_guards_nothing() {
    let mut builder = IRBuilder::new();
    let mut func = builder.function("pointless");
    func.param("x", Type::Bool);
    let next = func.create_block_id();
    let x = {
        let mut b = func.entry_block();
        let x = b.init_param(0).unwrap();
        b.branch(x, next, next).unwrap();
        x
    };
    {
        let mut b = func.switch_to_block(next).unwrap();
        b.copy(x, Type::Bool);
        b.return_void().unwrap();
    }
    func.build().unwrap();
    let program = builder.finish().unwrap();
    let graph = DataFlowGraph::new(&program);

    assert!(graph.guarded_nodes(&TruthyCheck).is_empty());
    assert!(graph.guarded_nodes(&FalsyCheck).is_empty());
}

/// `x = p; if (x < 0) { use(x) }; x = p; use(x)` with `x` kept in memory, so
/// every use is a fresh load.
#[test]
fn test_reload_of_unchanged_variable_is_guarded() {
    let mut builder = IRBuilder::new();
    let mut func = builder.function("clamp");
    func.param("p", Type::int(32));
    let then_block = func.create_block_id();
    let join = func.create_block_id();

    let (addr, stored, tested) = {
        let mut b = func.entry_block();
        let p = b.init_param(0).unwrap();
        let addr = b.variable_address("x", Type::int(32));
        let stored = b.store(addr, p);
        let tested = b.load(addr, stored);
        let zero = b.constant_int(0, 32);
        let cmp = b.compare(CompareOp::Lt, tested, zero);
        b.branch(cmp, then_block, join).unwrap();
        (addr, stored, tested)
    };
    let reload = {
        let mut b = func.switch_to_block(then_block).unwrap();
        let reload = b.load(addr, stored);
        b.jump(join).unwrap();
        reload
    };
    let (restored, after_write) = {
        let mut b = func.switch_to_block(join).unwrap();
        let join_reload = b.load(addr, stored);
        let restored = b.store(addr, join_reload);
        let after_write = b.load(addr, restored);
        b.return_void().unwrap();
        (restored, after_write)
    };
    func.build().unwrap();
    let program = builder.finish().unwrap();
    let graph = DataFlowGraph::new(&program);

    assert_eq!(
        graph.guarded_nodes(&BelowBound),
        HashSet::from([instruction_node(reload)])
    );
    assert!(graph.is_guarded(instruction_node(reload), &BelowBound));
    assert!(!graph.is_guarded(instruction_node(tested), &BelowBound));
    assert!(!graph.is_guarded(instruction_node(after_write), &BelowBound));
    assert!(!graph.is_guarded(instruction_node(restored), &BelowBound));
}
