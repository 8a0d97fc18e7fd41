use super::cfg::ControlFlowGraph;
use crate::{
    function::Function,
    instructions::{BinaryOp, CompareOp, InstructionKind, Opcode},
    types::Type,
    values::{Constant, InstructionId},
};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueNumber(pub u32);

impl fmt::Display for ValueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vn{}", self.0)
    }
}

/// The shape of a pure computation, keyed by the classes of its operands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ValueKey {
    Constant(Constant, Type),
    Binary(BinaryOp, Type, ValueNumber, ValueNumber),
    Compare(CompareOp, ValueNumber, ValueNumber),
    Conversion(Opcode, Type, ValueNumber),
    /// Address class and the class of the memory state read.
    Load(Type, ValueNumber, ValueNumber),
}

/// Hash-consing value numbering for one function.
///
/// Instructions in the same class compute the same value on every execution
/// where both are evaluated. Constants are numbered by value; arithmetic,
/// comparisons and conversions by opcode and operand classes; a copy joins its
/// source's class. Two loads agree when they read the same address class from
/// the same memory state. Stores, phis, chis, calls and parameters are opaque
/// and get a class of their own.
#[derive(Debug, Clone, Default)]
pub struct ValueNumbering {
    numbers: HashMap<InstructionId, ValueNumber>,
    classes: HashMap<ValueNumber, Vec<InstructionId>>,
}

impl ValueNumbering {
    pub fn compute(function: &Function) -> Self {
        let cfg = ControlFlowGraph::build(function);
        let mut numbering = Self::default();
        let mut table: HashMap<ValueKey, ValueNumber> = HashMap::new();
        let mut next = 0u32;

        // Reverse postorder visits every dominating definition first. Blocks
        // unreachable from the entry follow in layout order.
        let mut order = cfg.reverse_postorder();
        for block in function.body.blocks.keys() {
            if !order.contains(block) {
                order.push(*block);
            }
        }

        for block in order {
            let Some(block) = function.body.get_block(block) else {
                continue;
            };
            for id in &block.instructions {
                let Some(inst) = function.instruction(*id) else {
                    continue;
                };

                let number = match numbering.key_for(&inst.kind, &inst.result_type) {
                    KeyOutcome::Alias(existing) => existing,
                    KeyOutcome::Key(key) => *table.entry(key).or_insert_with(|| {
                        next += 1;
                        ValueNumber(next - 1)
                    }),
                    KeyOutcome::Opaque => {
                        next += 1;
                        ValueNumber(next - 1)
                    }
                };

                numbering.numbers.insert(*id, number);
                numbering.classes.entry(number).or_default().push(*id);
            }
        }

        numbering
    }

    fn key_for(&self, kind: &InstructionKind, ty: &Type) -> KeyOutcome {
        let class = |id: &InstructionId| self.numbers.get(id).copied();

        let key = match kind {
            InstructionKind::Constant(value) => {
                Some(ValueKey::Constant(value.clone(), ty.clone()))
            }
            InstructionKind::Copy { source } => {
                return class(source).map_or(KeyOutcome::Opaque, KeyOutcome::Alias);
            }
            InstructionKind::Binary { op, left, right } => {
                match (class(left), class(right)) {
                    (Some(l), Some(r)) => {
                        let (l, r) = if op.is_commutative() && r < l {
                            (r, l)
                        } else {
                            (l, r)
                        };
                        Some(ValueKey::Binary(*op, ty.clone(), l, r))
                    }
                    _ => None,
                }
            }
            InstructionKind::Compare { op, left, right } => match (class(left), class(right)) {
                (Some(l), Some(r)) => Some(ValueKey::Compare(*op, l, r)),
                _ => None,
            },
            InstructionKind::Convert { operand }
            | InstructionKind::CheckedConvert { operand }
            | InstructionKind::ConvertToBase { operand }
            | InstructionKind::ConvertToDerived { operand } => class(operand)
                .map(|operand| ValueKey::Conversion(kind.opcode(), ty.clone(), operand)),
            InstructionKind::Load { address, source } => match (class(address), class(source)) {
                (Some(a), Some(m)) => Some(ValueKey::Load(ty.clone(), a, m)),
                _ => None,
            },
            _ => None,
        };

        key.map_or(KeyOutcome::Opaque, KeyOutcome::Key)
    }

    pub fn value_number(&self, id: InstructionId) -> Option<ValueNumber> {
        self.numbers.get(&id).copied()
    }

    pub fn same_value(&self, a: InstructionId, b: InstructionId) -> bool {
        match (self.value_number(a), self.value_number(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Every instruction congruent to `id`, including `id` itself. Empty when
    /// `id` is not in the numbered function.
    pub fn class_members(&self, id: InstructionId) -> &[InstructionId] {
        self.value_number(id)
            .and_then(|number| self.classes.get(&number))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn congruent_sets(&self) -> impl Iterator<Item = &[InstructionId]> + '_ {
        self.classes
            .values()
            .filter(|members| members.len() > 1)
            .map(|members| members.as_slice())
    }
}

enum KeyOutcome {
    Alias(ValueNumber),
    Key(ValueKey),
    Opaque,
}
