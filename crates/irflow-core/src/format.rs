use crate::{
    block::{BasicBlock, Terminator},
    function::Function,
    instructions::{BinaryOp, CallTarget, CompareOp, Instruction, InstructionKind},
    program::Program,
};
use std::fmt::{self, Write};

pub fn format_program(program: &Program) -> String {
    let mut output = String::new();

    for function in program.functions.values() {
        write!(&mut output, "{}", format_function(function)).unwrap();
        writeln!(&mut output).unwrap();
    }

    output
}

pub fn format_function(function: &Function) -> String {
    let mut output = String::new();

    write!(&mut output, "function %{}", function.signature.name).unwrap();

    write!(&mut output, "(").unwrap();
    if let Some(this_type) = &function.signature.this_type {
        write!(&mut output, "this: {}*", this_type).unwrap();
        if !function.signature.params.is_empty() {
            write!(&mut output, ", ").unwrap();
        }
    }
    for (i, param) in function.signature.params.iter().enumerate() {
        if i > 0 {
            write!(&mut output, ", ").unwrap();
        }
        write!(&mut output, "{}: {}", param.name, param.param_type).unwrap();
    }
    write!(&mut output, ") -> {}", function.signature.returns).unwrap();

    writeln!(&mut output, " {{").unwrap();

    for block in function.body.blocks.values() {
        write!(&mut output, "{}", format_block(function, block)).unwrap();
    }

    writeln!(&mut output, "}}").unwrap();

    output
}

fn format_block(function: &Function, block: &BasicBlock) -> String {
    let mut output = String::new();

    writeln!(&mut output, "{}:", block.id).unwrap();

    for id in &block.instructions {
        if let Some(inst) = function.instruction(*id) {
            writeln!(&mut output, "    {}", inst).unwrap();
        }
    }

    writeln!(&mut output, "    {}", format_terminator(&block.terminator)).unwrap();

    output
}

fn format_terminator(terminator: &Terminator) -> String {
    match terminator {
        Terminator::Jump(target) => format!("jump {}", target),
        Terminator::Branch {
            condition,
            then_block,
            else_block,
        } => format!("brif {}, {}, {}", condition, then_block, else_block),
        Terminator::Return => "return".to_string(),
        Terminator::Unreachable => "unreachable".to_string(),
        Terminator::Invalid => "<unterminated>".to_string(),
    }
}

fn binary_mnemonic(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "add",
        BinaryOp::Sub => "sub",
        BinaryOp::Mul => "mul",
        BinaryOp::Div => "div",
        BinaryOp::Rem => "rem",
        BinaryOp::And => "and",
        BinaryOp::Or => "or",
        BinaryOp::Xor => "xor",
        BinaryOp::Shl => "shl",
        BinaryOp::Shr => "shr",
        BinaryOp::PointerAdd => "ptradd",
    }
}

fn compare_mnemonic(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "eq",
        CompareOp::Ne => "ne",
        CompareOp::Lt => "lt",
        CompareOp::Le => "le",
        CompareOp::Gt => "gt",
        CompareOp::Ge => "ge",
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} = ", self.id, self.result_type)?;
        match &self.kind {
            InstructionKind::Constant(c) => write!(f, "const {}", c),
            InstructionKind::VariableAddress { name } => write!(f, "addr &{}", name),
            InstructionKind::InitializeParameter { index } => write!(f, "init_param #{}", index),
            InstructionKind::InitializeThis => write!(f, "init_this"),
            InstructionKind::Copy { source } => write!(f, "copy {}", source),
            InstructionKind::Load { address, source } => {
                write!(f, "load [{}], {}", address, source)
            }
            InstructionKind::Store { address, value } => {
                write!(f, "store [{}], {}", address, value)
            }
            InstructionKind::Phi { incoming } => {
                write!(f, "phi ")?;
                for (i, (pred, def)) in incoming.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "[{}: {}]", pred, def)?;
                }
                Ok(())
            }
            InstructionKind::Convert { operand } => write!(f, "convert {}", operand),
            InstructionKind::CheckedConvert { operand } => {
                write!(f, "checked_convert {}", operand)
            }
            InstructionKind::ConvertToBase { operand } => write!(f, "to_base {}", operand),
            InstructionKind::ConvertToDerived { operand } => write!(f, "to_derived {}", operand),
            InstructionKind::Chi { total, partial } => {
                write!(f, "chi total:{}, partial:{}", total, partial)
            }
            InstructionKind::Binary { op, left, right } => {
                write!(f, "{} {}, {}", binary_mnemonic(*op), left, right)
            }
            InstructionKind::Compare { op, left, right } => {
                write!(f, "cmp {} {}, {}", compare_mnemonic(*op), left, right)
            }
            InstructionKind::Call {
                target,
                arguments,
                this_argument,
            } => {
                match target {
                    CallTarget::Static(callee) => write!(f, "call {}", callee)?,
                    CallTarget::Indirect(callee) => write!(f, "call_indirect {}", callee)?,
                }
                write!(f, "(")?;
                if let Some(this) = this_argument {
                    write!(f, "this={}", this)?;
                    if !arguments.is_empty() {
                        write!(f, ", ")?;
                    }
                }
                for (i, arg) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            InstructionKind::WriteSideEffect { call, index } => {
                write!(f, "write_side_effect {}[{}]", call, index)
            }
            InstructionKind::Return { value: Some(v) } => write!(f, "ret {}", v),
            InstructionKind::Return { value: None } => write!(f, "ret"),
        }
    }
}
