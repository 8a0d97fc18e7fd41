use crate::block::{BlockId, Terminator};
use crate::function::Function;
use crate::instructions::{CallTarget, Expr, ExprKind, Instruction, InstructionKind};
use crate::values::{ExprId, FunctionId, InstructionId};
use crate::{IrError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A set of functions sharing one instruction and expression id space.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "ProgramData")]
pub struct Program {
    pub functions: IndexMap<FunctionId, Function>,
    #[serde(skip)]
    by_name: HashMap<String, FunctionId>,
    #[serde(skip)]
    instruction_owner: HashMap<InstructionId, FunctionId>,
    #[serde(skip)]
    expr_owner: HashMap<ExprId, FunctionId>,
}

#[derive(Deserialize)]
struct ProgramData {
    functions: IndexMap<FunctionId, Function>,
}

impl TryFrom<ProgramData> for Program {
    type Error = IrError;

    fn try_from(data: ProgramData) -> Result<Self> {
        let mut program = Program::default();
        for (key, function) in data.functions {
            if key != function.id {
                return Err(IrError::InvalidInstruction(format!(
                    "{} is stored under {}",
                    function.id, key
                )));
            }
            program.add_function(function)?;
        }
        Ok(program)
    }
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, function: Function) -> Result<()> {
        if self.functions.contains_key(&function.id) {
            return Err(IrError::BuilderError(format!(
                "Function {} already exists",
                function.id
            )));
        }
        if self.by_name.contains_key(function.name()) {
            return Err(IrError::BuilderError(format!(
                "Function {} already exists",
                function.name()
            )));
        }
        for id in function.body.instructions.keys() {
            if self.instruction_owner.contains_key(id) {
                return Err(IrError::BuilderError(format!(
                    "Instruction {} is defined in more than one function",
                    id
                )));
            }
        }

        self.insert_function(function);
        Ok(())
    }

    fn insert_function(&mut self, function: Function) {
        let id = function.id;
        self.by_name.insert(function.name().to_string(), id);
        for inst in function.body.instructions.keys() {
            self.instruction_owner.insert(*inst, id);
        }
        for expr in function.body.exprs.keys() {
            self.expr_owner.insert(*expr, id);
        }
        self.functions.insert(id, function);
    }

    pub fn function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(&id)
    }

    pub fn function_by_name(&self, name: &str) -> Option<&Function> {
        self.by_name.get(name).and_then(|id| self.functions.get(id))
    }

    pub fn require_function(&self, name: &str) -> Result<&Function> {
        self.function_by_name(name)
            .ok_or_else(|| IrError::FunctionNotFound(name.to_string()))
    }

    pub fn instruction(&self, id: InstructionId) -> Option<&Instruction> {
        let owner = self.instruction_owner.get(&id)?;
        self.functions.get(owner)?.instruction(id)
    }

    pub fn expr(&self, id: ExprId) -> Option<&Expr> {
        let owner = self.expr_owner.get(&id)?;
        self.functions.get(owner)?.expr(id)
    }

    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> + '_ {
        self.functions.values().flat_map(|f| f.instructions())
    }

    /// Checks the structural invariants the analyses rely on. Every block is
    /// terminated, ids and names belong to exactly one function, instructions
    /// sit in the block they name, operands resolve inside the same function,
    /// and static call targets exist.
    pub fn validate(&self) -> Result<()> {
        for function in self.functions.values() {
            for block in function.body.blocks.values() {
                if !block.is_terminated() {
                    return Err(IrError::InvalidInstruction(format!(
                        "{} in {} has no terminator",
                        block.id,
                        function.name()
                    )));
                }
                for succ in block.successors() {
                    if !function.body.blocks.contains_key(&succ) {
                        return Err(IrError::InvalidInstruction(format!(
                            "{} in {} jumps to missing {}",
                            block.id,
                            function.name(),
                            succ
                        )));
                    }
                }
                if let Terminator::Branch { condition, .. } = block.terminator {
                    self.expect_local(function, condition)?;
                }
            }

            self.expect_owned(function)?;
            self.expect_block_layout(function)?;

            for inst in function.body.instructions.values() {
                if inst.function != function.id {
                    return Err(IrError::InvalidInstruction(format!(
                        "{} is stored in {} but claims {}",
                        inst.id,
                        function.name(),
                        inst.function
                    )));
                }
                for operand in inst.operands() {
                    self.expect_local(function, operand.def)?;
                }
                if let InstructionKind::Call {
                    target: CallTarget::Static(callee),
                    ..
                } = &inst.kind
                {
                    if !self.functions.contains_key(callee) {
                        return Err(IrError::InvalidInstruction(format!(
                            "{} calls missing function {}",
                            inst.id, callee
                        )));
                    }
                }
                if let Some(expr) = inst.expr {
                    if function.expr(expr).is_none() {
                        return Err(IrError::InvalidInstruction(format!(
                            "{} refers to missing expression {}",
                            inst.id, expr
                        )));
                    }
                }
            }

            for expr in function.body.exprs.values() {
                if let ExprKind::Conversion {
                    operand: Some(operand),
                } = expr.kind
                {
                    if function.expr(operand).is_none() {
                        return Err(IrError::InvalidInstruction(format!(
                            "conversion {} wraps missing expression {}",
                            expr.id, operand
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Every name and instruction of `function` is indexed to it and to no
    /// other function.
    fn expect_owned(&self, function: &Function) -> Result<()> {
        if self.by_name.get(function.name()) != Some(&function.id) {
            return Err(IrError::InvalidInstruction(format!(
                "name {} of {} is shared with another function",
                function.name(),
                function.id
            )));
        }
        for (key, inst) in &function.body.instructions {
            if *key != inst.id {
                return Err(IrError::InvalidInstruction(format!(
                    "{} is stored under {} in {}",
                    inst.id,
                    key,
                    function.name()
                )));
            }
            if self.instruction_owner.get(key) != Some(&function.id) {
                return Err(IrError::InvalidInstruction(format!(
                    "{} of {} is defined in more than one function",
                    key,
                    function.name()
                )));
            }
        }
        Ok(())
    }

    /// Each instruction is listed exactly once, in the block it names.
    fn expect_block_layout(&self, function: &Function) -> Result<()> {
        let mut listed: HashMap<InstructionId, BlockId> = HashMap::new();
        for block in function.body.blocks.values() {
            for id in &block.instructions {
                if listed.insert(*id, block.id).is_some() {
                    return Err(IrError::InvalidInstruction(format!(
                        "{} is listed more than once in {}",
                        id,
                        function.name()
                    )));
                }
                match function.instruction(*id) {
                    Some(inst) if inst.block == block.id => {}
                    Some(inst) => {
                        return Err(IrError::InvalidInstruction(format!(
                            "{} is listed in {} but claims {}",
                            id, block.id, inst.block
                        )))
                    }
                    None => {
                        return Err(IrError::InvalidInstruction(format!(
                            "{} in {} lists undefined {}",
                            block.id,
                            function.name(),
                            id
                        )))
                    }
                }
            }
        }
        if let Some(orphan) = function
            .body
            .instructions
            .keys()
            .find(|id| !listed.contains_key(id))
        {
            return Err(IrError::InvalidInstruction(format!(
                "{} of {} is not listed in any block",
                orphan,
                function.name()
            )));
        }
        Ok(())
    }

    fn expect_local(&self, function: &Function, id: InstructionId) -> Result<()> {
        match self.instruction_owner.get(&id) {
            Some(owner) if *owner == function.id => Ok(()),
            Some(owner) => Err(IrError::InvalidInstruction(format!(
                "{} in {} uses {} from {}",
                function.name(),
                function.id,
                id,
                owner
            ))),
            None => Err(IrError::InvalidInstruction(format!(
                "{} uses undefined {}",
                function.name(),
                id
            ))),
        }
    }

    pub fn stats(&self) -> ProgramStats {
        ProgramStats {
            functions: self.functions.len(),
            blocks: self
                .functions
                .values()
                .map(|f| f.body.blocks.len())
                .sum(),
            instructions: self.instruction_owner.len(),
            exprs: self.expr_owner.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramStats {
    pub functions: usize,
    pub blocks: usize,
    pub instructions: usize,
    pub exprs: usize,
}
