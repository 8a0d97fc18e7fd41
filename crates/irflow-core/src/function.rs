use crate::block::{BasicBlock, BlockId};
use crate::instructions::{Expr, Instruction};
use crate::types::Type;
use crate::values::{ExprId, FunctionId, InstructionId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub id: FunctionId,
    pub signature: FunctionSignature,
    pub body: FunctionBody,
}

impl Function {
    pub fn new(id: FunctionId, signature: FunctionSignature) -> Self {
        Self {
            id,
            signature,
            body: FunctionBody::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub fn entry_block(&self) -> BlockId {
        self.body.entry_block()
    }

    pub fn parameter(&self, index: usize) -> Option<&Parameter> {
        self.signature.params.get(index)
    }

    pub fn instruction(&self, id: InstructionId) -> Option<&Instruction> {
        self.body.instructions.get(&id)
    }

    pub fn expr(&self, id: ExprId) -> Option<&Expr> {
        self.body.exprs.get(&id)
    }

    /// Instructions in block order, then in program order within each block.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> + '_ {
        self.body
            .blocks
            .values()
            .flat_map(|block| block.instructions.iter())
            .filter_map(|id| self.body.instructions.get(id))
    }

    pub fn predecessors(&self, block: BlockId) -> Vec<BlockId> {
        self.body
            .blocks
            .values()
            .filter(|b| b.successors().contains(&block))
            .map(|b| b.id)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    pub params: Vec<Parameter>,
    pub returns: Type,
    /// Receiver type for member functions.
    pub this_type: Option<Type>,
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: Type::Void,
            this_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub param_type: Type,
}

impl Parameter {
    pub fn new(name: impl Into<String>, param_type: Type) -> Self {
        Self {
            name: name.into(),
            param_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionBody {
    pub entry_block: BlockId,
    pub blocks: IndexMap<BlockId, BasicBlock>,
    pub instructions: IndexMap<InstructionId, Instruction>,
    pub exprs: IndexMap<ExprId, Expr>,
    next_block_id: u32,
}

impl FunctionBody {
    pub fn new() -> Self {
        let entry_block = BlockId(0);
        let mut blocks = IndexMap::new();
        blocks.insert(entry_block, BasicBlock::new(entry_block));

        Self {
            entry_block,
            blocks,
            instructions: IndexMap::new(),
            exprs: IndexMap::new(),
            next_block_id: 1,
        }
    }

    pub fn create_block(&mut self) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        self.blocks.insert(id, BasicBlock::new(id));
        id
    }

    pub fn get_block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(&id)
    }

    pub fn get_block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(&id)
    }

    pub fn entry_block(&self) -> BlockId {
        self.entry_block
    }
}

impl Default for FunctionBody {
    fn default() -> Self {
        Self::new()
    }
}
