use super::{BlockBuilder, IRContext};
use crate::{
    block::BlockId,
    function::{Function, FunctionSignature, Parameter},
    instructions::{Expr, ExprKind, InstructionKind},
    program::Program,
    types::Type,
    values::{ExprId, FunctionId, InstructionId, SourceLocation},
    IrError, Result,
};
use std::collections::HashSet;

pub struct FunctionBuilder<'a> {
    function: Function,
    context: &'a mut IRContext,
    program: &'a mut Program,
    current_block: Option<BlockId>,
    created_blocks: HashSet<BlockId>,
}

impl<'a> FunctionBuilder<'a> {
    pub fn new(
        id: FunctionId,
        name: String,
        context: &'a mut IRContext,
        program: &'a mut Program,
    ) -> Self {
        let function = Function::new(id, FunctionSignature::new(name));
        let mut created_blocks = HashSet::new();
        created_blocks.insert(function.entry_block());

        Self {
            function,
            context,
            program,
            current_block: None,
            created_blocks,
        }
    }

    pub fn id(&self) -> FunctionId {
        self.function.id
    }

    pub fn param(&mut self, name: &str, ty: Type) -> &mut Self {
        if self
            .function
            .signature
            .params
            .iter()
            .any(|p| p.name == name)
        {
            self.context.add_error(format!(
                "Duplicate parameter {} in {}",
                name,
                self.function.name()
            ));
        }
        self.function
            .signature
            .params
            .push(Parameter::new(name, ty));
        self
    }

    pub fn returns(&mut self, ty: Type) -> &mut Self {
        self.function.signature.returns = ty;
        self
    }

    /// Marks the function as a member function with the given receiver type.
    pub fn this_type(&mut self, ty: Type) -> &mut Self {
        self.function.signature.this_type = Some(ty);
        self
    }

    pub fn create_block_id(&mut self) -> BlockId {
        let block_id = self.function.body.create_block();
        self.created_blocks.insert(block_id);
        block_id
    }

    pub fn switch_to_block(&mut self, block_id: BlockId) -> Result<BlockBuilder<'_>> {
        if !self.created_blocks.contains(&block_id) {
            return Err(IrError::BuilderError(format!(
                "Block {} does not exist in function",
                block_id
            )));
        }

        Ok(self.block_with_id(block_id))
    }

    pub fn current_block(&self) -> Option<BlockId> {
        self.current_block
    }

    pub fn entry_block(&mut self) -> BlockBuilder<'_> {
        let block_id = self.function.body.entry_block;
        self.block_with_id(block_id)
    }

    pub fn block(&mut self) -> BlockBuilder<'_> {
        let block_id = self.create_block_id();
        self.block_with_id(block_id)
    }

    pub fn block_with_id(&mut self, block_id: BlockId) -> BlockBuilder<'_> {
        self.current_block = Some(block_id);
        self.created_blocks.insert(block_id);
        if self.function.body.get_block(block_id).is_none() {
            self.function
                .body
                .blocks
                .insert(block_id, crate::block::BasicBlock::new(block_id));
        }

        BlockBuilder::new(block_id, &mut self.function, self.context)
    }

    /// Adds an incoming edge to an existing phi. Loop-carried values are
    /// defined after the header phi that consumes them, so the back edge is
    /// patched in once the loop body exists.
    pub fn add_phi_incoming(
        &mut self,
        phi: InstructionId,
        pred: BlockId,
        value: InstructionId,
    ) -> Result<()> {
        let inst = self
            .function
            .body
            .instructions
            .get_mut(&phi)
            .ok_or_else(|| IrError::BuilderError(format!("{} is not in this function", phi)))?;

        match &mut inst.kind {
            InstructionKind::Phi { incoming } => {
                incoming.push((pred, value));
                Ok(())
            }
            other => Err(IrError::InvalidInstruction(format!(
                "{} is a {:?}, not a phi",
                phi,
                other.opcode()
            ))),
        }
    }

    pub fn expr(&mut self, text: &str, location: SourceLocation) -> ExprId {
        self.push_expr(ExprKind::Other, text, location)
    }

    pub fn conversion_expr(
        &mut self,
        operand: Option<ExprId>,
        text: &str,
        location: SourceLocation,
    ) -> ExprId {
        self.push_expr(ExprKind::Conversion { operand }, text, location)
    }

    fn push_expr(&mut self, kind: ExprKind, text: &str, location: SourceLocation) -> ExprId {
        let id = self.context.next_expr_id();
        self.function.body.exprs.insert(
            id,
            Expr {
                id,
                kind,
                text: text.to_string(),
                location,
            },
        );
        id
    }

    pub fn bind_expr(&mut self, inst: InstructionId, expr: ExprId) -> Result<()> {
        if !self.function.body.exprs.contains_key(&expr) {
            return Err(IrError::BuilderError(format!(
                "Expression {} does not exist in function",
                expr
            )));
        }
        let inst = self
            .function
            .body
            .instructions
            .get_mut(&inst)
            .ok_or_else(|| IrError::BuilderError(format!("{} is not in this function", inst)))?;
        inst.expr = Some(expr);
        Ok(())
    }

    pub fn current_function(&self) -> &Function {
        &self.function
    }

    pub fn build(self) -> Result<FunctionId> {
        let id = self.function.id;
        self.program.add_function(self.function)?;
        Ok(id)
    }
}
