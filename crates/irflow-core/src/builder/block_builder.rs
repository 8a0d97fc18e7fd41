use super::IRContext;
use crate::{
    block::{BlockId, Terminator},
    function::Function,
    instructions::{
        BinaryOp, CallTarget, CompareOp, Expr, ExprKind, Instruction, InstructionKind,
    },
    types::Type,
    values::{Constant, ExprId, InstructionId, SourceLocation},
    IrError, Result,
};

pub struct BlockBuilder<'a> {
    pub block_id: BlockId,
    function: &'a mut Function,
    context: &'a mut IRContext,
    current_source_location: Option<SourceLocation>,
}

impl<'a> BlockBuilder<'a> {
    pub fn new(block_id: BlockId, function: &'a mut Function, context: &'a mut IRContext) -> Self {
        Self {
            block_id,
            function,
            context,
            current_source_location: None,
        }
    }

    pub fn set_source_location(&mut self, location: SourceLocation) {
        self.current_source_location = Some(location);
    }

    pub fn block_id(&self) -> BlockId {
        self.block_id
    }

    fn push_instruction(&mut self, kind: InstructionKind, result_type: Type) -> InstructionId {
        let id = self.context.next_instruction_id();
        let inst = Instruction {
            id,
            function: self.function.id,
            block: self.block_id,
            kind,
            result_type,
            expr: None,
            location: self.current_source_location.clone().unwrap_or_default(),
        };
        self.function.body.instructions.insert(id, inst);
        if let Some(block) = self.function.body.get_block_mut(self.block_id) {
            block.add_instruction(id);
        }
        id
    }

    fn type_of(&self, id: InstructionId) -> Type {
        self.function
            .instruction(id)
            .map(|inst| inst.result_type.clone())
            .unwrap_or(Type::Unknown)
    }

    pub fn constant(&mut self, value: Constant, ty: Type) -> InstructionId {
        self.push_instruction(InstructionKind::Constant(value), ty)
    }

    pub fn constant_int(&mut self, value: i64, bits: u16) -> InstructionId {
        self.constant(Constant::int(value), Type::int(bits))
    }

    pub fn constant_bool(&mut self, value: bool) -> InstructionId {
        self.constant(Constant::Bool(value), Type::Bool)
    }

    pub fn variable_address(&mut self, name: &str, ty: Type) -> InstructionId {
        self.push_instruction(
            InstructionKind::VariableAddress {
                name: name.to_string(),
            },
            Type::pointer_to(ty),
        )
    }

    pub fn init_param(&mut self, index: usize) -> Result<InstructionId> {
        let ty = self
            .function
            .parameter(index)
            .map(|p| p.param_type.clone())
            .ok_or_else(|| {
                IrError::BuilderError(format!(
                    "{} has no parameter at index {}",
                    self.function.name(),
                    index
                ))
            })?;
        Ok(self.push_instruction(InstructionKind::InitializeParameter { index }, ty))
    }

    pub fn init_this(&mut self) -> Result<InstructionId> {
        let ty = self
            .function
            .signature
            .this_type
            .clone()
            .ok_or_else(|| {
                IrError::BuilderError(format!(
                    "{} is not a member function",
                    self.function.name()
                ))
            })?;
        Ok(self.push_instruction(InstructionKind::InitializeThis, Type::pointer_to(ty)))
    }

    pub fn copy(&mut self, source: InstructionId, ty: Type) -> InstructionId {
        self.push_instruction(InstructionKind::Copy { source }, ty)
    }

    /// Reads through `address`; `source` is the definition of the memory read.
    pub fn load(&mut self, address: InstructionId, source: InstructionId) -> InstructionId {
        let ty = self.type_of(source);
        self.push_instruction(InstructionKind::Load { address, source }, ty)
    }

    pub fn store(&mut self, address: InstructionId, value: InstructionId) -> InstructionId {
        let ty = self.type_of(value);
        self.push_instruction(InstructionKind::Store { address, value }, ty)
    }

    pub fn phi(&mut self, incoming: Vec<(BlockId, InstructionId)>, ty: Type) -> InstructionId {
        self.push_instruction(InstructionKind::Phi { incoming }, ty)
    }

    pub fn convert(&mut self, operand: InstructionId, ty: Type) -> InstructionId {
        self.push_instruction(InstructionKind::Convert { operand }, ty)
    }

    pub fn checked_convert(&mut self, operand: InstructionId, ty: Type) -> InstructionId {
        self.push_instruction(InstructionKind::CheckedConvert { operand }, ty)
    }

    pub fn convert_to_base(&mut self, operand: InstructionId, ty: Type) -> InstructionId {
        self.push_instruction(InstructionKind::ConvertToBase { operand }, ty)
    }

    pub fn convert_to_derived(&mut self, operand: InstructionId, ty: Type) -> InstructionId {
        self.push_instruction(InstructionKind::ConvertToDerived { operand }, ty)
    }

    /// A may-write of `partial` over the memory whose prior value is `total`.
    /// Pass [`Type::Unknown`] when the write may reach escaped storage.
    pub fn chi(&mut self, total: InstructionId, partial: InstructionId, ty: Type) -> InstructionId {
        self.push_instruction(InstructionKind::Chi { total, partial }, ty)
    }

    pub fn binary(
        &mut self,
        op: BinaryOp,
        left: InstructionId,
        right: InstructionId,
        ty: Type,
    ) -> InstructionId {
        self.push_instruction(InstructionKind::Binary { op, left, right }, ty)
    }

    pub fn add(&mut self, left: InstructionId, right: InstructionId, ty: Type) -> InstructionId {
        self.binary(BinaryOp::Add, left, right, ty)
    }

    pub fn compare(
        &mut self,
        op: CompareOp,
        left: InstructionId,
        right: InstructionId,
    ) -> InstructionId {
        self.push_instruction(InstructionKind::Compare { op, left, right }, Type::Bool)
    }

    pub fn call(
        &mut self,
        target: CallTarget,
        arguments: Vec<InstructionId>,
        this_argument: Option<InstructionId>,
        ty: Type,
    ) -> InstructionId {
        self.push_instruction(
            InstructionKind::Call {
                target,
                arguments,
                this_argument,
            },
            ty,
        )
    }

    pub fn write_side_effect(&mut self, call: InstructionId, index: i32, ty: Type) -> InstructionId {
        self.push_instruction(InstructionKind::WriteSideEffect { call, index }, ty)
    }

    pub fn expr(&mut self, text: &str) -> ExprId {
        self.push_expr(ExprKind::Other, text)
    }

    pub fn conversion_expr(&mut self, operand: Option<ExprId>, text: &str) -> ExprId {
        self.push_expr(ExprKind::Conversion { operand }, text)
    }

    fn push_expr(&mut self, kind: ExprKind, text: &str) -> ExprId {
        let id = self.context.next_expr_id();
        let location = self.current_source_location.clone().unwrap_or_default();
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

    pub fn jump(&mut self, target: BlockId) -> Result<()> {
        self.seal_with_terminator(Terminator::Jump(target))
    }

    pub fn branch(
        &mut self,
        condition: InstructionId,
        then_block: BlockId,
        else_block: BlockId,
    ) -> Result<()> {
        self.seal_with_terminator(Terminator::Branch {
            condition,
            then_block,
            else_block,
        })
    }

    pub fn return_value(&mut self, value: InstructionId) -> Result<()> {
        let ty = self.type_of(value);
        self.push_instruction(InstructionKind::Return { value: Some(value) }, ty);
        self.seal_with_terminator(Terminator::Return)
    }

    pub fn return_void(&mut self) -> Result<()> {
        self.seal_with_terminator(Terminator::Return)
    }

    pub fn unreachable(&mut self) -> Result<()> {
        self.seal_with_terminator(Terminator::Unreachable)
    }

    pub fn is_sealed(&self) -> bool {
        self.function
            .body
            .get_block(self.block_id)
            .map(|block| block.is_terminated())
            .unwrap_or(false)
    }

    pub fn seal_with_terminator(&mut self, terminator: Terminator) -> Result<()> {
        if self.is_sealed() {
            return Err(IrError::BuilderError(format!(
                "Block {} is already terminated",
                self.block_id
            )));
        }

        let block = self
            .function
            .body
            .get_block_mut(self.block_id)
            .ok_or_else(|| IrError::BuilderError(format!("Block {} not found", self.block_id)))?;
        block.set_terminator(terminator);
        Ok(())
    }
}
