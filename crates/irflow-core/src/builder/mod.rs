/*! Fluent API for constructing IR programmatically.
 *
 * Hand-wiring instruction graphs is tedious and error-prone. These builders allocate program-wide
 * instruction and expression ids, record source locations, and keep every instruction attached to
 * the block and function it was emitted into.
 */

pub mod block_builder;
pub mod function_builder;
pub mod ir_context;

pub use block_builder::BlockBuilder;
pub use function_builder::FunctionBuilder;
pub use ir_context::IRContext;

use crate::program::{Program, ProgramStats};
use crate::values::FunctionId;
use crate::{IrError, Result};

pub struct IRBuilder {
    context: IRContext,
    program: Program,
}

impl IRBuilder {
    pub fn new() -> Self {
        Self {
            context: IRContext::new(),
            program: Program::new(),
        }
    }

    /// Reserves an id for a function that will be built later, so calls can
    /// target it before its body exists.
    pub fn declare(&mut self, name: &str) -> FunctionId {
        self.context.function_id(name)
    }

    pub fn function(&mut self, name: &str) -> FunctionBuilder<'_> {
        self.context.set_current_function(name.to_string());
        let id = self.context.function_id(name);
        FunctionBuilder::new(id, name.to_string(), &mut self.context, &mut self.program)
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn context(&self) -> &IRContext {
        &self.context
    }

    pub fn validate(&self) -> Result<()> {
        if self.context.has_errors() {
            return Err(IrError::BuilderError(format!(
                "IR building errors: {:?}",
                self.context.errors()
            )));
        }

        for (name, id) in self.context.declared_functions() {
            if self.program.function(*id).is_none() {
                return Err(IrError::BuilderError(format!(
                    "Function {} was declared but never built",
                    name
                )));
            }
        }

        self.program.validate()
    }

    /// Validates and returns the finished program.
    pub fn finish(self) -> Result<Program> {
        self.validate()?;
        let stats = self.program.stats();
        tracing::debug!(
            functions = stats.functions,
            instructions = stats.instructions,
            "finished building program"
        );
        Ok(self.program)
    }

    pub fn clear(&mut self) {
        self.context.clear();
        self.program = Program::new();
    }

    pub fn stats(&self) -> ProgramStats {
        self.program.stats()
    }
}

impl Default for IRBuilder {
    fn default() -> Self {
        Self::new()
    }
}
