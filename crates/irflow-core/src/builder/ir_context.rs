use crate::values::{ExprId, FunctionId, InstructionId};
use std::collections::HashMap;

/// Id allocation shared by every function built from one [`super::IRBuilder`],
/// so instruction and expression ids are unique program-wide.
#[derive(Debug, Default)]
pub struct IRContext {
    next_instruction: u32,
    next_expr: u32,
    next_function: u32,
    declared: HashMap<String, FunctionId>,
    current_function: Option<String>,
    errors: Vec<String>,
}

impl IRContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_instruction_id(&mut self) -> InstructionId {
        let id = InstructionId(self.next_instruction);
        self.next_instruction += 1;
        id
    }

    pub fn next_expr_id(&mut self) -> ExprId {
        let id = ExprId(self.next_expr);
        self.next_expr += 1;
        id
    }

    /// Returns the id reserved for `name`, reserving one on first use.
    pub fn function_id(&mut self, name: &str) -> FunctionId {
        if let Some(&id) = self.declared.get(name) {
            return id;
        }
        let id = FunctionId(self.next_function);
        self.next_function += 1;
        self.declared.insert(name.to_string(), id);
        id
    }

    pub fn declared_functions(&self) -> impl Iterator<Item = (&String, &FunctionId)> {
        self.declared.iter()
    }

    pub fn set_current_function(&mut self, name: String) {
        self.current_function = Some(name);
    }

    pub fn current_function(&self) -> Option<&str> {
        self.current_function.as_deref()
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
