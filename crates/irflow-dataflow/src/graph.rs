use crate::cache::{CacheStatistics, FlowCache};
use crate::config::FlowConfig;
use crate::node::{instruction_node, Node, TypeBoundProvider};
use crate::DataFlowError;
use irflow_core::{Function, FunctionId, InstructionId, Program};

/// Local data-flow view of an immutable [`Program`].
///
/// All queries are pure. Derived structures (step indexes, closures and the
/// per-function analyses guards need) are memoized for the lifetime of the
/// graph, so one graph should be reused across queries.
pub struct DataFlowGraph<'p> {
    pub(crate) program: &'p Program,
    pub(crate) config: FlowConfig,
    pub(crate) cache: FlowCache,
    pub(crate) type_bounds: Option<Box<dyn TypeBoundProvider>>,
}

impl<'p> DataFlowGraph<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self::with_config(program, FlowConfig::default())
    }

    pub fn with_config(program: &'p Program, config: FlowConfig) -> Self {
        Self {
            program,
            config,
            cache: FlowCache::new(),
            type_bounds: None,
        }
    }

    pub fn with_type_bounds(mut self, provider: impl TypeBoundProvider + 'static) -> Self {
        self.type_bounds = Some(Box::new(provider));
        self
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn cache_statistics(&self) -> CacheStatistics {
        self.cache.statistics()
    }

    pub(crate) fn function(&self, id: FunctionId) -> Option<&'p Function> {
        self.program.function(id)
    }

    /// Resolves a function by name for by-name queries.
    pub fn function_named(&self, name: &str) -> Result<&'p Function, DataFlowError> {
        self.program
            .function_by_name(name)
            .ok_or_else(|| DataFlowError::UnknownFunction(name.to_string()))
    }

    /// The node of an instruction that exists in the program.
    pub fn require_node(&self, id: InstructionId) -> Result<Node, DataFlowError> {
        match self.program.instruction(id) {
            Some(_) => Ok(instruction_node(id)),
            None => Err(DataFlowError::UnknownInstruction(id.to_string())),
        }
    }

    /// Parses an instruction reference written as `i12` or `12`.
    pub fn parse_node(&self, text: &str) -> Result<Node, DataFlowError> {
        let text = text.trim();
        let digits = text.strip_prefix('i').unwrap_or(text);
        let id = digits
            .parse::<u32>()
            .map_err(|_| DataFlowError::UnknownInstruction(text.to_string()))?;
        self.require_node(InstructionId(id))
    }
}

impl std::fmt::Debug for DataFlowGraph<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFlowGraph")
            .field("functions", &self.program.functions.len())
            .field("config", &self.config)
            .field("cache", &self.cache.statistics())
            .finish()
    }
}
