use crate::block::{BlockId, Terminator};
use crate::builder::IRBuilder;
use crate::function::{Function, FunctionSignature};
use crate::instructions::{CallTarget, Instruction, InstructionKind};
use crate::program::{Program, ProgramStats};
use crate::types::Type;
use crate::values::{FunctionId, InstructionId, SourceLocation};
use crate::IrError;
use pretty_assertions::assert_eq;

fn single_return(id: u32, name: &str, inst: u32) -> Function {
    let mut function = Function::new(FunctionId(id), FunctionSignature::new(name));
    let entry = function.entry_block();
    let inst_id = InstructionId(inst);
    function.body.instructions.insert(
        inst_id,
        Instruction {
            id: inst_id,
            function: FunctionId(id),
            block: entry,
            kind: InstructionKind::Return { value: None },
            result_type: Type::Void,
            expr: None,
            location: SourceLocation::default(),
        },
    );
    if let Some(block) = function.body.get_block_mut(entry) {
        block.add_instruction(inst_id);
        block.set_terminator(Terminator::Return);
    }
    function
}

#[test]
fn test_add_function_rejects_duplicates() {
    let mut program = Program::new();
    program.add_function(single_return(0, "a", 0)).unwrap();

    assert!(program.add_function(single_return(0, "b", 1)).is_err());
    assert!(program.add_function(single_return(1, "a", 2)).is_err());
    assert!(program.add_function(single_return(2, "c", 0)).is_err());
    program.add_function(single_return(3, "d", 3)).unwrap();

    assert_eq!(
        program.stats(),
        ProgramStats {
            functions: 2,
            blocks: 2,
            instructions: 2,
            exprs: 0,
        }
    );
}

#[test]
fn test_require_function() {
    let mut program = Program::new();
    program.add_function(single_return(0, "main", 0)).unwrap();

    assert!(program.require_function("main").is_ok());
    assert!(matches!(
        program.require_function("nope"),
        Err(IrError::FunctionNotFound(name)) if name == "nope"
    ));
}

#[test]
fn test_validate_rejects_unterminated_block() {
    let mut program = Program::new();
    let mut function = single_return(0, "open", 0);
    function.body.create_block();
    program.add_function(function).unwrap();

    let err = program.validate().unwrap_err();
    assert!(err.to_string().contains("has no terminator"));
}

#[test]
fn test_validate_rejects_missing_successor() {
    let mut program = Program::new();
    let mut function = single_return(0, "jumpy", 0);
    let entry = function.entry_block();
    if let Some(block) = function.body.get_block_mut(entry) {
        block.set_terminator(Terminator::Jump(BlockId(7)));
    }
    program.add_function(function).unwrap();

    assert!(program.validate().is_err());
}

#[test]
fn test_validate_rejects_cross_function_operand() {
    let mut builder = IRBuilder::new();
    let foreign = {
        let mut func = builder.function("owner");
        let c = {
            let mut entry = func.entry_block();
            let c = entry.constant_int(5, 32);
            entry.return_value(c).unwrap();
            c
        };
        func.build().unwrap();
        c
    };
    {
        let mut func = builder.function("thief");
        {
            let mut entry = func.entry_block();
            let stolen = entry.copy(foreign, Type::int(32));
            entry.return_value(stolen).unwrap();
        }
        func.build().unwrap();
    }

    let err = builder.finish().unwrap_err();
    assert!(err.to_string().contains("uses"));
}

#[test]
fn test_validate_rejects_missing_static_callee() {
    let mut builder = IRBuilder::new();
    let mut func = builder.function("caller");
    {
        let mut entry = func.entry_block();
        entry.call(CallTarget::Static(FunctionId(77)), vec![], None, Type::Void);
        entry.return_void().unwrap();
    }
    func.build().unwrap();

    let err = builder.finish().unwrap_err();
    assert!(err.to_string().contains("calls missing function"));
}

#[test]
fn test_validate_rejects_instruction_in_wrong_block() {
    let mut program = Program::new();
    let mut function = single_return(0, "moved", 0);
    let other = function.body.create_block();
    if let Some(block) = function.body.get_block_mut(other) {
        block.set_terminator(Terminator::Return);
    }
    if let Some(inst) = function.body.instructions.get_mut(&InstructionId(0)) {
        inst.block = other;
    }
    program.add_function(function).unwrap();

    let err = program.validate().unwrap_err();
    assert!(err.to_string().contains("claims"));
}

#[test]
fn test_validate_rejects_unlisted_instruction() {
    let mut program = Program::new();
    let mut function = single_return(0, "hidden", 0);
    let entry = function.entry_block();
    function.body.instructions.insert(
        InstructionId(1),
        Instruction {
            id: InstructionId(1),
            function: FunctionId(0),
            block: entry,
            kind: InstructionKind::Return { value: None },
            result_type: Type::Void,
            expr: None,
            location: SourceLocation::default(),
        },
    );
    program.add_function(function).unwrap();

    let err = program.validate().unwrap_err();
    assert!(err.to_string().contains("not listed in any block"));
}

#[test]
fn test_validate_rejects_renamed_function() {
    let mut program = Program::new();
    program.add_function(single_return(0, "a", 0)).unwrap();
    program.add_function(single_return(1, "b", 1)).unwrap();
    if let Some(function) = program.functions.get_mut(&FunctionId(1)) {
        function.signature.name = "a".to_string();
    }

    let err = program.validate().unwrap_err();
    assert!(err.to_string().contains("shared with another function"));
}
