use crate::program::Program;
use std::fs;
use std::io;
use std::path::Path;

pub fn save_program(program: &Program, path: impl AsRef<Path>) -> io::Result<()> {
    let json = serde_json::to_string_pretty(program)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    fs::write(path, json)?;
    Ok(())
}

pub fn load_program(path: impl AsRef<Path>) -> io::Result<Program> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)?;
    let program = program_from_json(&json)?;
    tracing::debug!(
        path = %path.display(),
        functions = program.functions.len(),
        "loaded program"
    );
    Ok(program)
}

pub fn program_from_json(json: &str) -> io::Result<Program> {
    serde_json::from_str(json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IRBuilder;
    use crate::types::Type;
    use crate::values::Constant;

    #[test]
    fn test_round_trip_keeps_indexes() {
        let mut builder = IRBuilder::new();
        let mut func = builder.function("answer");
        func.returns(Type::int(32));
        let forty_two = {
            let mut entry = func.entry_block();
            let c = entry.constant(Constant::int(42), Type::int(32));
            let copy = entry.copy(c, Type::int(32));
            entry.return_value(copy).unwrap();
            copy
        };
        func.build().unwrap();
        let program = builder.finish().unwrap();

        let json = serde_json::to_string(&program).unwrap();
        let loaded = program_from_json(&json).unwrap();

        assert!(loaded.function_by_name("answer").is_some());
        let inst = loaded.instruction(forty_two).unwrap();
        assert_eq!(inst.id, forty_two);
        assert_eq!(loaded.stats(), program.stats());
        loaded.validate().unwrap();
    }

    #[test]
    fn test_rejects_instruction_ids_shared_between_functions() {
        let mut builder = IRBuilder::new();
        let mut func = builder.function("a");
        {
            let mut entry = func.entry_block();
            entry.constant_int(1, 32);
            entry.return_void().unwrap();
        }
        func.build().unwrap();
        let program = builder.finish().unwrap();

        let mut value = serde_json::to_value(&program).unwrap();
        let functions = value["functions"].as_object_mut().unwrap();
        let mut twin = functions["0"].clone();
        twin["id"] = serde_json::json!(1);
        twin["signature"]["name"] = serde_json::json!("b");
        for inst in twin["body"]["instructions"]
            .as_object_mut()
            .unwrap()
            .values_mut()
        {
            inst["function"] = serde_json::json!(1);
        }
        functions.insert("1".to_string(), twin);

        let err = program_from_json(&value.to_string()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("more than one function"));
    }

    #[test]
    fn test_rejects_function_stored_under_other_id() {
        let mut builder = IRBuilder::new();
        let mut func = builder.function("a");
        func.entry_block().return_void().unwrap();
        func.build().unwrap();
        let program = builder.finish().unwrap();

        let mut value = serde_json::to_value(&program).unwrap();
        let functions = value["functions"].as_object_mut().unwrap();
        let function = functions.remove("0").unwrap();
        functions.insert("4".to_string(), function);

        assert!(program_from_json(&value.to_string()).is_err());
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = program_from_json("{\"functions\": 3}").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
