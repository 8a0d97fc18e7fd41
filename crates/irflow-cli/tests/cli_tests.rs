use assert_cmd::Command;
use irflow_core::{ir_persist::save_program, CompareOp, IRBuilder, InstructionId, Type};
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    path: PathBuf,
    param: InstructionId,
    guarded_copy: InstructionId,
    exit_copy: InstructionId,
}

/// `check(x) { if (x > 0) { y = x; } z = x; }`
fn write_fixture() -> Fixture {
    let mut builder = IRBuilder::new();
    let mut func = builder.function("check");
    func.param("x", Type::int(32));
    let then_block = func.create_block_id();
    let exit = func.create_block_id();

    let param = {
        let mut entry = func.entry_block();
        let x = entry.init_param(0).unwrap();
        let zero = entry.constant_int(0, 32);
        let cond = entry.compare(CompareOp::Gt, x, zero);
        entry.branch(cond, then_block, exit).unwrap();
        x
    };
    let guarded_copy = {
        let mut b = func.switch_to_block(then_block).unwrap();
        let y = b.copy(param, Type::int(32));
        b.jump(exit).unwrap();
        y
    };
    let exit_copy = {
        let mut b = func.switch_to_block(exit).unwrap();
        let z = b.copy(param, Type::int(32));
        b.return_void().unwrap();
        z
    };
    func.build().unwrap();
    let program = builder.finish().unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("check.json");
    save_program(&program, &path).unwrap();
    Fixture {
        _dir: dir,
        path,
        param,
        guarded_copy,
        exit_copy,
    }
}

fn irflow() -> Command {
    Command::cargo_bin("irflow").unwrap()
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_validate_single_file() {
    let fixture = write_fixture();
    irflow()
        .args(["validate", arg(&fixture.path)])
        .assert()
        .success()
        .stdout(predicate::str::contains("VALID"));
}

#[test]
fn test_validate_directory_reports_broken_program() {
    let fixture = write_fixture();
    let dir = fixture.path.parent().unwrap();
    std::fs::write(dir.join("broken.json"), "{ not json").unwrap();
    std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

    irflow()
        .args(["validate", arg(dir)])
        .assert()
        .failure()
        .stdout(predicate::str::contains("INVALID"))
        .stdout(predicate::str::contains("broken.json"))
        .stdout(predicate::str::contains("notes.txt").not());
}

#[test]
fn test_flow_query() {
    let fixture = write_fixture();
    let from = fixture.param.to_string();
    let to = fixture.exit_copy.to_string();

    irflow()
        .args(["flow", arg(&fixture.path), "--from", &from, "--to", &to])
        .assert()
        .success()
        .stdout(predicate::str::contains("FLOWS"));

    irflow()
        .args(["flow", arg(&fixture.path), "--from", &to, "--to", &from])
        .assert()
        .success()
        .stdout(predicate::str::contains("NO FLOW"));
}

#[test]
fn test_flow_rejects_unknown_instruction() {
    let fixture = write_fixture();
    irflow()
        .args(["flow", arg(&fixture.path), "--from", "i999", "--to", "i0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("i999"));
}

#[test]
fn test_reach_lists_both_copies() {
    let fixture = write_fixture();
    irflow()
        .args(["reach", arg(&fixture.path), "--from", &fixture.param.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("reaches 3 node(s)"));
}

#[test]
fn test_guards_only_report_dominated_use() {
    let fixture = write_fixture();
    let output = irflow()
        .args(["guards", arg(&fixture.path), "--checked", &fixture.param.to_string()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();

    assert!(stdout.contains("1 guarded node(s)"));
    assert!(stdout.contains(&fixture.guarded_copy.to_string()));
    assert!(!stdout.contains(&format!(" {} ", fixture.exit_copy)));
}

#[test]
fn test_nodes_with_config() {
    let fixture = write_fixture();
    let config = fixture.path.with_file_name("flow.json");
    std::fs::write(&config, r#"{ "partial_chi": "never" }"#).unwrap();

    irflow()
        .args(["nodes", arg(&fixture.path), "--function", "check"])
        .args(["--config", arg(&config)])
        .assert()
        .success()
        .stdout(predicate::str::contains("function check"))
        .stdout(predicate::str::contains("param"));

    irflow()
        .args(["nodes", arg(&fixture.path), "--function", "missing"])
        .assert()
        .failure();
}
