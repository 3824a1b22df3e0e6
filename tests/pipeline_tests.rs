//! End-to-end runs through the whole pipeline.

mod test_harness;

use std::fs;

use tempdir::TempDir;

use sprig::{
    EngineKind, GenericValue, InstructionEmitter, Module, Pipeline, PipelineConfig, PipelineError,
    programs,
};
use sprig_core::{EngineError, Linkage, SerializeError, VerifyCheck, primitives};
use test_harness::{SharedOutput, Skeleton};

fn config_in(dir: &TempDir) -> PipelineConfig {
    PipelineConfig::default()
        .with_output_path(dir.path().join("test.ll"))
        .with_dump_module(false)
}

#[test]
fn test_hello_world_prints_result() {
    let dir = TempDir::new("sprig-pipeline").unwrap();
    let config = config_in(&dir);
    let out = SharedOutput::new();

    let report = Pipeline::new(config.clone())
        .output(out.clone())
        .run_program(programs::hello_world)
        .unwrap();

    assert_eq!(out.text(), "Hello World: 1337!\n");
    assert_eq!(report.result, GenericValue::Void);
    assert!(report.diagnostic.is_passed());
    assert_eq!(fs::read_to_string(&config.output_path).unwrap(), report.ir);
    assert!(report.ir.contains("%result = add i32 0, 1337"));
}

#[test]
fn test_greeting_prints_literal() {
    let dir = TempDir::new("sprig-pipeline").unwrap();
    let out = SharedOutput::new();

    let report = Pipeline::new(config_in(&dir))
        .output(out.clone())
        .run_program(programs::greeting)
        .unwrap();

    assert_eq!(out.text(), "Hello World!");
    assert!(report.result.is_void());
}

#[test]
fn test_hello_world_ir_file() {
    let dir = TempDir::new("sprig-pipeline").unwrap();
    let config = config_in(&dir);
    Pipeline::new(config.clone())
        .output(SharedOutput::new())
        .run_program(programs::hello_world)
        .unwrap();

    let expected = "\
; ModuleID = 'test'
source_filename = \"test\"

@fmtStr = private unnamed_addr constant [18 x i8] c\"Hello World: %d!\\0A\\00\", align 1

define void @main() {
entrypoint:
  %result = add i32 0, 1337
  %0 = call i32 (i8*, ...) @printf(i8* getelementptr inbounds ([18 x i8], [18 x i8]* @fmtStr, i32 0, i32 0), i32 %result)
  ret void
}

declare i32 @printf(i8*, ...)
";
    assert_eq!(fs::read_to_string(&config.output_path).unwrap(), expected);
}

#[test]
fn test_unverified_module_is_not_written_or_run() {
    let dir = TempDir::new("sprig-pipeline").unwrap();
    let config = config_in(&dir);
    let out = SharedOutput::new();

    // Entry block left without a terminator.
    let s = Skeleton::new();
    let err = Pipeline::new(config.clone())
        .output(out.clone())
        .run(s.module)
        .unwrap_err();

    match &err {
        PipelineError::Verification(e) => {
            let diag = e.diagnostic();
            assert_eq!(diag.failed_check(), Some(VerifyCheck::Terminators));
            assert_eq!(diag.messages()[0].block.as_deref(), Some("entrypoint"));
        }
        other => panic!("expected verification failure, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 2);
    assert!(!config.output_path.exists());
    assert!(out.text().is_empty());
}

#[test]
fn test_unwritable_output_path() {
    let dir = TempDir::new("sprig-pipeline").unwrap();
    let config = config_in(&dir).with_output_path(dir.path().join("missing/test.ll"));
    let out = SharedOutput::new();

    let err = Pipeline::new(config)
        .output(out.clone())
        .run_program(programs::hello_world)
        .unwrap_err();

    assert!(matches!(err, PipelineError::Io(SerializeError::Io { .. })));
    assert_eq!(err.exit_code(), 3);
    assert!(out.text().is_empty());
}

#[test]
fn test_jit_request_fails_to_build() {
    let dir = TempDir::new("sprig-pipeline").unwrap();
    let config = config_in(&dir).with_engine_kind(EngineKind::Jit);

    let err = Pipeline::new(config.clone())
        .output(SharedOutput::new())
        .run_program(programs::hello_world)
        .unwrap_err();

    assert!(matches!(err, PipelineError::Engine(EngineError::Build { .. })));
    assert_eq!(err.exit_code(), 4);
    // Serialization precedes the engine.
    assert!(config.output_path.exists());
}

#[test]
fn test_construction_error_exit_code() {
    let dir = TempDir::new("sprig-pipeline").unwrap();
    let err = Pipeline::new(config_in(&dir))
        .run_program(|config| {
            let mut module = programs::greeting(config)?;
            module.global_string("again", "greeting")?;
            Ok(module)
        })
        .unwrap_err();
    assert!(matches!(err, PipelineError::Construction(_)));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_missing_entry_point() {
    let dir = TempDir::new("sprig-pipeline").unwrap();
    let config = config_in(&dir);
    let err = Pipeline::new(config)
        .run_program(|config| {
            let mut module = programs::greeting(config)?;
            module.set_entry_point("start");
            Ok(module)
        })
        .unwrap_err();
    match err {
        PipelineError::Verification(e) => {
            assert_eq!(e.diagnostic().failed_check(), Some(VerifyCheck::EntryPoint));
        }
        other => panic!("expected verification failure, got {other:?}"),
    }
}

#[test]
fn test_entry_contract_checked_without_designation() {
    let dir = TempDir::new("sprig-pipeline").unwrap();
    let config = config_in(&dir);

    // `i32 main(i32)`, well formed but not runnable as an entry point.
    let mut m = Module::new("test");
    let main = m
        .create_function("main", primitives::I32, vec![primitives::I32], Linkage::External)
        .unwrap();
    let entry = m.create_block(main, "entrypoint").unwrap();
    let x = m.param(main, 0).unwrap();
    let mut e = InstructionEmitter::new(&mut m);
    e.position_at_end(entry).unwrap();
    e.ret(x).unwrap();

    let err = Pipeline::new(config.clone())
        .output(SharedOutput::new())
        .run(m)
        .unwrap_err();
    match &err {
        PipelineError::Verification(e) => {
            assert_eq!(e.diagnostic().failed_check(), Some(VerifyCheck::EntryPoint));
            assert!(e.diagnostic().messages()[0].message.contains("i32 (i32)"));
        }
        other => panic!("expected verification failure, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 2);
    assert!(!config.output_path.exists());
}

#[test]
fn test_designated_entry_must_match_config() {
    let dir = TempDir::new("sprig-pipeline").unwrap();
    let config = config_in(&dir).with_entry_point("start");

    // Designates `main`, which is well formed, while the pipeline runs `start`.
    let err = Pipeline::new(config.clone())
        .output(SharedOutput::new())
        .run(programs::greeting(&PipelineConfig::default()).unwrap())
        .unwrap_err();
    match &err {
        PipelineError::Verification(e) => {
            assert_eq!(e.diagnostic().failed_check(), Some(VerifyCheck::EntryPoint));
        }
        other => panic!("expected verification failure, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 2);
    assert!(!config.output_path.exists());
}

#[test]
fn test_undesignated_entry_runs_configured_function() {
    let dir = TempDir::new("sprig-pipeline").unwrap();
    let out = SharedOutput::new();

    let report = Pipeline::new(config_in(&dir))
        .output(out.clone())
        .run_program(|config| {
            let mut module = Module::new(&config.module_name);
            let main =
                module.create_function("main", primitives::VOID, vec![], Linkage::External)?;
            let entry = module.create_block(main, "entrypoint")?;
            let puts = module.declare_external(
                "puts",
                primitives::I32,
                vec![primitives::I8_PTR],
                false,
            )?;
            let text = module.global_string("ok", "text")?;
            let mut e = InstructionEmitter::new(&mut module);
            e.position_at_end(entry)?;
            e.call(puts, &[text], "")?;
            e.ret_void()?;
            Ok(module)
        })
        .unwrap();
    assert_eq!(out.text(), "ok\n");
    assert!(report.result.is_void());
}
