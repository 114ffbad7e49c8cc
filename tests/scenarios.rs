use std::sync::Mutex;

use indoc::indoc;
use linewise::analysis::{DispatchMode, EdgeKind, InitRequirement, ResourceTable, ValidationError, Warning};
use linewise::emit::{
    Compilation, CompileError, CompileOptions, Compiler, EchoTranslator, EmittedProgram, Translation,
    TranslateError, TranslationRequest, Translator,
};
use linewise::lang::LineNumber;
use linewise::runtime::{ExecutionTrace, Machine, RuntimeError, RuntimeFailure, ShapeExecutor};

fn compile(source: &str) -> Compilation {
    Compiler::new()
        .compile(source, &EchoTranslator)
        .expect("compile failed")
}

fn compile_err(source: &str) -> CompileError {
    Compiler::new()
        .compile(source, &EchoTranslator)
        .expect_err("expected compile error")
}

fn run(program: &EmittedProgram, executor: &mut ShapeExecutor) -> Result<ExecutionTrace, RuntimeFailure> {
    Machine::new().run(program, executor)
}

#[test]
fn goto_skips_intermediate_line() {
    let source = indoc! {r#"
        10 goto 40
        20 print "skip"
        40 print "here"
    "#};

    let analysis = Compiler::new().analyze(source).expect("analysis failed");
    let edges: Vec<_> = analysis.graph.edges().iter().map(|e| (e.from, e.to, e.kind)).collect();
    assert_eq!(edges, vec![(10, 40, EdgeKind::Jump)]);
    assert_eq!(analysis.mode, DispatchMode::Dispatch);

    let program = compile(source).program;
    let trace = run(&program, &mut ShapeExecutor::new()).expect("run failed");
    assert_eq!(trace.visited, vec![10, 40]);
    assert!(!trace.visited.contains(&20));
}

#[test]
fn call_resumes_after_call_site() {
    let source = indoc! {r#"
        10 call 100
        20 print "after"
        100 print "sub"
        110 return
    "#};

    let compilation = compile(source);
    assert!(compilation.warnings.is_empty());

    // after resuming at 20 the program falls into the subroutine again and
    // its return finds an empty stack
    let failure = run(&compilation.program, &mut ShapeExecutor::new()).expect_err("expected failure");
    assert_eq!(failure.visited, vec![10, 100, 110, 20, 100, 110]);
    assert_eq!(failure.error, RuntimeError::UnbalancedReturn { line: 110 });
}

#[test]
fn nested_calls_unwind_in_lifo_order() {
    let source = indoc! {"
        10 gosub 100
        20 print back in main
        30 goto 999
        100 call 200
        110 return
        200 call 300
        210 return
        300 call 400
        310 return
        400 print depth four
        410 return
        999 print done
    "};

    let program = compile(source).program;
    let trace = run(&program, &mut ShapeExecutor::new()).expect("run failed");

    assert_eq!(
        trace.visited,
        vec![10, 100, 200, 300, 400, 410, 310, 210, 110, 20, 30, 999]
    );
}

#[test]
fn construct_free_programs_are_linear() {
    let programs = [
        "10 print hello",
        "10 (redis) load the cart\n20 print total\n30 return the value to the user",
        "10 call the api\n20 go to the store\n30 print \"goto 10\"",
    ];

    for source in programs {
        let analysis = Compiler::new().analyze(source).expect("analysis failed");
        assert!(analysis.graph.is_empty(), "{}", source);
        assert_eq!(analysis.mode, DispatchMode::Linear, "{}", source);
    }
}

#[test]
fn any_single_construct_selects_dispatch() {
    let programs = [
        "10 print a\n20 print b\n30 goto 10",
        "10 print a\n20 if done then goto 10",
        "10 call 20\n20 print b",
        "10 on error goto 20\n20 print b",
    ];

    for source in programs {
        let analysis = Compiler::new().analyze(source).expect("analysis failed");
        assert_eq!(analysis.mode, DispatchMode::Dispatch, "{}", source);
    }
}

#[test]
fn every_unresolved_target_is_reported() {
    let err = compile_err(indoc! {"
        10 goto 99
        20 call 77
        30 if x > 1 then goto 55
        40 on error goto 66
        50 print fine
    "});

    let errors = err.validation_errors();
    assert_eq!(errors.len(), 4);
    for expected in [
        ValidationError::UnresolvedTarget { line: 10, target: 99, kind: EdgeKind::Jump },
        ValidationError::UnresolvedTarget { line: 20, target: 77, kind: EdgeKind::Call },
        ValidationError::UnresolvedTarget {
            line: 30,
            target: 55,
            kind: EdgeKind::ConditionalJump,
        },
        ValidationError::UnresolvedTarget { line: 40, target: 66, kind: EdgeKind::ErrorHandler },
    ] {
        assert!(errors.contains(&expected), "missing {:?}", expected);
    }
}

#[test]
fn classification_and_target_errors_are_reported_together() {
    let err = compile_err(indoc! {"
        10 goto 20 and call 30
        20 goto 99
        30 jump to 99999999999
        40 print ok
    "});

    assert_eq!(
        err.validation_errors(),
        &[
            ValidationError::AmbiguousControl {
                line: 10,
                cues: vec!["goto".to_string(), "call".to_string()],
            },
            ValidationError::UnresolvedTarget { line: 20, target: 99, kind: EdgeKind::Jump },
            ValidationError::TargetOutOfRange {
                line: 30,
                target: 99_999_999_999,
                kind: EdgeKind::Jump,
            },
        ]
    );
}

#[test]
fn resources_are_hoisted_to_first_textual_use() {
    let source = indoc! {"
        10 goto 40
        20 (redis) warm the cache
        30 (pg) load orders
        40 (cache) read the cart
        50 (postgres) save the order
        60 (smtp) send receipt
    "};

    let analysis = Compiler::new().analyze(source).expect("analysis failed");
    let context = &analysis.context;

    let keys: Vec<_> = context.entries.iter().map(|e| (e.resource_key.as_str(), e.first_use_line)).collect();
    assert_eq!(keys, vec![("redis", 20), ("postgres", 30), ("smtp", 60)]);

    let first = |key: &str| InitRequirement::FirstUse { resource_key: key.to_string() };
    let reuse = |key: &str| InitRequirement::Reuse { resource_key: key.to_string() };
    assert_eq!(context.requirement(10), &InitRequirement::None);
    assert_eq!(context.requirement(20), &first("redis"));
    assert_eq!(context.requirement(30), &first("postgres"));
    assert_eq!(context.requirement(40), &reuse("redis"));
    assert_eq!(context.requirement(50), &reuse("postgres"));
    assert_eq!(context.requirement(60), &first("smtp"));
}

#[test]
fn injected_resource_table_extends_vocabulary() {
    let mut table = ResourceTable::builtin();
    table.extend(
        ResourceTable::from_json(r#"{"aliases": {"vectors": "qdrant", "embeddings": "qdrant"}}"#)
            .expect("valid table"),
    );

    let compiler = Compiler::with_options(CompileOptions {
        resource_table: table,
        ..CompileOptions::default()
    });
    let analysis = compiler
        .analyze("10 (vectors) index docs\n20 (embeddings) query")
        .expect("analysis failed");

    assert_eq!(analysis.context.entries.len(), 1);
    assert_eq!(analysis.context.entries[0].resource_key, "qdrant");
    assert_eq!(
        analysis.context.requirement(20),
        &InitRequirement::Reuse { resource_key: "qdrant".to_string() }
    );
}

#[test]
fn unreachable_return_warns_but_is_fatal_when_hit() {
    let source = "10 goto 20\n20 return\n30 print never";

    let compilation = compile(source);
    assert_eq!(compilation.warnings, vec![Warning::UnreachableReturn { line: 20 }]);

    let failure = run(&compilation.program, &mut ShapeExecutor::new()).expect_err("expected failure");
    assert_eq!(failure.error, RuntimeError::UnbalancedReturn { line: 20 });
}

#[test]
fn unreachable_return_in_linear_program() {
    let compilation = compile("10 print start\n20 return");
    assert_eq!(compilation.program.mode, DispatchMode::Linear);
    assert_eq!(compilation.warnings, vec![Warning::UnreachableReturn { line: 20 }]);

    let failure = run(&compilation.program, &mut ShapeExecutor::new()).expect_err("expected failure");
    assert_eq!(failure.error, RuntimeError::UnbalancedReturn { line: 20 });
}

#[test]
fn handler_set_twice_to_same_target() {
    let program = compile(indoc! {"
        10 on error goto 50
        20 on error goto 50
        30 (http) call the payment api
        40 goto 60
        50 print handled
        60 print done
    "})
    .program;

    let trace = run(&program, &mut ShapeExecutor::new().fail_once(30)).expect("run failed");
    assert_eq!(trace.visited, vec![10, 20, 30, 50, 60]);
    assert_eq!(trace.error_handler, Some(50));
}

#[test]
fn handler_override_wins() {
    let program = compile(indoc! {"
        10 on error goto 50
        20 on error goto 60
        30 risky
        50 print old handler
        60 print new handler
    "})
    .program;

    let trace = run(&program, &mut ShapeExecutor::new().fail_once(30)).expect("run failed");
    assert_eq!(trace.visited, vec![10, 20, 30, 60]);
    let fault = trace.last_fault.expect("fault published");
    assert_eq!(fault.line, 30);
}

#[test]
fn fault_before_any_handler_is_fatal() {
    let program = compile(indoc! {"
        10 risky
        20 on error goto 40
        30 print ok
        40 print handled
    "})
    .program;

    let failure = run(&program, &mut ShapeExecutor::new().fail_once(10)).expect_err("expected failure");
    assert!(matches!(failure.error, RuntimeError::UnhandledFault { line: 10, .. }));
    assert_eq!(failure.visited, vec![10]);
}

#[test]
fn conditional_loop_under_simulation() {
    let program = compile(indoc! {"
        10 (queue) poll for a message
        20 if queue is empty then goto 10
        30 print got one
    "})
    .program;

    let mut polls = 0;
    let mut executor = ShapeExecutor::with_predicate(move |line: LineNumber, _: &str| {
        assert_eq!(line, 20);
        polls += 1;
        polls < 3
    });

    let trace = Machine::new().run(&program, &mut executor).expect("run failed");
    assert_eq!(trace.visited, vec![10, 20, 10, 20, 10, 20, 30]);
}

#[test]
fn artifact_round_trip_runs_identically() {
    let program = compile("10 call 30\n20 goto 40\n30 return\n40 print end").program;

    let bytes = program.to_bytes().expect("serialize");
    let loaded = EmittedProgram::from_bytes(&bytes).expect("deserialize");
    assert_eq!(loaded, program);

    let before = run(&program, &mut ShapeExecutor::new()).expect("run failed");
    let after = run(&loaded, &mut ShapeExecutor::new()).expect("run failed");
    assert_eq!(before, after);
    assert_eq!(after.visited, vec![10, 30, 20, 40]);
}

struct ContextRecorder {
    seen: Mutex<Vec<(LineNumber, Option<LineNumber>, DispatchMode)>>,
}

impl Translator for ContextRecorder {
    fn translate(&self, request: &TranslationRequest<'_>) -> Result<Translation, TranslateError> {
        self.seen
            .lock()
            .expect("lock")
            .push((request.line.number, request.successor, request.mode()));
        Ok(Translation::new(vec![format!("# {}", request.line.number)]))
    }
}

#[test]
fn parallel_translation_joins_in_line_order() {
    let source = indoc! {"
        30 print c
        10 print a
        20 goto 30
        40 print d
    "};

    let recorder = ContextRecorder { seen: Mutex::new(Vec::new()) };
    let parallel = Compiler::new().compile(source, &recorder).expect("compile failed");

    let numbers: Vec<_> = parallel.program.blocks.iter().map(|b| b.number()).collect();
    assert_eq!(numbers, vec![10, 20, 30, 40]);

    let mut seen = recorder.seen.into_inner().expect("lock");
    seen.sort_by_key(|(line, _, _)| *line);
    assert_eq!(
        seen,
        vec![
            (10, Some(20), DispatchMode::Dispatch),
            (20, Some(30), DispatchMode::Dispatch),
            (30, Some(40), DispatchMode::Dispatch),
            (40, None, DispatchMode::Dispatch),
        ]
    );

    let sequential = Compiler::with_options(CompileOptions {
        parallel: false,
        ..CompileOptions::default()
    })
    .compile(source, &EchoTranslator)
    .expect("compile failed");
    let echoed = compile(source);
    assert_eq!(sequential.program, echoed.program);
}

struct TimingOut(LineNumber);

impl Translator for TimingOut {
    fn translate(&self, request: &TranslationRequest<'_>) -> Result<Translation, TranslateError> {
        if request.line.number == self.0 {
            return Err(TranslateError::Timeout(std::time::Duration::from_secs(30)));
        }
        EchoTranslator.translate(request)
    }
}

#[test]
fn one_failed_translation_fails_the_program() {
    let err = Compiler::new()
        .compile("10 print a\n20 print b\n30 print c", &TimingOut(20))
        .expect_err("expected failure");

    assert!(matches!(
        err,
        CompileError::Translation { line: 20, source: TranslateError::Timeout(_) }
    ));
}
