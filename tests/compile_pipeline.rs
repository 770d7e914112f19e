//! End-to-end pipeline tests: source text in, SakIR out.

use sakura::config::DumpConfig;
use sakura::shell::compile_source;
use std::io::Write;

fn dump_sakir() -> DumpConfig {
    DumpConfig {
        ast: false,
        sakir: true,
        rawllvm: false,
        llvmir: false,
    }
}

fn sakir_of(source: &str) -> String {
    compile_source(source, &dump_sakir())
        .expect("compile")
        .sakir
        .expect("sakir dump requested")
}

#[test]
fn empty_source_produces_just_the_main_module() {
    let sakir = sakir_of("");
    assert_eq!(sakir, "$__main {\n}\n");
}

#[test]
fn declaration_pipeline_end_to_end() {
    let sakir = sakir_of("let x: int = 42;");
    assert!(sakir.contains("#__init() -> void {"));
    assert!(sakir.contains("@__init.init:"));
    assert!(sakir.contains("constant i32 i32 42"));
    assert!(sakir.contains("declare i32"));
    assert!(sakir.contains("declare.x"));
}

#[test]
fn function_and_call_pipeline_end_to_end() {
    let sakir = sakir_of(
        "func add(a: int, b: int) -> int { return a + b; }\n\
         let total: int = add(1, 2);\n",
    );
    assert!(sakir.contains("#add(a: i32, b: i32) -> i32 {"));
    assert!(sakir.contains("call i32 #add"));
    assert!(sakir.contains("@fn.add:"));
}

#[test]
fn control_flow_block_labels_show_up_in_the_dump() {
    let sakir = sakir_of(
        "func main() -> int {\n\
           let n: int = 0;\n\
           for (let i: int = 0; i < 10; i = i + 1) { n = n + i; }\n\
           while (n > 3) { n = n - 1; }\n\
           if (n == 3) { return 1; } else { return n; }\n\
         }",
    );
    for label in [
        "@for.cond:",
        "@for.body:",
        "@for.step:",
        "@for.merge:",
        "@while.prep:",
        "@while.body:",
        "@while.merge:",
        "@if.then:",
        "@if.else:",
        "@if.merge:",
    ] {
        assert!(sakir.contains(label), "missing {} in:\n{}", label, sakir);
    }
}

#[test]
fn short_circuit_blocks_show_up_in_the_dump() {
    let sakir = sakir_of("func f(x: int) -> bool { let ok: bool = x > 0 && x < 9; return ok; }");
    assert!(sakir.contains("@and.rhs0:"));
    assert!(sakir.contains("@short.cur.merge:"));
    assert!(sakir.contains("declare.tbv.0"));
}

#[test]
fn parse_errors_carry_position_and_stage() {
    let err = compile_source("let = 5;", &DumpConfig::default()).unwrap_err();
    assert_eq!(err.stage, sakura_base::Stage::Parser);
    let pos = err.position.expect("position");
    assert_eq!((pos.line, pos.column), (1, 5));

    let rendered = err.display_with_source("let = 5;");
    assert!(rendered.contains("let = 5;"));
    assert!(rendered.contains("^"));
}

#[test]
fn lex_errors_surface_through_the_pipeline() {
    let err = compile_source("let s: int = \"oops\n;", &DumpConfig::default()).unwrap_err();
    assert_eq!(err.stage, sakura_base::Stage::Lexer);
    assert!(err.message.contains("Unclosed string literal"));
}

#[test]
fn run_file_compiles_from_disk() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "func main() -> int {{ return 0; }}").expect("write");

    sakura::shell::run_file(file.path(), &DumpConfig::default()).expect("run");
}

#[test]
fn run_file_reports_missing_files() {
    let err = sakura::shell::run_file(
        std::path::Path::new("definitely-not-here.sak"),
        &DumpConfig::default(),
    )
    .unwrap_err();
    assert!(!err.to_string().is_empty());
}
