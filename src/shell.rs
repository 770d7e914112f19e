//! The interactive shell.
//!
//! Three commands:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `help`  | Print the command summary. |
//! | `run <file> [-ast] [-sakir] [-rawllvm] [-llvmir]` | Compile the file, printing the requested dumps. |
//! | `exit`  | Leave the shell. |
//!
//! Each command runs inside a catch loop: a compile error is printed with
//! its source context and the shell prompts again.

use crate::config::{Config, DumpConfig};
use sakura_base::{CompileError, Stage};
use sakura_ir::builder::IrBuilder;
use sakura_ir::display::render_program;
use sakura_ir::types::TypeInterner;
use sakura_syntax::parser::{parse_statement, Cursor, Status};
use sakura_syntax::{Lexer, TokenKind};
use std::io::{BufRead, Write};

const HELP: &str = "\
Commands:
  help                                     Show this text.
  run <file> [-ast] [-sakir] [-rawllvm] [-llvmir]
                                           Compile a source file. Flags print
                                           the named intermediate form.
  exit                                     Leave the shell.
";

/// Everything a `run` produced, ready for printing.
#[derive(Debug)]
pub struct CompileOutput {
    pub ast_dumps: Vec<String>,
    pub sakir: Option<String>,
    pub notes: Vec<String>,
}

/// Lex → parse (one statement at a time) → build IR.
pub fn compile_source(source: &str, dump: &DumpConfig) -> Result<CompileOutput, CompileError> {
    let tokens = Lexer::new(source).tokenize();
    log::debug!("lexed {} token(s)", tokens.len());

    let arena = bumpalo::Bump::new();
    let types = TypeInterner::new(&arena);
    let mut builder = IrBuilder::new(&types, "__main");

    let mut ast_dumps = Vec::new();
    let mut cursor = Cursor::new(&tokens);
    while let Some(token) = cursor.peek() {
        if token.kind == TokenKind::Eof {
            break;
        }
        let outcome = parse_statement(cursor);
        if outcome.status != Status::Success {
            return Err(outcome
                .error
                .unwrap_or_else(|| CompileError::new(Stage::Parser, "Unexpected token")));
        }
        let rest = outcome.rest;
        let node = match outcome.into_node() {
            Some(node) => node,
            None => return Err(CompileError::new(Stage::System, "Parser produced no tree")),
        };
        if dump.ast {
            ast_dumps.push(node.to_pretty());
        }
        builder.visit_toplevel(&node)?;
        cursor = rest;
    }
    builder.finish()?;

    let sakir = dump
        .sakir
        .then(|| render_program(&builder.program, &builder.consts));

    let mut notes = Vec::new();
    if dump.rawllvm || dump.llvmir {
        notes.push(
            "note: no native backend is linked in this build; -rawllvm/-llvmir are unavailable"
                .to_string(),
        );
    }
    Ok(CompileOutput {
        ast_dumps,
        sakir,
        notes,
    })
}

/// Compiles one file with the given dump settings, printing the results.
pub fn run_file(
    file: &std::path::Path,
    dump: &DumpConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(file)?;
    match compile_source(&source, dump) {
        Ok(output) => {
            print_output(&output);
            println!("Compiled '{}' successfully.", file.display());
            Ok(())
        }
        Err(err) => Err(err.display_with_source(&source).into()),
    }
}

fn cmd_run(args: &[&str], config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let Some(file) = args.first() else {
        return Err("Invalid arguments for command 'run': expected a file path".into());
    };

    let mut dump = config.dump;
    for flag in &args[1..] {
        match *flag {
            "-ast" => dump.ast = true,
            "-sakir" => dump.sakir = true,
            "-rawllvm" => dump.rawllvm = true,
            "-llvmir" => dump.llvmir = true,
            other => return Err(format!("Unknown flag '{}' for command 'run'", other).into()),
        }
    }
    run_file(std::path::Path::new(file), &dump)
}

fn print_output(output: &CompileOutput) {
    for dump in &output.ast_dumps {
        println!("----------------:DEBUG: AST DISPLAY:----------------");
        println!("{}", dump);
    }
    if let Some(sakir) = &output.sakir {
        println!("----------------:DEBUG: SAKIR DISPLAY:----------------");
        println!("{}", sakir);
    }
    for note in &output.notes {
        println!("{}", note);
    }
}

/// Runs one shell command line. Returns `false` when the shell should exit.
pub fn dispatch(line: &str, config: &Config) -> bool {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return true;
    };
    let args: Vec<&str> = parts.collect();

    match command {
        "help" => print!("{}", HELP),
        "exit" => return false,
        "run" => {
            if let Err(err) = cmd_run(&args, config) {
                eprintln!("{}", err);
            }
        }
        other => eprintln!("Unknown command '{}'. Type 'help' for help.", other),
    }
    true
}

/// The interactive read-dispatch loop.
pub fn run_shell(config: &Config) {
    println!("Welcome to the sakura shell. Type 'help' for help.");
    let stdin = std::io::stdin();
    loop {
        print!(">> ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if !dispatch(&line, config) {
            break;
        }
    }
    sakura_runtime::gc::shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dump_all() -> DumpConfig {
        DumpConfig {
            ast: true,
            sakir: true,
            rawllvm: false,
            llvmir: false,
        }
    }

    #[test]
    fn compile_produces_ast_and_sakir_dumps() {
        let output =
            compile_source("func main() -> int { return 0; }", &dump_all()).expect("compile");
        assert_eq!(output.ast_dumps.len(), 1);
        assert!(output.ast_dumps[0].contains("FuncDefineStmt"));
        let sakir = output.sakir.expect("sakir dump");
        assert!(sakir.contains("#main() -> i32 {"));
    }

    #[test]
    fn compile_surfaces_parse_errors() {
        let err = compile_source("let = 5;", &DumpConfig::default()).unwrap_err();
        assert_eq!(err.stage, Stage::Parser);
        assert!(err.message.contains("Expected Ident"));
    }

    #[test]
    fn compile_surfaces_ir_errors() {
        let err = compile_source("x = 1;", &DumpConfig::default()).unwrap_err();
        assert_eq!(err.stage, Stage::Ir);
    }

    #[test]
    fn backend_flags_leave_a_note() {
        let dump = DumpConfig {
            llvmir: true,
            ..DumpConfig::default()
        };
        let output = compile_source("", &dump).expect("compile");
        assert_eq!(output.notes.len(), 1);
        assert!(output.notes[0].contains("no native backend"));
    }

    #[test]
    fn dispatch_keeps_running_after_an_unknown_command() {
        let config = Config::default();
        assert!(dispatch("bogus", &config));
        assert!(dispatch("help", &config));
        assert!(!dispatch("exit", &config));
    }
}
