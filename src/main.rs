use std::env;
use std::fs;
use std::process::ExitCode;

use plc::generator;
use plc::prelude::*;

/// Thin driver: read a `.plc` source file named on the command line, run it
/// through the front end, then either interpret it (default) or emit a
/// Java-dialect listing (`--emit-java`) to standard output.
fn main() -> ExitCode {
    let mut args = env::args().skip(1);
    let mut emit_java = false;
    let mut path = None;
    for arg in args.by_ref() {
        if arg == "--emit-java" {
            emit_java = true;
        } else {
            path = Some(arg);
        }
    }

    let Some(path) = path else {
        eprintln!("usage: plc [--emit-java] <source-file>");
        return ExitCode::FAILURE;
    };

    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("error: could not read '{path}': {e}");
            return ExitCode::FAILURE;
        }
    };

    let tokens = scan(&source);
    let ast = match parse(&tokens) {
        Ok(ast) => ast,
        Err(e) => {
            e.report(&mut std::io::stderr()).ok();
            return ExitCode::FAILURE;
        }
    };
    let program = match analyze(ast) {
        Ok(program) => program,
        Err(e) => {
            e.report(&mut std::io::stderr()).ok();
            return ExitCode::FAILURE;
        }
    };

    if emit_java {
        print!("{}", generator::generate(&program, "Program"));
        return ExitCode::SUCCESS;
    }

    match Interpreter::new().run(&program) {
        Ok(result) => {
            println!("{result}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            e.report(&mut std::io::stderr()).ok();
            ExitCode::FAILURE
        }
    }
}
