use log::{error, LevelFilter};
use simple_logger::SimpleLogger;
use std::{
    env,
    io::{self, BufRead, Write},
    process::ExitCode,
};
use treelox::{LogReporter, Lox, LoxResult, Outcome};

const USAGE: &str = "Usage: treelox [script] [--ast]";

fn main() -> ExitCode {
    if let Err(err) = SimpleLogger::new()
        .with_level(LevelFilter::Warn)
        .env()
        .init()
    {
        eprintln!("Could not install logger: {}", err);
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let print_ast = args.iter().any(|arg| arg == "--ast");
    let paths: Vec<&String> = args.iter().filter(|arg| *arg != "--ast").collect();

    let mut lox = Lox::new(Box::new(io::stdout()));
    let mut reporter = LogReporter;
    let result = match paths.as_slice() {
        [] => run_prompt(&mut lox, &mut reporter),
        [path] if print_ast => print_file_ast(&lox, path, &mut reporter),
        [path] => run_file(&mut lox, path, &mut reporter),
        _ => {
            eprintln!("{}", USAGE);
            return ExitCode::from(64);
        }
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err);
            ExitCode::from(66)
        }
    }
}

fn exit_code(outcome: Outcome) -> ExitCode {
    match outcome {
        Outcome::Success => ExitCode::SUCCESS,
        Outcome::StaticError => ExitCode::from(65),
        Outcome::RuntimeError => ExitCode::from(70),
    }
}

fn run_file(lox: &mut Lox, path: &str, reporter: &mut LogReporter) -> LoxResult<ExitCode> {
    let outcome = lox.exec_file(path, reporter)?;
    Ok(exit_code(outcome))
}

fn print_file_ast(lox: &Lox, path: &str, reporter: &mut LogReporter) -> LoxResult<ExitCode> {
    let source = std::fs::read_to_string(path)?;
    match lox.parse(&source, reporter) {
        Some(statements) => {
            for stmt in statements.iter() {
                println!("{}", stmt);
            }
            Ok(ExitCode::SUCCESS)
        }
        None => Ok(exit_code(Outcome::StaticError)),
    }
}

// Errors on one line are reported and the session carries on.
fn run_prompt(lox: &mut Lox, reporter: &mut LogReporter) -> LoxResult<ExitCode> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        match lines.next() {
            Some(line) => {
                lox.run(&line?, reporter);
            }
            None => return Ok(ExitCode::SUCCESS),
        }
    }
}
