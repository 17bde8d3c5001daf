mod ast;
mod builtins;
mod class;
mod environment;
mod error;
mod function;
mod interpreter;
mod object;
mod parser;
mod reporter;
mod resolver;
mod scanner;
#[cfg(test)]
mod test_scripts;
mod value;

pub use self::{
    ast::{Expr, ExprKind, FunctionDecl, Stmt},
    error::*,
    interpreter::Interpreter,
    reporter::*,
    resolver::{Locals, Resolver},
    value::LoxValue,
};
use self::parser::*;
use log::debug;
use std::{
    fs::File,
    io::{BufReader, Read, Write},
};

/// How a single run of source text ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Syntax or resolution errors; nothing was executed.
    StaticError,
    RuntimeError,
}

/// Front end plus interpreter. Globals persist from one `run` to the next.
pub struct Lox {
    interpreter: Interpreter,
}

impl Lox {
    pub fn new(output: Box<dyn Write>) -> Self {
        Self {
            interpreter: Interpreter::new(output),
        }
    }

    /// Scan and parse `source`, reporting every syntax error.
    pub fn parse(&self, source: &str, reporter: &mut dyn Reporter) -> Option<Vec<Stmt>> {
        let ParseResult { statements, errors } = parse(source);
        if errors.is_empty() {
            Some(statements)
        } else {
            for err in errors {
                reporter.report(err);
            }
            None
        }
    }

    pub fn run(&mut self, source: &str, reporter: &mut dyn Reporter) -> Outcome {
        let statements = match self.parse(source, reporter) {
            Some(statements) => statements,
            None => return Outcome::StaticError,
        };
        let locals = match Resolver::bind(&statements, reporter) {
            Some(locals) => locals,
            None => return Outcome::StaticError,
        };
        debug!(
            "Resolved {} local reference(s) in {} statement(s)",
            locals.len(),
            statements.len()
        );
        self.interpreter.resolve(locals);
        self.interpreter.interpret(&statements, reporter)
    }

    pub fn exec_file(&mut self, path: &str, reporter: &mut dyn Reporter) -> LoxResult<Outcome> {
        let file = File::open(path)?;
        let mut source = String::new();
        BufReader::new(file).read_to_string(&mut source)?;
        Ok(self.run(&source, reporter))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_scripts::*;

    #[test]
    fn globals_persist_between_runs() {
        let output = SharedOutput::default();
        let mut lox = Lox::new(Box::new(output.clone()));
        let mut reporter = CollectingReporter::new();
        let lines = [
            "var greeting = \"hi\";",
            "fun shout(word) { return word + \"!\"; }",
            "print missing;",
            "print shout(greeting);",
        ];
        let outcomes: Vec<Outcome> = lines
            .iter()
            .map(|line| lox.run(line, &mut reporter))
            .collect();
        assert_eq!(
            outcomes,
            vec![
                Outcome::Success,
                Outcome::Success,
                Outcome::RuntimeError,
                Outcome::Success
            ]
        );
        assert_eq!(output.lines(), vec!["hi!"]);
        assert_eq!(reporter.errors.len(), 1);
    }

    #[test]
    fn closures_across_runs() {
        let output = SharedOutput::default();
        let mut lox = Lox::new(Box::new(output.clone()));
        let mut reporter = CollectingReporter::new();
        lox.run(FUNCTION_CLOSURE_TEST, &mut reporter);
        lox.run("counter();", &mut reporter);
        assert!(reporter.is_empty());
        assert_eq!(output.lines(), vec!["1", "2", "3"]);
    }

    #[test]
    fn syntax_errors_are_reported() {
        let result = run("var = 1;\nprint 1");
        assert_eq!(result.outcome, Outcome::StaticError);
        assert_eq!(result.reporter.errors.len(), 2);
        assert!(result
            .reporter
            .errors
            .iter()
            .all(|err| matches!(err, LoxError::Syntax(_))));
    }

    #[test]
    fn exec_file() -> LoxResult {
        let path = std::env::temp_dir().join(format!("treelox-{}.lox", std::process::id()));
        let mut file = File::create(&path)?;
        writeln!(file, "{}", CLASS_INHERITANCE_TEST)?;
        let output = SharedOutput::default();
        let mut lox = Lox::new(Box::new(output.clone()));
        let mut reporter = CollectingReporter::new();
        let outcome = lox.exec_file(&path.to_string_lossy(), &mut reporter)?;
        std::fs::remove_file(&path)?;
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(output.lines(), vec!["Hello, world", "Howdy, partner"]);
        Ok(())
    }

    #[test]
    fn missing_file() {
        let mut lox = Lox::new(Box::new(SharedOutput::default()));
        let mut reporter = CollectingReporter::new();
        let result = lox.exec_file("/nonexistent/script.lox", &mut reporter);
        assert!(matches!(result, Err(LoxError::IO(_))));
    }
}
