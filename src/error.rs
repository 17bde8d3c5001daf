use std::fmt::Display;

use thiserror::Error;

#[derive(Clone, Debug, PartialEq)]
pub struct SyntaxError {
    message: String,
    line: u32,
}

impl SyntaxError {
    pub fn new(message: String, line: u32) -> Self {
        Self { message, line }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Syntax error on line {}: {}", self.line, self.message)
    }
}

/// Static errors found by the resolver before anything runs.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum ResolutionError {
    #[error("Already a variable named \"{0}\" in this scope")]
    DuplicateLocalDeclaration(String),
    #[error("Cannot read local variable \"{0}\" in its own initializer")]
    SelfReferentialInitializer(String),
    #[error("Cannot return from top-level code")]
    ReturnOutsideFunction,
    #[error("Cannot return a value from an initializer")]
    ReturnValueFromInitializer,
    #[error("Cannot use \"this\" outside of a class")]
    ThisOutsideClass,
    #[error("Cannot use \"super\" outside of a class")]
    SuperOutsideClass,
    #[error("Cannot use \"super\" in a class with no superclass")]
    SuperWithoutSuperclass,
    #[error("Class \"{0}\" cannot inherit from itself")]
    SelfInheritance(String),
}

#[derive(Error, Clone, Debug, PartialEq)]
pub enum RuntimeError {
    #[error("Undefined variable \"{0}\"")]
    UndefinedVariable(String),
    #[error("Undefined property \"{0}\"")]
    UndefinedProperty(String),
    #[error("{0}")]
    TypeMismatch(String),
    #[error("Can only call functions and classes")]
    NotCallable,
    #[error("Expected {expected} argument(s) but got {got}")]
    ArityMismatch { expected: usize, got: usize },
    #[error("Only instances have fields")]
    OnlyInstancesHaveFields,
    #[error("Only instances have properties")]
    OnlyInstancesHaveProperties,
    #[error("Superclass \"{0}\" must be a class")]
    NotAClass(String),
}

impl RuntimeError {
    /// Attach the source line the error was raised on.
    pub fn at(self, line: u32) -> LoxError {
        LoxError::Runtime(self, line)
    }
}

#[derive(Error, Debug)]
pub enum LoxError {
    #[error("IO Error: {0}")]
    IO(#[from] std::io::Error),
    #[error("System Time Error: {0}")]
    SystemTime(#[from] std::time::SystemTimeError),
    #[error("{0}")]
    Syntax(SyntaxError),
    #[error("Resolution error on line {1}: {0}")]
    Resolution(ResolutionError, u32),
    #[error("Runtime error on line {1}: {0}")]
    Runtime(RuntimeError, u32),
}

pub type LoxResult<T = ()> = Result<T, LoxError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn messages() {
        let err = RuntimeError::ArityMismatch {
            expected: 1,
            got: 0,
        }
        .at(3);
        assert_eq!(
            err.to_string(),
            "Runtime error on line 3: Expected 1 argument(s) but got 0"
        );
        let err = LoxError::Syntax(SyntaxError::new("Expected expression".into(), 7));
        assert_eq!(err.to_string(), "Syntax error on line 7: Expected expression");
        let err = LoxError::Resolution(ResolutionError::SelfInheritance("A".into()), 1);
        assert_eq!(
            err.to_string(),
            "Resolution error on line 1: Class \"A\" cannot inherit from itself"
        );
    }
}
