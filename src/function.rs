use super::{
    ast::FunctionDecl,
    environment::*,
    error::*,
    interpreter::{Completion, Interpreter},
    object::LoxObject,
    value::*,
};
use std::{cell::RefCell, fmt, rc::Rc};

/// The call protocol shared by functions, natives and classes. Arity is
/// checked by the caller before `call` runs.
pub trait Callable {
    fn arity(&self) -> usize;

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<LoxValue>) -> LoxResult<LoxValue>;
}

pub type NativeFunction = fn(&[LoxValue]) -> LoxResult<LoxValue>;

#[derive(Clone, Debug)]
pub enum FunctionBody {
    Block {
        declaration: Rc<FunctionDecl>,
        closure: ScopeHandle,
    },
    Native {
        arity: usize,
        fun: NativeFunction,
    },
}

#[derive(Clone, Debug)]
pub struct LoxFunction {
    pub name: String,
    pub body: FunctionBody,
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: ScopeHandle, is_initializer: bool) -> Self {
        LoxFunction {
            name: declaration.name.lexeme.clone(),
            body: FunctionBody::Block {
                declaration,
                closure,
            },
            is_initializer,
        }
    }

    pub fn native(name: &str, arity: usize, fun: NativeFunction) -> Self {
        LoxFunction {
            name: name.into(),
            body: FunctionBody::Native { arity, fun },
            is_initializer: false,
        }
    }

    /// Specialize a method to one instance: a fresh frame under the method's
    /// closure defines `this`.
    pub fn bind(&self, instance: Rc<RefCell<LoxObject>>, env: &mut Environment) -> LoxFunction {
        match &self.body {
            FunctionBody::Block {
                declaration,
                closure,
            } => {
                let scope = env.new_scope(*closure);
                env.define(scope, "this", instance.into());
                env.capture(scope);
                LoxFunction {
                    name: self.name.clone(),
                    body: FunctionBody::Block {
                        declaration: declaration.clone(),
                        closure: scope,
                    },
                    is_initializer: self.is_initializer,
                }
            }
            FunctionBody::Native { .. } => self.clone(),
        }
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        match &self.body {
            FunctionBody::Block { declaration, .. } => declaration.params.len(),
            FunctionBody::Native { arity, .. } => *arity,
        }
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<LoxValue>) -> LoxResult<LoxValue> {
        let (declaration, closure) = match &self.body {
            FunctionBody::Block {
                declaration,
                closure,
            } => (declaration, *closure),
            FunctionBody::Native { fun, .. } => return fun(&arguments),
        };
        let scope = interpreter.env.new_scope(closure);
        for (param, arg) in declaration.params.iter().zip(arguments) {
            interpreter.env.define(scope, &param.lexeme, arg);
        }
        let completion = interpreter.execute_block(&declaration.body, scope)?;
        if self.is_initializer {
            return interpreter
                .env
                .get_at(closure, 0, "this")
                .map_err(|err| err.at(declaration.name.line));
        }
        Ok(match completion {
            Completion::Return(value) => value,
            Completion::Normal => LoxValue::Nil,
        })
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.body {
            FunctionBody::Block { .. } => write!(f, "<fn {}>", self.name),
            FunctionBody::Native { .. } => write!(f, "<native fn>"),
        }
    }
}
