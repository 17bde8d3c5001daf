use super::{
    ast::*, builtins::*, class::*, environment::*, error::*, function::*, object::*,
    reporter::*, resolver::Locals, scanner::*, value::*, Outcome,
};
use log::{debug, trace};
use std::{collections::HashMap, io::Write, rc::Rc};

/// How a statement finished. `Return` unwinds to the nearest call boundary.
#[derive(Debug, PartialEq)]
pub enum Completion {
    Normal,
    Return(LoxValue),
}

// Frames allowed to accumulate before the first collection.
const MIN_COLLECTION_THRESHOLD: usize = 256;

pub struct Interpreter {
    pub(crate) env: Environment,
    scope: ScopeHandle,
    // Frames of the enclosing blocks and calls, outermost first.
    frames: Vec<ScopeHandle>,
    // Values held while a subexpression runs, e.g. a callee while its
    // arguments are evaluated. Collection treats them as roots.
    temporaries: Vec<LoxValue>,
    next_collection: usize,
    locals: Locals,
    output: Box<dyn Write>,
}

impl Interpreter {
    pub fn new(output: Box<dyn Write>) -> Self {
        let mut env = Environment::new();
        for (name, value) in get_builtins() {
            env.define(GLOBAL_SCOPE, &name, value);
        }
        Self {
            env,
            scope: GLOBAL_SCOPE,
            frames: vec![],
            temporaries: vec![],
            next_collection: MIN_COLLECTION_THRESHOLD,
            locals: Locals::new(),
            output,
        }
    }

    /// Add resolved distances. Tables from earlier runs are kept, so
    /// functions declared on one REPL line still resolve on the next.
    pub fn resolve(&mut self, locals: Locals) {
        self.locals.extend(locals);
    }

    /// Execute statements in order, stopping at the first runtime error.
    /// Globals defined before the error stay defined.
    pub fn interpret(&mut self, statements: &[Stmt], reporter: &mut dyn Reporter) -> Outcome {
        let mut outcome = Outcome::Success;
        for stmt in statements.iter() {
            if let Err(err) = self.execute(stmt) {
                reporter.report(err);
                self.scope = GLOBAL_SCOPE;
                outcome = Outcome::RuntimeError;
                break;
            }
        }
        // Only globals are live between runs.
        self.collect();
        outcome
    }

    fn collect(&mut self) {
        let mut roots = self.frames.clone();
        roots.push(self.scope);
        roots.push(GLOBAL_SCOPE);
        let freed = self.env.collect(&roots, &self.temporaries);
        let live = self.env.live_scopes();
        self.next_collection = (live * 2).max(MIN_COLLECTION_THRESHOLD);
        debug!(
            "Collected {} frame(s), {} live, peak {}",
            freed,
            live,
            self.env.peak_scopes()
        );
    }

    /// Evaluate `expr` with `held` kept reachable for the duration.
    fn evaluate_holding(&mut self, held: LoxValue, expr: &Expr) -> LoxResult<LoxValue> {
        self.temporaries.push(held);
        let result = self.evaluate(expr);
        self.temporaries.pop();
        result
    }

    /// Run `statements` with `scope` as the current frame, then restore the
    /// previous frame and release `scope` whether or not they succeeded.
    pub(crate) fn execute_block(
        &mut self,
        statements: &[Stmt],
        scope: ScopeHandle,
    ) -> LoxResult<Completion> {
        let previous = std::mem::replace(&mut self.scope, scope);
        self.frames.push(previous);
        if self.env.live_scopes() >= self.next_collection {
            self.collect();
        }
        let result = self.execute_all(statements);
        self.frames.pop();
        self.scope = previous;
        self.env.release(scope);
        result
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> LoxResult<Completion> {
        for stmt in statements.iter() {
            if let Completion::Return(value) = self.execute(stmt)? {
                return Ok(Completion::Return(value));
            }
        }
        Ok(Completion::Normal)
    }

    fn execute(&mut self, stmt: &Stmt) -> LoxResult<Completion> {
        match stmt {
            Stmt::Expr(expr) => {
                self.evaluate(expr)?;
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.output, "{}", value)?;
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => LoxValue::Nil,
                };
                trace!("Defining \"{}\" in {}", name.lexeme, self.scope);
                self.env.define(self.scope, &name.lexeme, value);
            }
            Stmt::Block(statements) => {
                let scope = self.env.new_scope(self.scope);
                return self.execute_block(statements, scope);
            }
            Stmt::IfElse {
                condition,
                body,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(body);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }
            Stmt::WhileLoop { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Completion::Return(value) = self.execute(body)? {
                        return Ok(Completion::Return(value));
                    }
                }
            }
            Stmt::Fun(decl) => {
                self.env.capture(self.scope);
                let fun = LoxFunction::new(decl.clone(), self.scope, false);
                self.env.define(self.scope, &decl.name.lexeme, fun.into());
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => LoxValue::Nil,
                };
                return Ok(Completion::Return(value));
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.define_class(name, superclass.as_deref(), methods)?;
            }
        }
        Ok(Completion::Normal)
    }

    fn define_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> LoxResult {
        let superclass = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                LoxValue::Class(class) => Some(class),
                _ => {
                    let (supername, line) = match &expr.kind {
                        ExprKind::Identifier(token) => (token.lexeme.clone(), token.line),
                        _ => (expr.to_string(), name.line),
                    };
                    return Err(RuntimeError::NotAClass(supername).at(line));
                }
            },
            None => None,
        };

        self.env.define(self.scope, &name.lexeme, LoxValue::Nil);

        let closure = match &superclass {
            Some(class) => {
                let scope = self.env.new_scope(self.scope);
                self.env.define(scope, "super", LoxValue::Class(class.clone()));
                scope
            }
            None => self.scope,
        };
        self.env.capture(closure);

        let methods: HashMap<String, Rc<LoxFunction>> = methods
            .iter()
            .map(|decl| {
                let is_initializer = decl.name.lexeme == "init";
                let method = LoxFunction::new(decl.clone(), closure, is_initializer);
                (decl.name.lexeme.clone(), Rc::new(method))
            })
            .collect();

        debug!(
            "Defined class {} with {} method(s)",
            name.lexeme,
            methods.len()
        );
        let class = LoxClass {
            name: name.lexeme.clone(),
            superclass,
            methods,
        };
        self.env.define(self.scope, &name.lexeme, class.into());
        Ok(())
    }

    fn evaluate(&mut self, expr: &Expr) -> LoxResult<LoxValue> {
        match &expr.kind {
            ExprKind::Literal(token) => Ok(token.into()),
            ExprKind::Grouping(inner) => self.evaluate(inner),
            ExprKind::Unary { operator, right } => {
                let right = self.evaluate(right)?;
                match operator.kind {
                    TokenKind::Bang => Ok(LoxValue::Boolean(!right.is_truthy())),
                    TokenKind::Minus => match right.get_number() {
                        Some(value) => Ok(LoxValue::Number(-value)),
                        None => Err(RuntimeError::TypeMismatch(
                            "Operand must be a number".into(),
                        )
                        .at(operator.line)),
                    },
                    _ => unreachable!("Unknown unary operator {:?}", operator.kind),
                }
            }
            ExprKind::Binary {
                operator,
                left,
                right,
            } => self.evaluate_binary(operator, left, right),
            ExprKind::Identifier(name) => self.look_up_variable(name, expr),
            ExprKind::Assignment { name, value } => {
                let value = self.evaluate(value)?;
                match self.locals.get(&expr.id()) {
                    Some(distance) => {
                        self.env
                            .assign_at(self.scope, *distance, &name.lexeme, value.clone())
                    }
                    None => self.env.assign(GLOBAL_SCOPE, &name.lexeme, value.clone()),
                }
                .map_err(|err| err.at(name.line))?;
                Ok(value)
            }
            ExprKind::Logical {
                operator,
                left,
                right,
            } => {
                let left = self.evaluate(left)?;
                let short_circuits = match operator.kind {
                    TokenKind::Or => left.is_truthy(),
                    _ => !left.is_truthy(),
                };
                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            ExprKind::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;
                let depth = self.temporaries.len();
                self.temporaries.push(callee.clone());
                let result = self.call(&callee, paren, arguments);
                self.temporaries.truncate(depth);
                result
            }
            ExprKind::Get { object, name } => match self.evaluate(object)? {
                LoxValue::Object(instance) => {
                    LoxObject::get(&instance, &name.lexeme, &mut self.env)
                        .map_err(|err| err.at(name.line))
                }
                _ => Err(RuntimeError::OnlyInstancesHaveProperties.at(name.line)),
            },
            ExprKind::Set {
                object,
                name,
                value,
            } => {
                let instance = self
                    .evaluate(object)?
                    .get_object()
                    .ok_or_else(|| RuntimeError::OnlyInstancesHaveFields.at(name.line))?;
                let value = self.evaluate_holding(instance.clone().into(), value)?;
                instance.borrow_mut().set(&name.lexeme, value.clone());
                Ok(value)
            }
            ExprKind::This(keyword) => self.look_up_variable(keyword, expr),
            ExprKind::Super { keyword, method } => self.evaluate_super(expr, keyword, method),
        }
    }

    // Arguments stay in `temporaries` until the call returns; the caller
    // truncates them.
    fn call(&mut self, callee: &LoxValue, paren: &Token, arguments: &[Expr]) -> LoxResult<LoxValue> {
        let callable = callee
            .as_callable()
            .ok_or_else(|| RuntimeError::NotCallable.at(paren.line))?;
        let mut args = Vec::with_capacity(arguments.len());
        for arg in arguments.iter() {
            let value = self.evaluate(arg)?;
            self.temporaries.push(value.clone());
            args.push(value);
        }
        if args.len() != callable.arity() {
            return Err(RuntimeError::ArityMismatch {
                expected: callable.arity(),
                got: args.len(),
            }
            .at(paren.line));
        }
        trace!("Calling {} with {} argument(s)", callee, args.len());
        callable.call(self, args)
    }

    fn evaluate_binary(&mut self, operator: &Token, left: &Expr, right: &Expr) -> LoxResult<LoxValue> {
        let left = self.evaluate(left)?;
        let right = self.evaluate_holding(left.clone(), right)?;
        let line = operator.line;
        let numbers = || LoxValue::number_operands(&left, &right).map_err(|err| err.at(line));

        let value = match operator.kind {
            TokenKind::Plus => match (&left, &right) {
                (LoxValue::Number(l), LoxValue::Number(r)) => LoxValue::Number(l + r),
                (LoxValue::String(l), LoxValue::String(r)) => format!("{}{}", l, r).into(),
                _ => {
                    return Err(RuntimeError::TypeMismatch(
                        "Operands must be two numbers or two strings".into(),
                    )
                    .at(line))
                }
            },
            TokenKind::Minus => {
                let (l, r) = numbers()?;
                LoxValue::Number(l - r)
            }
            TokenKind::Star => {
                let (l, r) = numbers()?;
                LoxValue::Number(l * r)
            }
            TokenKind::Slash => {
                let (l, r) = numbers()?;
                LoxValue::Number(l / r)
            }
            TokenKind::Greater => {
                let (l, r) = numbers()?;
                LoxValue::Boolean(l > r)
            }
            TokenKind::GreaterEqual => {
                let (l, r) = numbers()?;
                LoxValue::Boolean(l >= r)
            }
            TokenKind::Less => {
                let (l, r) = numbers()?;
                LoxValue::Boolean(l < r)
            }
            TokenKind::LessEqual => {
                let (l, r) = numbers()?;
                LoxValue::Boolean(l <= r)
            }
            // Equality is only defined between numbers; every other pairing
            // evaluates to nil.
            TokenKind::EqualEqual | TokenKind::BangEqual => {
                match (left.get_number(), right.get_number()) {
                    (Some(l), Some(r)) => {
                        let equal = l == r;
                        LoxValue::Boolean(if operator.kind == TokenKind::EqualEqual {
                            equal
                        } else {
                            !equal
                        })
                    }
                    _ => {
                        debug!(
                            "Comparing {} with {} on line {} yields nil",
                            left.type_str(),
                            right.type_str(),
                            line
                        );
                        LoxValue::Nil
                    }
                }
            }
            _ => unreachable!("Unknown binary operator {:?}", operator.kind),
        };
        Ok(value)
    }

    fn evaluate_super(&mut self, expr: &Expr, keyword: &Token, method: &Token) -> LoxResult<LoxValue> {
        let distance = *self
            .locals
            .get(&expr.id())
            .ok_or_else(|| RuntimeError::UndefinedVariable("super".into()).at(keyword.line))?;
        let superclass = match self.env.get_at(self.scope, distance, "super") {
            Ok(LoxValue::Class(class)) => class,
            Ok(_) => return Err(RuntimeError::NotAClass("super".into()).at(keyword.line)),
            Err(err) => return Err(err.at(keyword.line)),
        };
        // `this` always lives in the frame just inside the one holding `super`.
        let instance = distance
            .checked_sub(1)
            .and_then(|distance| self.env.get_at(self.scope, distance, "this").ok())
            .and_then(|this| this.get_object())
            .ok_or_else(|| RuntimeError::UndefinedVariable("this".into()).at(keyword.line))?;
        let method = superclass
            .find_method(&method.lexeme)
            .ok_or_else(|| RuntimeError::UndefinedProperty(method.lexeme.clone()).at(method.line))?;
        Ok(method.bind(instance, &mut self.env).into())
    }

    fn look_up_variable(&self, name: &Token, expr: &Expr) -> LoxResult<LoxValue> {
        match self.locals.get(&expr.id()) {
            Some(distance) => self.env.get_at(self.scope, *distance, &name.lexeme),
            None => self.env.get(GLOBAL_SCOPE, &name.lexeme),
        }
        .map_err(|err| err.at(name.line))
    }
}
