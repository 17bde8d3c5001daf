use super::{ast::*, error::*, reporter::*, scanner::*};
use log::trace;
use std::collections::HashMap;

/// Expression id to the number of scopes between its use and its binding.
/// Expressions without an entry are globals.
pub type Locals = HashMap<usize, usize>;

#[derive(PartialEq, Clone, Copy)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(PartialEq, Clone, Copy)]
enum ClassType {
    None,
    Class,
    Subclass,
}

pub struct Resolver<'a> {
    locals_stack: Vec<HashMap<String, bool>>,
    locals: Locals,
    current_function: FunctionType,
    current_class: ClassType,
    reporter: &'a mut dyn Reporter,
    had_error: bool,
}

impl<'a> Resolver<'a> {
    /// Resolve every local reference in `statements`. Errors go to the
    /// reporter and the walk carries on; the table comes back only when
    /// none were found.
    pub fn bind(statements: &[Stmt], reporter: &'a mut dyn Reporter) -> Option<Locals> {
        let mut resolver = Resolver {
            locals_stack: vec![],
            locals: HashMap::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            reporter,
            had_error: false,
        };
        resolver.bind_stmts(statements);
        if resolver.had_error {
            None
        } else {
            Some(resolver.locals)
        }
    }

    fn bind_stmts(&mut self, statements: &[Stmt]) {
        for stmt in statements.iter() {
            self.bind_stmt(stmt);
        }
    }

    fn bind_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.push();
                self.bind_stmts(statements);
                self.pop();
            }
            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.bind_expr(init);
                }
                self.define(&name.lexeme);
            }
            Stmt::Fun(decl) => {
                self.declare(&decl.name);
                self.define(&decl.name.lexeme);
                self.resolve_function(decl, FunctionType::Function);
            }
            Stmt::Expr(expr) | Stmt::Print(expr) => {
                self.bind_expr(expr);
            }
            Stmt::IfElse {
                condition,
                body,
                else_branch,
            } => {
                self.bind_expr(condition);
                self.bind_stmt(body);
                if let Some(body) = else_branch {
                    self.bind_stmt(body);
                }
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(ResolutionError::ReturnOutsideFunction, keyword.line);
                }
                if let Some(value) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(ResolutionError::ReturnValueFromInitializer, keyword.line);
                    }
                    self.bind_expr(value);
                }
            }
            Stmt::WhileLoop { condition, body } => {
                self.bind_expr(condition);
                self.bind_stmt(body);
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let enclosing_class = self.current_class;
                self.current_class = ClassType::Class;
                self.declare(name);
                self.define(&name.lexeme);

                if let Some(superclass) = superclass {
                    if let ExprKind::Identifier(supername) = &superclass.kind {
                        if supername.lexeme == name.lexeme {
                            self.error(
                                ResolutionError::SelfInheritance(name.lexeme.clone()),
                                supername.line,
                            );
                        }
                    }
                    self.current_class = ClassType::Subclass;
                    self.bind_expr(superclass);
                    self.push();
                    self.define("super");
                }

                self.push();
                self.define("this");
                for method in methods.iter() {
                    let kind = if method.name.lexeme == "init" {
                        FunctionType::Initializer
                    } else {
                        FunctionType::Method
                    };
                    self.resolve_function(method, kind);
                }
                self.pop();

                if superclass.is_some() {
                    self.pop();
                }
                self.current_class = enclosing_class;
            }
        }
    }

    fn bind_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Identifier(name) => {
                if self.is_declared_only(&name.lexeme) {
                    self.error(
                        ResolutionError::SelfReferentialInitializer(name.lexeme.clone()),
                        name.line,
                    );
                }
                self.resolve_local(expr, &name.lexeme);
            }
            ExprKind::Assignment { name, value } => {
                self.bind_expr(value);
                self.resolve_local(expr, &name.lexeme);
            }
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.bind_expr(left);
                self.bind_expr(right);
            }
            ExprKind::Call {
                callee, arguments, ..
            } => {
                self.bind_expr(callee);
                for arg in arguments.iter() {
                    self.bind_expr(arg);
                }
            }
            ExprKind::Grouping(expr) => {
                self.bind_expr(expr);
            }
            ExprKind::Unary { right, .. } => {
                self.bind_expr(right);
            }
            ExprKind::Get { object, .. } => {
                self.bind_expr(object);
            }
            ExprKind::Set { object, value, .. } => {
                self.bind_expr(value);
                self.bind_expr(object);
            }
            ExprKind::This(keyword) => {
                if self.current_class == ClassType::None {
                    self.error(ResolutionError::ThisOutsideClass, keyword.line);
                } else {
                    self.resolve_local(expr, "this");
                }
            }
            ExprKind::Super { keyword, .. } => match self.current_class {
                ClassType::None => self.error(ResolutionError::SuperOutsideClass, keyword.line),
                ClassType::Class => {
                    self.error(ResolutionError::SuperWithoutSuperclass, keyword.line)
                }
                ClassType::Subclass => self.resolve_local(expr, "super"),
            },
            ExprKind::Literal(_) => {}
        }
    }

    fn resolve_local(&mut self, expr: &Expr, name: &str) {
        for (depth, frame) in self.locals_stack.iter().rev().enumerate() {
            if frame.contains_key(name) {
                trace!("Resolved \"{}\" at depth {}", name, depth);
                self.locals.insert(expr.id(), depth);
                return;
            }
        }
    }

    fn resolve_function(&mut self, decl: &FunctionDecl, func_type: FunctionType) {
        let enclosing_function = self.current_function;
        self.current_function = func_type;
        self.push();
        for param in decl.params.iter() {
            self.declare(param);
            self.define(&param.lexeme);
        }
        self.bind_stmts(&decl.body);
        self.pop();
        self.current_function = enclosing_function;
    }

    fn error(&mut self, err: ResolutionError, line: u32) {
        self.had_error = true;
        self.reporter.report(LoxError::Resolution(err, line));
    }

    fn push(&mut self) {
        self.locals_stack.push(HashMap::new());
    }

    fn pop(&mut self) {
        self.locals_stack.pop();
    }

    // Globals may be redeclared freely, so only local scopes are checked.
    fn declare(&mut self, name: &Token) {
        let duplicate = match self.locals_stack.last_mut() {
            Some(scope) if scope.contains_key(&name.lexeme) => true,
            Some(scope) => {
                scope.insert(name.lexeme.clone(), false);
                false
            }
            None => false,
        };
        if duplicate {
            self.error(
                ResolutionError::DuplicateLocalDeclaration(name.lexeme.clone()),
                name.line,
            );
        }
    }

    fn define(&mut self, name: &str) {
        if let Some(scope) = self.locals_stack.last_mut() {
            scope.insert(name.into(), true);
        }
    }

    fn is_declared_only(&self, name: &str) -> bool {
        matches!(
            self.locals_stack.last().and_then(|scope| scope.get(name)),
            Some(false)
        )
    }
}
