use super::scanner::Token;
use std::{cell::Cell, fmt, rc::Rc};

thread_local! {
    static EXPR_COUNT: Cell<usize> = const { Cell::new(0) };
}

// Ids only ever grow, so expressions parsed on later REPL lines never collide
// with entries already in the interpreter's distance table.
fn get_expr_id() -> usize {
    EXPR_COUNT.with(|count| {
        let id = count.get();
        count.set(id + 1);
        id
    })
}

#[derive(PartialEq, Clone, Debug)]
pub enum ExprKind {
    Literal(Token),
    Unary {
        operator: Token,
        right: Box<Expr>,
    },
    Binary {
        operator: Token,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Grouping(Box<Expr>),
    Identifier(Token),
    Assignment {
        name: Token,
        value: Box<Expr>,
    },
    Logical {
        operator: Token,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },
    Get {
        object: Box<Expr>,
        name: Token,
    },
    Set {
        object: Box<Expr>,
        name: Token,
        value: Box<Expr>,
    },
    This(Token),
    Super {
        keyword: Token,
        method: Token,
    },
}

/// An expression node. The id is the node's identity for the resolver's
/// distance table; clones keep the same id.
#[derive(PartialEq, Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    id: usize,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            id: get_expr_id(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }
}

impl From<ExprKind> for Expr {
    fn from(value: ExprKind) -> Self {
        Expr::new(value)
    }
}

#[derive(PartialEq, Debug)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(PartialEq, Clone, Debug)]
pub enum Stmt {
    Expr(Box<Expr>),
    Print(Box<Expr>),
    Var {
        name: Token,
        initializer: Option<Box<Expr>>,
    },
    Block(Vec<Stmt>),
    IfElse {
        condition: Box<Expr>,
        body: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    WhileLoop {
        condition: Box<Expr>,
        body: Box<Stmt>,
    },
    Fun(Rc<FunctionDecl>),
    Return {
        keyword: Token,
        value: Option<Box<Expr>>,
    },
    Class {
        name: Token,
        superclass: Option<Box<Expr>>,
        methods: Vec<Rc<FunctionDecl>>,
    },
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<String>>()
        .join(" ")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(value) => write!(f, "{}", value.lexeme),
            ExprKind::Unary { operator, right } => write!(f, "({} {})", operator.lexeme, right),
            ExprKind::Binary {
                operator,
                left,
                right,
            }
            | ExprKind::Logical {
                operator,
                left,
                right,
            } => write!(f, "({} {} {})", operator.lexeme, left, right),
            ExprKind::Grouping(inner) => write!(f, "(group {})", inner),
            ExprKind::Identifier(name) => write!(f, "{}", name.lexeme),
            ExprKind::Assignment { name, value } => write!(f, "(= {} {})", name.lexeme, value),
            ExprKind::Call {
                callee, arguments, ..
            } => {
                if arguments.is_empty() {
                    write!(f, "(call {})", callee)
                } else {
                    write!(f, "(call {} {})", callee, join(arguments))
                }
            }
            ExprKind::Get { object, name } => write!(f, "(get {} {})", object, name.lexeme),
            ExprKind::Set {
                object,
                name,
                value,
            } => write!(f, "(set {} {} {})", object, name.lexeme, value),
            ExprKind::This(..) => write!(f, "this"),
            ExprKind::Super { method, .. } => write!(f, "(super {})", method.lexeme),
        }
    }
}

impl fmt::Display for FunctionDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<&str> = self.params.iter().map(|p| p.lexeme.as_str()).collect();
        write!(
            f,
            "(fun {} ({}) {})",
            self.name.lexeme,
            params.join(" "),
            join(&self.body)
        )
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expr(expr) => write!(f, "(expr {})", expr),
            Self::Print(expr) => write!(f, "(print {})", expr),
            Self::Var { name, initializer } => match initializer {
                Some(expr) => write!(f, "(var {} {})", name.lexeme, expr),
                None => write!(f, "(var {})", name.lexeme),
            },
            Self::Block(statements) => write!(f, "(block {})", join(statements)),
            Self::IfElse {
                condition,
                body,
                else_branch,
            } => match else_branch {
                Some(else_stmt) => write!(f, "(if {} {} {})", condition, body, else_stmt),
                None => write!(f, "(if {} {})", condition, body),
            },
            Self::WhileLoop { condition, body } => write!(f, "(while {} {})", condition, body),
            Self::Fun(decl) => write!(f, "{}", decl),
            Self::Return { value, .. } => match value {
                Some(value) => write!(f, "(return {})", value),
                None => write!(f, "(return)"),
            },
            Self::Class {
                name,
                superclass,
                methods,
            } => {
                write!(f, "(class {}", name.lexeme)?;
                if let Some(superclass) = superclass {
                    write!(f, " < {}", superclass)?;
                }
                for method in methods.iter() {
                    write!(f, " {}", method)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scanner::*;

    #[test]
    fn unique_ids() {
        let a = Expr::new(ExprKind::This(Token::new(TokenKind::This, "this", None, 0)));
        let b = Expr::new(ExprKind::This(Token::new(TokenKind::This, "this", None, 0)));
        assert_ne!(a.id(), b.id());
        assert_eq!(a.clone().id(), a.id());
    }

    #[test]
    fn expr_to_string() {
        let expr: Expr = ExprKind::Binary {
            operator: Token::new(TokenKind::Plus, "+", None, 0),
            left: Box::new(
                ExprKind::Unary {
                    operator: Token::new(TokenKind::Minus, "-", None, 0),
                    right: Box::new(
                        ExprKind::Literal(Token::new(
                            TokenKind::Number,
                            "6.5",
                            Some(Literal::Number(6.5)),
                            0,
                        ))
                        .into(),
                    ),
                }
                .into(),
            ),
            right: Box::new(ExprKind::Identifier(Token::identifier("foo", 0)).into()),
        }
        .into();
        assert_eq!(expr.to_string(), "(+ (- 6.5) foo)");
    }

    #[test]
    fn stmt_to_string() {
        let var_stmt = Stmt::Var {
            name: Token::identifier("foo", 0),
            initializer: Some(Box::new(
                ExprKind::Literal(Token::new(
                    TokenKind::String,
                    r#""bar""#,
                    Some(Literal::String("bar".into())),
                    0,
                ))
                .into(),
            )),
        };
        assert_eq!(var_stmt.to_string(), r#"(var foo "bar")"#);
        let block = Stmt::Block(vec![
            var_stmt,
            Stmt::Print(Box::new(
                ExprKind::Identifier(Token::identifier("foo", 0)).into(),
            )),
        ]);
        assert_eq!(block.to_string(), r#"(block (var foo "bar") (print foo))"#);
    }
}
