use super::{class::*, error::*, function::*, object::*, scanner::*};
use std::{cell::RefCell, fmt, rc::Rc};

#[derive(Clone, Debug)]
pub enum LoxValue {
    Nil,
    Boolean(bool),
    Number(f64),
    String(Rc<str>),
    Function(Rc<LoxFunction>),
    Class(Rc<LoxClass>),
    Object(Rc<RefCell<LoxObject>>),
}

impl LoxValue {
    pub fn type_str(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Boolean(_) => "Boolean",
            Self::Number(_) => "Number",
            Self::String(_) => "String",
            Self::Function(_) => "Function",
            Self::Class(_) => "Class",
            Self::Object(_) => "Object",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Nil => false,
            Self::Boolean(value) => *value,
            _ => true,
        }
    }

    pub fn get_number(&self) -> Option<f64> {
        if let Self::Number(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    pub fn get_object(&self) -> Option<Rc<RefCell<LoxObject>>> {
        if let Self::Object(obj) = self {
            Some(obj.clone())
        } else {
            None
        }
    }

    /// View the value through the call protocol, if it supports it.
    pub fn as_callable(&self) -> Option<&dyn Callable> {
        match self {
            Self::Function(fun) => Some(fun.as_ref()),
            Self::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Both operands as numbers, or the type error arithmetic reports.
    pub fn number_operands(left: &LoxValue, right: &LoxValue) -> Result<(f64, f64), RuntimeError> {
        match (left, right) {
            (Self::Number(l), Self::Number(r)) => Ok((*l, *r)),
            _ => Err(RuntimeError::TypeMismatch("Operands must be numbers".into())),
        }
    }
}

// Reference types compare by identity.
impl PartialEq for LoxValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Nil, Self::Nil) => true,
            (Self::Boolean(l), Self::Boolean(r)) => l == r,
            (Self::Number(l), Self::Number(r)) => l == r,
            (Self::String(l), Self::String(r)) => l == r,
            (Self::Function(l), Self::Function(r)) => Rc::ptr_eq(l, r),
            (Self::Class(l), Self::Class(r)) => Rc::ptr_eq(l, r),
            (Self::Object(l), Self::Object(r)) => Rc::ptr_eq(l, r),
            _ => false,
        }
    }
}

impl From<bool> for LoxValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f64> for LoxValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<String> for LoxValue {
    fn from(value: String) -> Self {
        Self::String(value.into())
    }
}

impl From<&str> for LoxValue {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<LoxFunction> for LoxValue {
    fn from(value: LoxFunction) -> Self {
        Self::Function(Rc::new(value))
    }
}

impl From<LoxClass> for LoxValue {
    fn from(value: LoxClass) -> Self {
        Self::Class(Rc::new(value))
    }
}

impl From<Rc<RefCell<LoxObject>>> for LoxValue {
    fn from(value: Rc<RefCell<LoxObject>>) -> Self {
        Self::Object(value)
    }
}

impl From<&Token> for LoxValue {
    fn from(token: &Token) -> Self {
        match &token.literal {
            Some(literal) => match literal {
                Literal::False => Self::Boolean(false),
                Literal::True => Self::Boolean(true),
                Literal::Number(num) => Self::Number(*num),
                Literal::String(s) => Self::String(s.as_str().into()),
            },
            None => Self::Nil,
        }
    }
}

impl fmt::Display for LoxValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Boolean(value) => write!(f, "{}", value),
            Self::Number(value) if value.is_infinite() => {
                write!(f, "{}Infinity", if *value < 0.0 { "-" } else { "" })
            }
            // f64's Display already drops the fractional part of whole numbers.
            Self::Number(value) => write!(f, "{}", value),
            Self::String(value) => write!(f, "{}", value),
            Self::Function(func) => write!(f, "{}", func),
            Self::Class(class) => write!(f, "{}", class.name),
            Self::Object(obj) => write!(f, "{} instance", obj.borrow().class.name),
        }
    }
}
