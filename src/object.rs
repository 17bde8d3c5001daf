use super::{class::*, environment::*, error::*, value::*};
use std::{cell::RefCell, fmt, rc::Rc};

pub struct LoxObject {
    pub class: Rc<LoxClass>,
    fields: LoxVars,
}

impl LoxObject {
    pub fn new(class: Rc<LoxClass>) -> Self {
        Self {
            class,
            fields: LoxVars::new(),
        }
    }

    /// Fields shadow methods; a method comes back freshly bound to `instance`.
    pub fn get(
        instance: &Rc<RefCell<LoxObject>>,
        name: &str,
        env: &mut Environment,
    ) -> Result<LoxValue, RuntimeError> {
        let method = {
            let obj = instance.borrow();
            if let Some(value) = obj.fields.get(name) {
                return Ok(value.clone());
            }
            obj.class.find_method(name)
        };
        match method {
            Some(method) => Ok(method.bind(instance.clone(), env).into()),
            None => Err(RuntimeError::UndefinedProperty(name.into())),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &LoxValue> {
        self.fields.values()
    }

    pub fn set(&mut self, name: &str, value: LoxValue) {
        self.fields.insert(name.into(), value);
    }
}

// Fields can point back at the instance, so only their names are printed.
impl fmt::Debug for LoxObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<&String> = self.fields.keys().collect();
        fields.sort();
        f.debug_struct("LoxObject")
            .field("class", &self.class.name)
            .field("fields", &fields)
            .finish()
    }
}
