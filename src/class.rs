use super::{error::*, function::*, interpreter::Interpreter, object::*, value::*};
use std::{cell::RefCell, collections::HashMap, rc::Rc};

#[derive(Debug)]
pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    pub methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    /// Look a method up on this class, then up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        match self.methods.get(name) {
            Some(method) => Some(method.clone()),
            None => self
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name)),
        }
    }
}

// Construction needs the shared handle so the new instance can point back at
// its class.
impl Callable for Rc<LoxClass> {
    fn arity(&self) -> usize {
        self.find_method("init")
            .map(|init| init.arity())
            .unwrap_or(0)
    }

    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<LoxValue>) -> LoxResult<LoxValue> {
        let instance = Rc::new(RefCell::new(LoxObject::new(self.clone())));
        if let Some(init) = self.find_method("init") {
            init.bind(instance.clone(), &mut interpreter.env)
                .call(interpreter, arguments)?;
        }
        Ok(instance.into())
    }
}
