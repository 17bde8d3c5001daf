use super::{
    class::LoxClass,
    error::RuntimeError,
    function::{FunctionBody, LoxFunction},
    object::LoxObject,
    value::*,
};
use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    rc::Rc,
};

pub type LoxVars = HashMap<String, LoxValue>;

/// Index of a frame in the environment arena.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct ScopeHandle(usize);

impl std::fmt::Display for ScopeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScopeHandle({})", self.0)
    }
}

pub const GLOBAL_SCOPE: ScopeHandle = ScopeHandle(0);

struct Scope {
    vars: LoxVars,
    parent: Option<ScopeHandle>,
    // Set once a closure holds this frame. Captured frames are skipped by
    // `release` and only reclaimed by `collect`.
    captured: bool,
}

/// Arena of scope frames. Closures and the interpreter refer to frames by
/// handle, so an instance reachable from one of its own bound methods never
/// forms an ownership cycle. Frames a closure captured are reclaimed by a
/// mark and sweep over everything reachable from a set of roots.
pub struct Environment {
    scopes: Vec<Option<Scope>>,
    free: Vec<usize>,
    live: usize,
    peak: usize,
}

/// Work lists for one collection.
#[derive(Default)]
struct Tracer {
    frames: Vec<ScopeHandle>,
    values: Vec<LoxValue>,
    classes: HashSet<*const LoxClass>,
    objects: HashSet<*const RefCell<LoxObject>>,
}

impl Tracer {
    fn function(&mut self, fun: &LoxFunction) {
        if let FunctionBody::Block { closure, .. } = &fun.body {
            self.frames.push(*closure);
        }
    }

    fn class(&mut self, class: &Rc<LoxClass>) {
        let mut next = Some(class.clone());
        while let Some(class) = next {
            if !self.classes.insert(Rc::as_ptr(&class)) {
                break;
            }
            for method in class.methods.values() {
                self.function(method);
            }
            next = class.superclass.clone();
        }
    }

    fn drain_values(&mut self) {
        while let Some(value) = self.values.pop() {
            match value {
                LoxValue::Function(fun) => self.function(&fun),
                LoxValue::Class(class) => self.class(&class),
                LoxValue::Object(obj) => {
                    if self.objects.insert(Rc::as_ptr(&obj)) {
                        let obj = obj.borrow();
                        self.class(&obj.class);
                        self.values.extend(obj.fields().cloned());
                    }
                }
                _ => {}
            }
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            scopes: vec![
                // Root scope
                Some(Scope {
                    vars: HashMap::new(),
                    parent: None,
                    captured: true,
                }),
            ],
            free: vec![],
            live: 1,
            peak: 1,
        }
    }

    pub fn new_scope(&mut self, parent: ScopeHandle) -> ScopeHandle {
        let scope = Scope {
            vars: HashMap::new(),
            parent: Some(parent),
            captured: false,
        };
        self.live += 1;
        self.peak = self.peak.max(self.live);
        match self.free.pop() {
            Some(id) => {
                self.scopes[id] = Some(scope);
                ScopeHandle(id)
            }
            None => {
                self.scopes.push(Some(scope));
                ScopeHandle(self.scopes.len() - 1)
            }
        }
    }

    /// Pin a frame and every frame it encloses in.
    pub fn capture(&mut self, handle: ScopeHandle) {
        let mut next = Some(handle);
        while let Some(id) = next {
            match self.scopes.get_mut(id.0).and_then(Option::as_mut) {
                Some(scope) if !scope.captured => {
                    scope.captured = true;
                    next = scope.parent;
                }
                _ => break,
            }
        }
    }

    /// Free a frame once its block or call has exited, unless a closure
    /// still holds it.
    pub fn release(&mut self, handle: ScopeHandle) {
        if let Some(slot) = self.scopes.get_mut(handle.0) {
            if matches!(slot, Some(scope) if !scope.captured) {
                *slot = None;
                self.free.push(handle.0);
                self.live -= 1;
            }
        }
    }

    /// Free every frame not reachable from `roots` or from the frames that
    /// `values` close over. Returns how many frames were freed.
    pub fn collect(&mut self, roots: &[ScopeHandle], values: &[LoxValue]) -> usize {
        let mut marked = vec![false; self.scopes.len()];
        let mut tracer = Tracer {
            frames: roots.to_vec(),
            values: values.to_vec(),
            ..Default::default()
        };
        loop {
            tracer.drain_values();
            let handle = match tracer.frames.pop() {
                Some(handle) => handle,
                None => break,
            };
            let scope = match self.scopes.get(handle.0).and_then(Option::as_ref) {
                Some(scope) => scope,
                None => continue,
            };
            if marked[handle.0] {
                continue;
            }
            marked[handle.0] = true;
            tracer.frames.extend(scope.parent);
            tracer.values.extend(scope.vars.values().cloned());
        }

        let mut freed = 0;
        for (id, slot) in self.scopes.iter_mut().enumerate() {
            if slot.is_some() && !marked[id] {
                *slot = None;
                self.free.push(id);
                freed += 1;
            }
        }
        self.live -= freed;
        freed
    }

    pub fn live_scopes(&self) -> usize {
        self.live
    }

    /// Most frames alive at once since the environment was created.
    pub fn peak_scopes(&self) -> usize {
        self.peak
    }

    pub fn parent_scope(&self, handle: ScopeHandle) -> Option<ScopeHandle> {
        self.get_scope(handle).and_then(|scope| scope.parent)
    }

    pub fn ancestor(&self, handle: ScopeHandle, distance: usize) -> Option<ScopeHandle> {
        let mut scope = handle;
        for _ in 0..distance {
            scope = self.parent_scope(scope)?;
        }
        Some(scope)
    }

    pub fn define(&mut self, handle: ScopeHandle, key: &str, value: LoxValue) {
        if let Some(scope) = self.get_scope_mut(handle) {
            scope.vars.insert(key.into(), value);
        }
    }

    pub fn get(&self, handle: ScopeHandle, key: &str) -> Result<LoxValue, RuntimeError> {
        let mut next = Some(handle);
        while let Some(id) = next {
            let scope = match self.get_scope(id) {
                Some(scope) => scope,
                None => break,
            };
            if let Some(value) = scope.vars.get(key) {
                return Ok(value.clone());
            }
            next = scope.parent;
        }
        Err(RuntimeError::UndefinedVariable(key.into()))
    }

    pub fn assign(
        &mut self,
        handle: ScopeHandle,
        key: &str,
        value: LoxValue,
    ) -> Result<(), RuntimeError> {
        let mut next = Some(handle);
        while let Some(id) = next {
            let scope = match self.get_scope_mut(id) {
                Some(scope) => scope,
                None => break,
            };
            if let Some(slot) = scope.vars.get_mut(key) {
                *slot = value;
                return Ok(());
            }
            next = scope.parent;
        }
        Err(RuntimeError::UndefinedVariable(key.into()))
    }

    pub fn get_at(
        &self,
        handle: ScopeHandle,
        distance: usize,
        key: &str,
    ) -> Result<LoxValue, RuntimeError> {
        self.ancestor(handle, distance)
            .and_then(|id| self.get_scope(id))
            .and_then(|scope| scope.vars.get(key))
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedVariable(key.into()))
    }

    pub fn assign_at(
        &mut self,
        handle: ScopeHandle,
        distance: usize,
        key: &str,
        value: LoxValue,
    ) -> Result<(), RuntimeError> {
        let slot = self
            .ancestor(handle, distance)
            .and_then(|id| self.get_scope_mut(id))
            .and_then(|scope| scope.vars.get_mut(key))
            .ok_or_else(|| RuntimeError::UndefinedVariable(key.into()))?;
        *slot = value;
        Ok(())
    }

    fn get_scope(&self, handle: ScopeHandle) -> Option<&Scope> {
        self.scopes.get(handle.0).and_then(Option::as_ref)
    }

    fn get_scope_mut(&mut self, handle: ScopeHandle) -> Option<&mut Scope> {
        self.scopes.get_mut(handle.0).and_then(Option::as_mut)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{ast::FunctionDecl, scanner::Token};

    #[test]
    fn basic() {
        let mut env = Environment::new();
        env.define(GLOBAL_SCOPE, "foo", "one".into());
        assert!(env.get(GLOBAL_SCOPE, "foo").unwrap() == "one".into());
        env.define(GLOBAL_SCOPE, "foo", "two".into());
        assert!(env.get(GLOBAL_SCOPE, "foo").unwrap() == "two".into());
    }

    #[test]
    fn nested() {
        let mut env = Environment::new();
        env.define(GLOBAL_SCOPE, "foo", "one".into());
        env.define(GLOBAL_SCOPE, "bar", "outer".into());
        let inner = env.new_scope(GLOBAL_SCOPE);
        env.define(inner, "foo", "three".into());
        assert!(env.get(inner, "foo").unwrap() == "three".into());
        assert!(env.get(inner, "bar").unwrap() == "outer".into());
        assert!(env.get(GLOBAL_SCOPE, "foo").unwrap() == "one".into());
        assert_eq!(
            env.get(inner, "baz"),
            Err(RuntimeError::UndefinedVariable("baz".into()))
        );
    }

    #[test]
    fn assign() {
        let mut env = Environment::new();
        assert!(env.assign(GLOBAL_SCOPE, "foo", LoxValue::Nil).is_err());
        env.define(GLOBAL_SCOPE, "foo", "foo".into());
        let inner = env.new_scope(GLOBAL_SCOPE);
        env.assign(inner, "foo", "bar".into()).unwrap();
        assert!(env.get(GLOBAL_SCOPE, "foo").unwrap() == "bar".into());
        assert!(env.get_at(inner, 0, "foo").is_err());
    }

    #[test]
    fn ancestors() {
        let mut env = Environment::new();
        env.define(GLOBAL_SCOPE, "foo", "global".into());
        let one = env.new_scope(GLOBAL_SCOPE);
        env.define(one, "foo", "one".into());
        let two = env.new_scope(one);
        env.define(two, "foo", "two".into());
        let three = env.new_scope(two);
        env.define(three, "foo", "three".into());
        assert_eq!(env.ancestor(three, 2), Some(one));
        assert_eq!(env.ancestor(three, 4), None);
        assert!(env.get_at(three, 2, "foo").unwrap() == "one".into());
        env.assign_at(three, 1, "foo", "changed".into()).unwrap();
        assert!(env.get(two, "foo").unwrap() == "changed".into());
        assert!(env.get(three, "foo").unwrap() == "three".into());
    }

    #[test]
    fn release_and_reuse() {
        let mut env = Environment::new();
        let block = env.new_scope(GLOBAL_SCOPE);
        env.release(block);
        assert_eq!(env.live_scopes(), 1);
        let reused = env.new_scope(GLOBAL_SCOPE);
        assert_eq!(reused, block);
        env.release(GLOBAL_SCOPE);
        assert_eq!(env.live_scopes(), 2);
    }

    #[test]
    fn captured_scopes_survive() {
        let mut env = Environment::new();
        let outer = env.new_scope(GLOBAL_SCOPE);
        let inner = env.new_scope(outer);
        env.define(outer, "count", 1.0.into());
        env.capture(inner);
        env.release(inner);
        env.release(outer);
        assert_eq!(env.live_scopes(), 3);
        assert!(env.get(inner, "count").unwrap() == 1.0.into());
    }

    fn closure_over(scope: ScopeHandle) -> LoxValue {
        let decl = FunctionDecl {
            name: Token::identifier("f", 1),
            params: vec![],
            body: vec![],
        };
        LoxFunction::new(Rc::new(decl), scope, false).into()
    }

    #[test]
    fn collect_unreachable() {
        let mut env = Environment::new();
        let kept = env.new_scope(GLOBAL_SCOPE);
        env.define(kept, "x", 1.0.into());
        env.capture(kept);
        env.define(GLOBAL_SCOPE, "f", closure_over(kept));

        let dropped = env.new_scope(GLOBAL_SCOPE);
        let inner = env.new_scope(dropped);
        env.capture(inner);
        env.define(inner, "self", closure_over(inner));

        let held = env.new_scope(GLOBAL_SCOPE);
        env.capture(held);
        let temporary = closure_over(held);

        assert_eq!(env.live_scopes(), 5);
        assert_eq!(env.collect(&[GLOBAL_SCOPE], &[temporary]), 2);
        assert_eq!(env.live_scopes(), 3);
        assert!(env.get(kept, "x").unwrap() == 1.0.into());
        assert!(env.get(held, "x").is_err());
        assert_eq!(env.peak_scopes(), 5);

        assert_eq!(env.collect(&[GLOBAL_SCOPE], &[]), 1);
        assert_eq!(env.live_scopes(), 2);
    }

    #[test]
    fn collect_follows_instances() {
        let mut env = Environment::new();
        let method_scope = env.new_scope(GLOBAL_SCOPE);
        env.capture(method_scope);
        let mut methods = HashMap::new();
        let decl = FunctionDecl {
            name: Token::identifier("m", 1),
            params: vec![],
            body: vec![],
        };
        methods.insert(
            "m".to_string(),
            Rc::new(LoxFunction::new(Rc::new(decl), method_scope, false)),
        );
        let class = Rc::new(LoxClass {
            name: "A".into(),
            superclass: None,
            methods,
        });
        let instance = Rc::new(RefCell::new(LoxObject::new(class)));
        // an instance whose field points back at itself
        instance.borrow_mut().set("me", instance.clone().into());
        env.define(GLOBAL_SCOPE, "a", instance.into());

        assert_eq!(env.collect(&[GLOBAL_SCOPE], &[]), 0);
        assert_eq!(env.live_scopes(), 2);
        env.define(GLOBAL_SCOPE, "a", LoxValue::Nil);
        assert_eq!(env.collect(&[GLOBAL_SCOPE], &[]), 1);
    }
}
