//! Lexically nested scope, shared in shape (not in instance) by the
//! analyzer and the interpreter (§3, §5).
//!
//! Per the design notes' "parent-pointer scope" entry, this is implemented
//! as an explicit stack of frames rather than a chain with a mutable leaf:
//! [ScopeStack] owns a `Vec` of frame handles, and entering/leaving a
//! construct is a push/pop pair (or, via [ScopeStack::with_child], an
//! RAII guard that pops on drop -- including when the closure returns
//! `Err`, which is what keeps §5's "every construct restores the previous
//! scope on every exit path" invariant true without remembering to pop by
//! hand at every error site).
//!
//! The analyzer and interpreter each get their own, independently
//! instantiated `ScopeStack` (generic over whatever they want to bind names
//! to): the analyzer's binds source names to resolved type/arity
//! information, the interpreter's binds them to live runtime cells. They
//! never share an instance, matching §4.4's "fresh scope stack, distinct
//! from the analyzer's".
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One nested binding environment. `V` is whatever a variable name resolves
/// to; `F` is whatever a `(name, arity)` pair resolves to.
pub struct Scope<V, F> {
    parent: Option<ScopeHandle<V, F>>,
    variables: HashMap<String, V>,
    functions: HashMap<(String, usize), F>,
}

pub type ScopeHandle<V, F> = Rc<RefCell<Scope<V, F>>>;

impl<V, F> Scope<V, F> {
    fn new(parent: Option<ScopeHandle<V, F>>) -> Self {
        Scope {
            parent,
            variables: HashMap::new(),
            functions: HashMap::new(),
        }
    }
}

/// Owns the chain of currently-open scopes as an explicit stack. The last
/// element of `frames` is the innermost, currently active scope.
pub struct ScopeStack<V, F> {
    frames: Vec<ScopeHandle<V, F>>,
}

impl<V: Clone, F: Clone> ScopeStack<V, F> {
    /// Creates a stack containing a single root scope (no parent).
    pub fn new() -> Self {
        let root = Rc::new(RefCell::new(Scope::new(None)));
        ScopeStack { frames: vec![root] }
    }

    /// The innermost active scope.
    pub fn current(&self) -> ScopeHandle<V, F> {
        self.frames
            .last()
            .expect("scope stack must never be empty")
            .clone()
    }

    /// The outermost scope of this stack (index `0`). For the interpreter's
    /// global `ScopeStack` this is the scope globals and functions are
    /// bound in; see [ScopeStack::child_of].
    pub fn root(&self) -> ScopeHandle<V, F> {
        self.frames
            .first()
            .expect("scope stack must never be empty")
            .clone()
    }

    /// Creates a stack containing a single scope whose *parent* is
    /// `parent`. This is how the interpreter captures a function's defining
    /// scope (§3's "Function value ... an invocable body and captured
    /// defining scope"): calling the function runs its body in a fresh
    /// frame chained off the scope that was active when the function was
    /// bound, not off the caller's locals.
    pub fn child_of(parent: &ScopeHandle<V, F>) -> Self {
        let frame = Rc::new(RefCell::new(Scope::new(Some(parent.clone()))));
        ScopeStack { frames: vec![frame] }
    }

    /// How many scopes are currently open, including the root. Used by
    /// tests to confirm §5's "pointer restored after any run" property.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Pushes a fresh child scope whose parent is the current scope.
    pub fn push_child(&mut self) {
        let parent = self.current();
        self.frames.push(Rc::new(RefCell::new(Scope::new(Some(parent)))));
    }

    /// Pops the innermost scope. Panics if called with only the root scope
    /// open -- that would indicate a push/pop mismatch in the caller.
    pub fn pop(&mut self) {
        assert!(self.frames.len() > 1, "cannot pop the root scope");
        self.frames.pop();
    }

    /// Runs `body` inside a freshly pushed child scope, popping it
    /// afterwards regardless of whether `body` returned `Ok` or `Err`.
    /// This is the scoped-acquisition helper §7 calls for: the stack stays
    /// consistent even when `body` bails out early with `?`.
    pub fn with_child<T, E>(&mut self, body: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E> {
        self.push_child();
        let result = body(self);
        self.pop();
        result
    }

    /// Defines a variable in the *current* scope. Returns `false` (and
    /// leaves the scope unchanged) if `name` is already bound in the
    /// current scope -- redefinition in the same scope is an error (§3);
    /// callers turn that into their own error type.
    pub fn define_variable(&mut self, name: &str, binding: V) -> bool {
        let current = self.current();
        let mut scope = current.borrow_mut();
        if scope.variables.contains_key(name) {
            return false;
        }
        scope.variables.insert(name.to_owned(), binding);
        true
    }

    /// Defines a function in the *current* scope, keyed by `(name, arity)`.
    pub fn define_function(&mut self, name: &str, arity: usize, binding: F) -> bool {
        let current = self.current();
        let mut scope = current.borrow_mut();
        let key = (name.to_owned(), arity);
        if scope.functions.contains_key(&key) {
            return false;
        }
        scope.functions.insert(key, binding);
        true
    }

    /// Walks the parent chain starting at the current scope; first hit
    /// wins. Returns `None` if no scope in the chain binds `name`.
    pub fn lookup_variable(&self, name: &str) -> Option<V> {
        let mut scope = Some(self.current());
        while let Some(handle) = scope {
            let borrowed = handle.borrow();
            if let Some(v) = borrowed.variables.get(name) {
                return Some(v.clone());
            }
            scope = borrowed.parent.clone();
        }
        None
    }

    /// Walks the parent chain looking for a `(name, arity)` function
    /// binding.
    pub fn lookup_function(&self, name: &str, arity: usize) -> Option<F> {
        let key = (name.to_owned(), arity);
        let mut scope = Some(self.current());
        while let Some(handle) = scope {
            let borrowed = handle.borrow();
            if let Some(f) = borrowed.functions.get(&key) {
                return Some(f.clone());
            }
            scope = borrowed.parent.clone();
        }
        None
    }
}

impl<V: Clone, F: Clone> Default for ScopeStack<V, F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lookup_walks_up_the_parent_chain() {
        let mut stack: ScopeStack<i32, ()> = ScopeStack::new();
        stack.define_variable("x", 1);
        stack.push_child();
        stack.define_variable("y", 2);
        assert_eq!(stack.lookup_variable("x"), Some(1));
        assert_eq!(stack.lookup_variable("y"), Some(2));
        stack.pop();
        assert_eq!(stack.lookup_variable("y"), None);
    }

    #[test]
    fn redefinition_in_same_scope_is_rejected() {
        let mut stack: ScopeStack<i32, ()> = ScopeStack::new();
        assert!(stack.define_variable("x", 1));
        assert!(!stack.define_variable("x", 2));
    }

    #[test]
    fn shadowing_in_a_nested_scope_is_allowed() {
        let mut stack: ScopeStack<i32, ()> = ScopeStack::new();
        stack.define_variable("x", 1);
        stack.push_child();
        assert!(stack.define_variable("x", 2));
        assert_eq!(stack.lookup_variable("x"), Some(2));
        stack.pop();
        assert_eq!(stack.lookup_variable("x"), Some(1));
    }

    #[test]
    fn with_child_pops_even_on_error() {
        let mut stack: ScopeStack<i32, ()> = ScopeStack::new();
        let depth_before = stack.depth();
        let result: Result<(), &str> = stack.with_child(|s| {
            s.define_variable("x", 1);
            Err("boom")
        });
        assert!(result.is_err());
        assert_eq!(stack.depth(), depth_before);
    }

    #[test]
    fn child_of_sees_the_parent_but_not_its_siblings() {
        let mut root: ScopeStack<i32, ()> = ScopeStack::new();
        root.define_variable("g", 1);
        let root_handle = root.root();

        let mut call_frame: ScopeStack<i32, ()> = ScopeStack::child_of(&root_handle);
        assert_eq!(call_frame.lookup_variable("g"), Some(1));
        call_frame.define_variable("local", 2);
        assert_eq!(root.lookup_variable("local"), None);
    }

    #[test]
    fn functions_are_keyed_by_name_and_arity() {
        let mut stack: ScopeStack<(), &'static str> = ScopeStack::new();
        assert!(stack.define_function("f", 1, "one-arg"));
        assert!(stack.define_function("f", 2, "two-arg"));
        assert_eq!(stack.lookup_function("f", 1), Some("one-arg"));
        assert_eq!(stack.lookup_function("f", 2), Some("two-arg"));
        assert_eq!(stack.lookup_function("f", 3), None);
    }
}
