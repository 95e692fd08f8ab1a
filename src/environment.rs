use core::{cell::RefCell, fmt};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    ast::Name,
    error::EvaluationError,
    value::{defer, release, Garbage, Value},
};

pub(crate) type EnvironmentResult<T> = Result<T, EvaluationError>;


struct Frame {
    bindings: IndexMap<Name, RefCell<Value>>,
    parent: Option<Environment>,
}

impl Frame {
    /// Moves everything this frame still owns onto `pending`.
    fn unlink(&mut self, pending: &mut Vec<Garbage>) {
        for (_, cell) in self.bindings.drain(..) {
            defer(pending, Garbage::Value(cell.into_inner()));
        }
        if let Some(parent) = self.parent.take() {
            defer(pending, Garbage::Frame(parent));
        }
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.unlink(&mut pending);
        release(pending);
    }
}

/// A chain of lexical frames. Cloning shares the frame: closures and pending
/// continuations all alias the same cells.
///
/// The set of names in a frame is fixed when the frame is created, but every
/// cell can be overwritten, which is what `set!` and `letrec` rely on.
#[derive(Clone)]
pub struct Environment(Rc<Frame>);

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Values are left out, a closure stored in its own frame would recurse forever
        f.debug_list()
            .entries(self.frames().map(|frame| frame.bindings.keys().collect::<Vec<_>>()))
            .finish()
    }
}

impl Environment {
    /// The empty root. Every lookup that reaches it fails.
    pub fn empty() -> Self {
        Self(Rc::new(Frame { bindings: IndexMap::new(), parent: None }))
    }

    fn frames(&self) -> impl Iterator<Item = &Frame> {
        let mut next = Some(&*self.0);
        core::iter::from_fn(move || {
            let frame = next?;
            next = frame.parent.as_ref().map(|parent| &*parent.0);
            Some(frame)
        })
    }

    /// Allocates a new frame binding `names` to `values` on top of `self`.
    pub fn extend(&self, names: &[Name], values: Vec<Value>) -> EnvironmentResult<Self> {
        if names.len() != values.len() {
            return Err(EvaluationError::MalformedProgram(format!(
                "cannot bind {} name(s) to {} value(s)", names.len(), values.len()
            )));
        }

        let bindings: IndexMap<_, _> = names.iter().cloned()
            .zip(values.into_iter().map(RefCell::new))
            .collect();
        if bindings.len() != names.len() {
            return Err(EvaluationError::MalformedProgram("duplicate name in a single frame".to_owned()));
        }

        Ok(Self(Rc::new(Frame { bindings, parent: Some(self.clone()) })))
    }

    pub fn lookup(&self, name: &str) -> EnvironmentResult<Value> {
        self.frames()
            .find_map(|frame| frame.bindings.get(name))
            .map(|cell| cell.borrow().clone())
            .ok_or_else(|| EvaluationError::UnboundName(name.to_owned()))
    }

    /// Overwrites the nearest binding of `name`.
    pub fn assign(&self, name: &str, value: Value) -> EnvironmentResult<()> {
        let cell = self.frames()
            .find_map(|frame| frame.bindings.get(name))
            .ok_or_else(|| EvaluationError::UnboundName(name.to_owned()))?;
        // The previous value is dropped after the borrow ends
        drop(cell.replace(value));
        Ok(())
    }

    /// Number of frames above the empty root.
    pub(crate) fn depth(&self) -> usize {
        self.frames().count() - 1
    }

    pub(crate) fn is_last_owner(&self) -> bool {
        Rc::strong_count(&self.0) == 1
    }

    /// Empties the frame if this is its last handle, leaving its contents on `pending`.
    pub(crate) fn unlink(mut self, pending: &mut Vec<Garbage>) {
        if let Some(frame) = Rc::get_mut(&mut self.0) {
            frame.unlink(pending);
        }
    }
}
