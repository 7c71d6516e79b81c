//! Single-resolution promises
//!
//! A [`Promise`] wraps a value that a resolver closure produces at some later
//! tick. The resolver is driven by a one-shot backing task: it runs once per
//! qualifying tick until it calls [`Resolver::resolve`], at which point the
//! backing task exhausts and every registered continuation fires in
//! registration order. Continuations registered after resolution fire
//! immediately.
//!
//! Resolution is monotonic — the first `resolve` wins and later calls are
//! ignored. A promise that never resolves leaves its backing task alive
//! forever; callers must bound that themselves by stopping
//! [`Promise::task`].

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use super::task::{FnRoutine, StepResult};
use super::{Scheduler, TaskId};

struct PromiseState<T> {
    value: Option<T>,
    callbacks: Vec<Box<dyn FnMut(&T)>>,
}

/// Resolution handle passed to the resolver closure.
pub struct Resolver<T> {
    state: Rc<RefCell<PromiseState<T>>>,
}

impl<T: Clone> Resolver<T> {
    /// Resolve the promise, firing pending continuations in registration
    /// order. Ignored if the promise already resolved.
    pub fn resolve(&self, value: T) {
        let callbacks = {
            let mut state = self.state.borrow_mut();
            if state.value.is_some() {
                return;
            }
            state.value = Some(value.clone());
            std::mem::take(&mut state.callbacks)
        };
        // The borrow is released before continuations run, so a continuation
        // may register further continuations (they fire immediately).
        for mut cb in callbacks {
            cb(&value);
        }
    }
}

/// A single-resolution future produced by a per-tick resolver.
pub struct Promise<T> {
    state: Rc<RefCell<PromiseState<T>>>,
    task: TaskId,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            task: self.task,
        }
    }
}

impl<T: Clone + 'static> Promise<T> {
    /// Create a promise whose resolver runs once per qualifying tick of a
    /// one-shot backing task until it resolves.
    pub fn spawn<C: 'static>(
        scheduler: &mut Scheduler<C>,
        mut resolver_fn: impl FnMut(&mut C, &Resolver<T>) + 'static,
    ) -> Self {
        let state = Rc::new(RefCell::new(PromiseState {
            value: None,
            callbacks: Vec::new(),
        }));
        let resolver = Resolver {
            state: Rc::clone(&state),
        };
        let polled = Rc::clone(&state);
        let task = scheduler
            .run_task(FnRoutine::new(move |ctx: &mut C, _dt: Duration| {
                if polled.borrow().value.is_none() {
                    resolver_fn(ctx, &resolver);
                }
                if polled.borrow().value.is_some() {
                    Ok(StepResult::Done)
                } else {
                    Ok(StepResult::Continue)
                }
            }))
            .once()
            .id();
        Self { state, task }
    }

    /// Register a continuation. Fires immediately if already resolved.
    pub fn then(&self, mut cb: impl FnMut(&T) + 'static) -> &Self {
        let resolved = self.state.borrow().value.clone();
        match resolved {
            Some(value) => cb(&value),
            None => self.state.borrow_mut().callbacks.push(Box::new(cb)),
        }
        self
    }

    /// Resolve with the ordered values of every child once all have resolved.
    ///
    /// Children keep being driven by their own backing tasks; the combinator
    /// only observes them.
    pub fn all<C: 'static>(
        scheduler: &mut Scheduler<C>,
        promises: Vec<Promise<T>>,
    ) -> Promise<Vec<T>> {
        Promise::spawn(scheduler, move |_ctx, resolver| {
            if promises.iter().all(|p| p.is_done()) {
                let values = promises.iter().filter_map(|p| p.value()).collect();
                resolver.resolve(values);
            }
        })
    }

    pub fn is_done(&self) -> bool {
        self.state.borrow().value.is_some()
    }

    /// The resolved value, if any.
    pub fn value(&self) -> Option<T> {
        self.state.borrow().value.clone()
    }

    /// The backing task driving the resolver. Stop it to bound a promise
    /// that may never resolve.
    pub fn task(&self) -> TaskId {
        self.task
    }
}
