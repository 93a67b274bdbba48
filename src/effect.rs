//! Deferred, composable, fallible computations.
//!
//! An [`Effect`] wraps work that only happens when [`Effect::run`] is called
//! with a [`Context`]. Building a chain out of [`Effect::of`], [`lift`],
//! [`Effect::bind`], [`all`] and [`Effect::or`] performs no I/O; running the
//! same effect twice repeats the underlying work.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};

/// Shared cancellation flag. A child token reports cancelled when it or any
/// ancestor has been cancelled; cancelling a child leaves the parent alone.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    parent: Option<Arc<CancelToken>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a token that is cancelled together with `self`.
    pub fn child(&self) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Arc::new(self.clone())),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }
}

/// Execution context handed to every effect.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: CancelToken,
}

impl Context {
    /// A fresh, never-cancelled root context.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_cancel(cancel: CancelToken) -> Self {
        Self { cancel }
    }

    /// A child scope: cancelled when `self` is, or when its own token is.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child(),
        }
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

type RunFn<T> = dyn Fn(&Context) -> Result<T>;

/// A deferred computation `Context -> Result<T>`.
pub struct Effect<T> {
    run: Box<RunFn<T>>,
}

impl<T: 'static> Effect<T> {
    pub fn new(f: impl Fn(&Context) -> Result<T> + 'static) -> Self {
        Self { run: Box::new(f) }
    }

    /// Always succeeds with a clone of `value`.
    pub fn of(value: T) -> Self
    where
        T: Clone,
    {
        Self::new(move |_| Ok(value.clone()))
    }

    /// Execute the effect. A cancelled context fails without doing any work.
    pub fn run(&self, ctx: &Context) -> Result<T> {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }
        (self.run)(ctx)
    }

    /// Run `self`, then feed its value to `f` and run the resulting effect.
    /// `f` is never called when `self` fails.
    pub fn bind<U: 'static>(self, f: impl Fn(T) -> Effect<U> + 'static) -> Effect<U> {
        Effect::new(move |ctx| {
            let value = self.run(ctx)?;
            f(value).run(ctx)
        })
    }

    /// Run `self`; on failure run `fallback` instead.
    ///
    /// Cancellation is not a failure that a fallback can recover from.
    pub fn or(self, fallback: Effect<T>) -> Effect<T> {
        Effect::new(move |ctx| match self.run(ctx) {
            Ok(value) => Ok(value),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(_) => fallback.run(ctx),
        })
    }
}

/// Turn a pure fallible function into an effect-to-effect transformer.
pub fn lift<T, U, F>(f: F) -> impl Fn(Effect<T>) -> Effect<U>
where
    T: 'static,
    U: 'static,
    F: Fn(T) -> Result<U> + 'static,
{
    let f = Arc::new(f);
    move |effect: Effect<T>| {
        let f = Arc::clone(&f);
        Effect::new(move |ctx| f(effect.run(ctx)?))
    }
}

/// Run `effects` in order, collecting their values. The first failure aborts
/// the remainder and discards what was collected.
pub fn all<T: 'static>(effects: Vec<Effect<T>>) -> Effect<Vec<T>> {
    Effect::new(move |ctx| {
        let mut values = Vec::with_capacity(effects.len());
        for effect in &effects {
            values.push(effect.run(ctx)?);
        }
        Ok(values)
    })
}

/// Compose two fallible functions; `g` only runs when `f` succeeds.
pub fn compose<T, U, V, E>(
    f: impl Fn(T) -> std::result::Result<U, E>,
    g: impl Fn(U) -> std::result::Result<V, E>,
) -> impl Fn(T) -> std::result::Result<V, E> {
    move |input| f(input).and_then(&g)
}
