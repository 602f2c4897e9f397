//! Lifecycle callback lists attached to every handle.
//!
//! Five ordered lists: `close`, `preclose`, `evalstart`, `eval` and
//! `evalend`. The close lists hold `FnOnce` callbacks and are drained when
//! they fire, so each runs at most once; one registered while its list is
//! firing runs before the firing returns. The eval lists are `FnMut` and
//! survive repeated evaluations.
//!
//! Every callback in a list runs even when an earlier one fails; the first
//! failure is what the triggering operation reports.

use std::sync::{Mutex, PoisonError};

use super::{EvalStatus, Image};
use crate::error::ImageError;

/// Callback fired once at preclose or close time.
pub type CloseFn = Box<dyn FnOnce(&Image) -> Result<(), ImageError> + Send>;

/// Callback fired at evaluation start, on progress, and at evaluation end.
pub type EvalFn = Box<dyn FnMut(&Image, &EvalStatus) -> Result<(), ImageError> + Send>;

#[derive(Default)]
pub(crate) struct Callbacks {
    close: Mutex<Vec<CloseFn>>,
    preclose: Mutex<Vec<CloseFn>>,
    evalstart: Mutex<Vec<EvalFn>>,
    eval: Mutex<Vec<EvalFn>>,
    evalend: Mutex<Vec<EvalFn>>,
}

/// Which eval list to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EvalPhase {
    Start,
    Progress,
    End,
}

impl Callbacks {
    pub(crate) fn add_close(&self, callback: CloseFn) {
        lock(&self.close).push(callback);
    }

    pub(crate) fn add_preclose(&self, callback: CloseFn) {
        lock(&self.preclose).push(callback);
    }

    pub(crate) fn add_eval(&self, phase: EvalPhase, callback: EvalFn) {
        lock(self.eval_list(phase)).push(callback);
    }

    pub(crate) fn fire_close(&self, image: &Image) -> Result<(), ImageError> {
        fire_once(&self.close, image)
    }

    pub(crate) fn fire_preclose(&self, image: &Image) -> Result<(), ImageError> {
        fire_once(&self.preclose, image)
    }

    pub(crate) fn fire_eval(
        &self,
        phase: EvalPhase,
        image: &Image,
        status: &EvalStatus,
    ) -> Result<(), ImageError> {
        let list = self.eval_list(phase);

        // Run outside the lock so callbacks may register more callbacks
        let mut callbacks = std::mem::take(&mut *lock(list));
        let mut result = Ok(());
        for callback in callbacks.iter_mut() {
            let outcome = callback(image, status);
            if result.is_ok() {
                result = outcome;
            }
        }

        let mut guard = lock(list);
        callbacks.append(&mut guard);
        *guard = callbacks;

        result
    }

    /// Move every eval callback into `other`, after any it already has.
    pub(crate) fn move_eval_to(&self, other: &Callbacks) {
        for phase in [EvalPhase::Start, EvalPhase::Progress, EvalPhase::End] {
            let mut moved = std::mem::take(&mut *lock(self.eval_list(phase)));
            lock(other.eval_list(phase)).append(&mut moved);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> [usize; 5] {
        [
            lock(&self.close).len(),
            lock(&self.preclose).len(),
            lock(&self.evalstart).len(),
            lock(&self.eval).len(),
            lock(&self.evalend).len(),
        ]
    }

    fn eval_list(&self, phase: EvalPhase) -> &Mutex<Vec<EvalFn>> {
        match phase {
            EvalPhase::Start => &self.evalstart,
            EvalPhase::Progress => &self.eval,
            EvalPhase::End => &self.evalend,
        }
    }
}

fn fire_once(list: &Mutex<Vec<CloseFn>>, image: &Image) -> Result<(), ImageError> {
    let mut result = Ok(());
    // Drain until empty; callbacks may add to the list they are fired from
    loop {
        let callbacks = std::mem::take(&mut *lock(list));
        if callbacks.is_empty() {
            return result;
        }
        for callback in callbacks {
            let outcome = callback(image);
            if result.is_ok() {
                result = outcome;
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
