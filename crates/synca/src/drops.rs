/// RunOnDrop implements a type that runs a function when
/// it gets dropped, providing a similar convention to go's defer.
///
/// The function also runs while unwinding from a panic, which is what makes
/// it suitable for always signalling completion of an actor.
#[must_use = "the function runs when the guard is dropped; binding it to `_` drops it at once"]
pub struct RunOnDrop<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> RunOnDrop<F> {
    pub fn new(f: F) -> Self {
        Self(Some(f))
    }

    /// `cancel` disarms the guard so the function never runs.
    pub fn cancel(mut self) {
        self.0 = None;
    }
}

impl<F: FnOnce()> Drop for RunOnDrop<F> {
    fn drop(&mut self) {
        if let Some(cb) = self.0.take() {
            cb();
        }
    }
}
