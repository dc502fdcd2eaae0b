//! Subscription teardown that runs at most once

type Cancel = Box<dyn FnOnce() + Send>;

/// Owns a subscription's cancel callback
///
/// The callback runs on the first `run`, or on drop if `run` never happened.
pub struct Teardown(Option<Cancel>);

impl Teardown {
    pub fn new(cancel: Cancel) -> Self {
        Self(Some(cancel))
    }

    pub fn run(&mut self) {
        if let Some(cancel) = self.0.take() {
            cancel();
        }
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.run();
    }
}
