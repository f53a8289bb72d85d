//! Subscription primitive shared by registry-level and channel-level
//! observers: a callback holder with an optional key-interest predicate.

use std::sync::Arc;

type Callback<T> = Box<dyn Fn(&T) + Send + Sync>;
type KeyInterest = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Holds one callback and delivers every value it is notified with.
///
/// An observer may optionally declare which event keys it cares about;
/// channels use that declaration to answer `is_observed` so producers can
/// skip payload construction when nobody would read it. An observer without
/// an interest predicate counts as interested in every key.
pub struct Observer<T> {
    callback: Callback<T>,
    interest: Option<KeyInterest>,
}

impl<T> Observer<T> {
    /// Observer interested in every key.
    pub fn new(callback: impl Fn(&T) + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            callback: Box::new(callback),
            interest: None,
        })
    }

    /// Observer that only acts on keys accepted by `interest`.
    pub fn with_interest(
        interest: impl Fn(&str) -> bool + Send + Sync + 'static,
        callback: impl Fn(&T) + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            callback: Box::new(callback),
            interest: Some(Box::new(interest)),
        })
    }

    pub fn wants(&self, key: &str) -> bool {
        self.interest.as_ref().map_or(true, |accepts| accepts(key))
    }

    pub fn notify(&self, value: &T) {
        (self.callback)(value);
    }
}
