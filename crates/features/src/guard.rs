//! Edge guards.
//!
//! A guard sits on a parent -> child edge and decides, each time the parent is
//! refreshed, whether the change is significant enough to recompute the child.

use crate::feature::Feature;
use openbook_core::Value;

type GuardFn = Box<dyn FnMut(&dyn Feature) -> bool + Send>;

/// Change test evaluated against the parent of an edge.
pub struct Guard {
    check: GuardFn,
}

impl Guard {
    /// Guard from an arbitrary predicate over the parent.
    pub fn new<F>(check: F) -> Self
    where
        F: FnMut(&dyn Feature) -> bool + Send + 'static,
    {
        Self {
            check: Box::new(check),
        }
    }

    /// Fires on every parent refresh.
    pub fn always() -> Self {
        Self::new(|_| true)
    }

    /// Fires when the parent's value differs from the copy cached at the last firing.
    ///
    /// The cache starts undefined, so the parent's first defined value fires.
    pub fn on_change() -> Self {
        Self::threshold(0.0)
    }

    /// Like [`Guard::on_change`], but ignores moves of at most `eps`.
    ///
    /// The cache only advances when the guard fires, so slow drift still
    /// fires once it accumulates past `eps`.
    pub fn threshold(eps: f64) -> Self {
        let eps = eps.abs();
        let mut last = Value::Undefined;
        Self::new(move |parent| {
            let current = parent.value();
            if last.differs_from(current, eps) {
                last = current;
                true
            } else {
                false
            }
        })
    }

    /// Evaluate the guard against the refreshed parent.
    #[inline]
    pub fn check(&mut self, parent: &dyn Feature) -> bool {
        (self.check)(parent)
    }
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Guard")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Value);

    impl Feature for Fixed {
        fn name(&self) -> &str {
            "Fixed"
        }

        fn value(&self) -> Value {
            self.0
        }
    }

    #[test]
    fn test_on_change_fires_once_per_value() {
        let mut guard = Guard::on_change();
        assert!(!guard.check(&Fixed(Value::Undefined)));
        assert!(guard.check(&Fixed(Value::Defined(100.0))));
        assert!(!guard.check(&Fixed(Value::Defined(100.0))));
        assert!(guard.check(&Fixed(Value::Defined(101.0))));
    }

    #[test]
    fn test_threshold_ignores_jitter() {
        let mut guard = Guard::threshold(0.5);
        assert!(guard.check(&Fixed(Value::Defined(100.0))));
        assert!(!guard.check(&Fixed(Value::Defined(100.3))));
        assert!(!guard.check(&Fixed(Value::Defined(99.6))));
        // Drift relative to the cached 100.0, not the previous sample.
        assert!(guard.check(&Fixed(Value::Defined(100.6))));
    }

    #[test]
    fn test_threshold_fires_on_becoming_undefined() {
        let mut guard = Guard::threshold(1.0);
        assert!(guard.check(&Fixed(Value::Defined(5.0))));
        assert!(guard.check(&Fixed(Value::Undefined)));
    }

    #[test]
    fn test_always_and_custom() {
        let mut always = Guard::always();
        assert!(always.check(&Fixed(Value::Undefined)));

        let mut positive = Guard::new(|p| p.value().get().map_or(false, |v| v > 0.0));
        assert!(positive.check(&Fixed(Value::Defined(1.0))));
        assert!(!positive.check(&Fixed(Value::Defined(-1.0))));
    }
}
