//! Given-When-Then harness for reducers.
//!
//! A reducer is a pure function of state, action and environment, so a test
//! only needs to build those three, call it once and look at the state and
//! the returned effects. [`ReducerTest`] strings those steps together;
//! [`assertions`] covers the effect shapes the order reducer produces
//! (chained futures and timers).

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use librix_core::{effect::Effect, reducer::Reducer};
use std::time::Duration;

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use librix_testing::{assertions, ReducerTest};
///
/// ReducerTest::new(OrderReducer::new())
///     .with_env(env)
///     .given_state(OrderState::new(pending_order))
///     .when_action(accept)
///     .then_state(|state| assert_eq!(state.order.status, OrderStatus::Accepted))
///     .then_effects(|effects| {
///         let (delay, _) = assertions::assert_has_delay_effect(effects);
///         assert_eq!(delay, Duration::from_secs(300));
///     })
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    action: Option<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
    S: Clone,
    A: Clone,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            action: None,
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Set the action to test (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.action = Some(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the resulting effects (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        let action = self.action.expect("Action must be set with when_action()");

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        // Execute reducer
        let effects = self.reducer.reduce(&mut state, action, &env);

        // Run state assertions
        for assertion in self.state_assertions {
            assertion(&state);
        }

        // Run effect assertions
        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use super::Duration;
    use librix_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if effects is not empty.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.is_empty() || matches!(effects, [Effect::None]),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }

    /// Assert that effects schedule a delayed action, looking inside
    /// sequential and parallel compositions
    ///
    /// Returns the delay and a reference to the scheduled action.
    ///
    /// # Panics
    ///
    /// Panics if no `Delay` effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_delay_effect<A: std::fmt::Debug>(effects: &[Effect<A>]) -> (Duration, &A) {
        effects
            .iter()
            .find_map(Effect::delayed_action)
            .unwrap_or_else(|| panic!("Expected a Delay effect, but found: {effects:?}"))
    }

    /// Assert that effects schedule nothing for later
    ///
    /// # Panics
    ///
    /// Panics if any `Delay` effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_delay_effect<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(|e| e.delayed_action().is_none()),
            "Expected no Delay effect, but found: {effects:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use librix_core::effect::Effect;
    use librix_core::reducer::Reducer;

    /// A shelf slot that can be held for a while and then released.
    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Slot {
        Free,
        Held,
    }

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum SlotAction {
        Hold,
        Release,
    }

    struct SlotReducer;

    struct SlotEnv {
        hold_for: Duration,
    }

    impl Reducer for SlotReducer {
        type State = Slot;
        type Action = SlotAction;
        type Environment = SlotEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> librix_core::SmallVec<[Effect<Self::Action>; 4]> {
            let held = *state == Slot::Held;
            match (action, held) {
                (SlotAction::Hold, false) => {
                    *state = Slot::Held;
                    librix_core::smallvec![Effect::chain(vec![
                        Effect::None,
                        Effect::delay(env.hold_for, SlotAction::Release),
                    ])]
                },
                (SlotAction::Release, true) => {
                    *state = Slot::Free;
                    librix_core::smallvec![]
                },
                _ => librix_core::smallvec![Effect::None],
            }
        }
    }

    fn env() -> SlotEnv {
        SlotEnv {
            hold_for: Duration::from_secs(300),
        }
    }

    #[test]
    fn test_hold_arms_release_timer() {
        ReducerTest::new(SlotReducer)
            .with_env(env())
            .given_state(Slot::Free)
            .when_action(SlotAction::Hold)
            .then_state(|slot| assert_eq!(*slot, Slot::Held))
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                let (delay, action) = assertions::assert_has_delay_effect(effects);
                assert_eq!(delay, Duration::from_secs(300));
                assert_eq!(action, &SlotAction::Release);
            })
            .run();
    }

    #[test]
    fn test_release_frees_without_effects() {
        ReducerTest::new(SlotReducer)
            .with_env(env())
            .given_state(Slot::Held)
            .when_action(SlotAction::Release)
            .then_state(|slot| assert_eq!(*slot, Slot::Free))
            .then_effects(|effects| {
                assertions::assert_no_effects(effects);
                assertions::assert_no_delay_effect(effects);
            })
            .run();
    }

    #[test]
    fn test_ignored_action_yields_none_effect() {
        ReducerTest::new(SlotReducer)
            .with_env(env())
            .given_state(Slot::Free)
            .when_action(SlotAction::Release)
            .then_state(|slot| assert_eq!(*slot, Slot::Free))
            .then_effects(|effects| assertions::assert_no_effects(effects))
            .run();
    }

    #[test]
    fn test_future_effect_is_detected() {
        let effects = [Effect::<SlotAction>::future(async { None })];
        assertions::assert_has_future_effect(&effects);
    }
}
