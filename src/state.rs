//! In-memory neuron state model
//!
//! A `NeuroState` holds two independent groups of named, integer-valued
//! neurons (motor and sensory) plus version metadata. Neurons are only ever
//! set or created; nothing removes one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Motor neurons pre-populated at first bootstrap (command interneurons
/// driving locomotion).
const DEFAULT_MOTOR_NEURONS: &[&str] = &["AVA", "AVB", "AVD", "AVE", "PVC"];

/// Sensory neurons pre-populated at first bootstrap.
const DEFAULT_SENSORY_NEURONS: &[&str] = &["ASE", "ASH", "AWA", "AWB", "AFD"];

/// Neuron group selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeuronGroup {
    Motor,
    Sensory,
}

/// A single neuron assignment as the model emits it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeuronUpdate {
    pub neuron: String,
    pub value: i64,
}

/// The model's instruction for one turn: either leave the state alone or
/// merge a list of per-neuron assignments into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateCommand {
    NoChange,
    Apply {
        motor: Vec<NeuronUpdate>,
        sensory: Vec<NeuronUpdate>,
    },
}

/// Complete neuron state with version metadata
///
/// Maps are ordered so the serialized form is canonical regardless of the
/// order neurons were inserted in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuroState {
    pub state_count: u64,
    pub updated_at: DateTime<Utc>,
    pub motor_neurons: BTreeMap<String, i64>,
    pub sensory_neurons: BTreeMap<String, i64>,
}

impl NeuroState {
    /// Build the initial state from the default neuron catalog, all values
    /// zeroed.
    pub fn with_default_catalog() -> Self {
        let zeroed = |names: &[&str]| {
            names
                .iter()
                .map(|n| ((*n).to_string(), 0))
                .collect::<BTreeMap<_, _>>()
        };

        Self {
            state_count: 0,
            updated_at: Utc::now(),
            motor_neurons: zeroed(DEFAULT_MOTOR_NEURONS),
            sensory_neurons: zeroed(DEFAULT_SENSORY_NEURONS),
        }
    }

    /// Canonical JSON form, used for seed-prompt rendering.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Set one neuron's value in the given group. Creates the neuron if it
    /// does not exist yet; never deletes.
    pub fn set(&mut self, group: NeuronGroup, name: &str, value: i64) {
        let neurons = match group {
            NeuronGroup::Motor => &mut self.motor_neurons,
            NeuronGroup::Sensory => &mut self.sensory_neurons,
        };
        neurons.insert(name.to_string(), value);
    }

    /// Merge the given updates into both groups, then bump the version
    /// counter and timestamp. This is a per-key merge: neurons not named in
    /// the updates are untouched.
    pub fn apply(&mut self, motor: &[NeuronUpdate], sensory: &[NeuronUpdate]) {
        for update in motor {
            self.set(NeuronGroup::Motor, &update.neuron, update.value);
        }
        for update in sensory {
            self.set(NeuronGroup::Sensory, &update.neuron, update.value);
        }
        self.state_count += 1;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn update(neuron: &str, value: i64) -> NeuronUpdate {
        NeuronUpdate {
            neuron: neuron.to_string(),
            value,
        }
    }

    #[test]
    fn test_default_catalog() {
        let state = NeuroState::with_default_catalog();

        assert_eq!(state.state_count, 0);
        assert_eq!(state.motor_neurons.len(), 5);
        assert_eq!(state.sensory_neurons.len(), 5);
        assert_eq!(state.motor_neurons.get("AVA"), Some(&0));
        assert_eq!(state.sensory_neurons.get("ASE"), Some(&0));
        // The groups are independent namespaces
        assert!(state.motor_neurons.get("ASE").is_none());
    }

    #[test]
    fn test_set_overwrites_existing() {
        let mut state = NeuroState::with_default_catalog();
        state.set(NeuronGroup::Motor, "AVA", 5);
        state.set(NeuronGroup::Motor, "AVA", -3);
        assert_eq!(state.motor_neurons.get("AVA"), Some(&-3));
    }

    #[test]
    fn test_set_creates_unknown_neuron() {
        let mut state = NeuroState::with_default_catalog();
        state.set(NeuronGroup::Sensory, "PHA", 7);
        assert_eq!(state.sensory_neurons.get("PHA"), Some(&7));
        assert_eq!(state.sensory_neurons.len(), 6);
    }

    #[test]
    fn test_apply_bumps_version() {
        let mut state = NeuroState::with_default_catalog();
        let before = state.updated_at;

        state.apply(&[update("AVA", 5)], &[]);

        assert_eq!(state.state_count, 1);
        assert!(state.updated_at >= before);
        assert_eq!(state.motor_neurons.get("AVA"), Some(&5));
    }

    #[test]
    fn test_apply_is_idempotent_on_values() {
        let mut once = NeuroState::with_default_catalog();
        let mut twice = once.clone();

        let motor = [update("AVA", 5), update("AVB", -2)];
        let sensory = [update("ASE", 9)];

        once.apply(&motor, &sensory);
        twice.apply(&motor, &sensory);
        twice.apply(&motor, &sensory);

        assert_eq!(once.motor_neurons, twice.motor_neurons);
        assert_eq!(once.sensory_neurons, twice.sensory_neurons);
    }

    #[test]
    fn test_canonical_json_ignores_insertion_order() {
        let mut a = NeuroState::with_default_catalog();
        let mut b = a.clone();

        a.set(NeuronGroup::Motor, "DA1", 1);
        a.set(NeuronGroup::Motor, "DB1", 2);
        b.set(NeuronGroup::Motor, "DB1", 2);
        b.set(NeuronGroup::Motor, "DA1", 1);

        assert_eq!(a.canonical_json(), b.canonical_json());
    }

    proptest! {
        /// Applying an update list sets exactly the named neurons and
        /// leaves every other neuron in either group unchanged.
        #[test]
        fn prop_apply_touches_only_named_neurons(
            names in proptest::collection::vec("[A-Z]{2,4}", 0..6),
            values in proptest::collection::vec(-1000i64..1000, 6),
        ) {
            let motor: Vec<NeuronUpdate> = names
                .iter()
                .zip(values.iter())
                .map(|(n, v)| update(n, *v))
                .collect();

            let before = NeuroState::with_default_catalog();
            let mut after = before.clone();
            after.apply(&motor, &[]);

            // Sensory group untouched entirely
            prop_assert_eq!(&after.sensory_neurons, &before.sensory_neurons);

            let named: std::collections::BTreeSet<&str> =
                motor.iter().map(|u| u.neuron.as_str()).collect();

            for (name, value) in &before.motor_neurons {
                if !named.contains(name.as_str()) {
                    prop_assert_eq!(after.motor_neurons.get(name), Some(value));
                }
            }
            // Last write wins for duplicated names in one list
            for u in motor.iter().rev() {
                if let Some(last) = motor.iter().rfind(|m| m.neuron == u.neuron) {
                    prop_assert_eq!(after.motor_neurons.get(&u.neuron), Some(&last.value));
                }
            }
        }
    }
}
