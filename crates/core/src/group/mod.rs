//! Hierarchical containers for parameters.
//!
//! ```text
//! synth
//! ├── volume
//! ├── filter
//! │   ├── cutoff
//! │   └── resonance
//! └── envelope
//!     ├── attack
//!     └── release
//! ```
//!
//! Lookups and flattening are depth first: a group's own parameters come
//! before those of its sub-groups, and sub-groups are visited in the order
//! they were added.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{Parameter, ParameterState, Result, SmoothingState};

/// Persisted state of a group subtree.
///
/// Maps are keyed by parameter id and sub-group name. Keys serialize in sorted
/// order so the encoded form is stable for a given tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupState {
    pub name: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterState>,
    #[serde(default)]
    pub groups: BTreeMap<String, GroupState>,
}

impl GroupState {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Tree node owning parameters and nested groups.
///
/// Entries are never removed. Adding a parameter with an id that is already
/// a direct child, or a group with a taken name, replaces that child in place.
#[derive(Debug, Default)]
pub struct ParameterGroup {
    name: String,
    parameters: Vec<Parameter>,
    parameter_index: HashMap<String, usize>,
    groups: Vec<ParameterGroup>,
    group_index: HashMap<String, usize>,
}

impl ParameterGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_parameter(&mut self, parameter: Parameter) -> &mut Parameter {
        let existing = self.parameter_index.get(parameter.id()).copied();
        let index = match existing {
            Some(index) => {
                tracing::debug!(group = %self.name, id = parameter.id(), "replacing parameter");
                self.parameters[index] = parameter;
                index
            }
            None => {
                let index = self.parameters.len();
                self.parameter_index.insert(parameter.id().to_string(), index);
                self.parameters.push(parameter);
                index
            }
        };
        &mut self.parameters[index]
    }

    pub fn add_group(&mut self, group: ParameterGroup) -> &mut ParameterGroup {
        let existing = self.group_index.get(&group.name).copied();
        let index = match existing {
            Some(index) => {
                tracing::debug!(group = %self.name, child = %group.name, "replacing group");
                self.groups[index] = group;
                index
            }
            None => {
                let index = self.groups.len();
                self.group_index.insert(group.name.clone(), index);
                self.groups.push(group);
                index
            }
        };
        &mut self.groups[index]
    }

    /// Finds a parameter anywhere in the subtree. Direct children win over
    /// deeper matches.
    pub fn get_parameter(&self, id: &str) -> Option<&Parameter> {
        if let Some(&index) = self.parameter_index.get(id) {
            return self.parameters.get(index);
        }
        self.groups.iter().find_map(|group| group.get_parameter(id))
    }

    pub fn get_parameter_mut(&mut self, id: &str) -> Option<&mut Parameter> {
        if let Some(&index) = self.parameter_index.get(id) {
            return self.parameters.get_mut(index);
        }
        self.groups
            .iter_mut()
            .find_map(|group| group.get_parameter_mut(id))
    }

    /// Direct sub-group by name.
    pub fn get_group(&self, name: &str) -> Option<&ParameterGroup> {
        self.group_index
            .get(name)
            .and_then(|&index| self.groups.get(index))
    }

    pub fn get_group_mut(&mut self, name: &str) -> Option<&mut ParameterGroup> {
        let index = *self.group_index.get(name)?;
        self.groups.get_mut(index)
    }

    /// Direct parameters in insertion order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Direct sub-groups in insertion order.
    pub fn groups(&self) -> &[ParameterGroup] {
        &self.groups
    }

    /// Every parameter in the subtree, depth first.
    pub fn get_all_parameters(&self) -> Vec<&Parameter> {
        let mut out = Vec::with_capacity(self.len());
        self.collect_parameters(&mut out);
        out
    }

    /// Number of parameters in the whole subtree.
    pub fn len(&self) -> usize {
        self.parameters.len() + self.groups.iter().map(ParameterGroup::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns every parameter in the subtree to its default value.
    pub fn reset(&mut self) {
        for parameter in &mut self.parameters {
            parameter.reset();
        }
        for group in &mut self.groups {
            group.reset();
        }
    }

    /// Advances smoothing on every parameter in the subtree by one frame and
    /// returns how many are still smoothing afterwards.
    pub fn tick(&mut self) -> usize {
        let own = self
            .parameters
            .iter_mut()
            .map(Parameter::tick)
            .filter(|state| *state == SmoothingState::Smoothing)
            .count();
        own + self.groups.iter_mut().map(ParameterGroup::tick).sum::<usize>()
    }

    pub fn serialize(&self) -> GroupState {
        GroupState {
            name: self.name.clone(),
            parameters: self
                .parameters
                .iter()
                .map(|parameter| (parameter.id().to_string(), parameter.serialize()))
                .collect(),
            groups: self
                .groups
                .iter()
                .map(|group| (group.name.clone(), group.serialize()))
                .collect(),
        }
    }

    /// Applies persisted state to matching parameters and sub-groups.
    /// Entries without a counterpart in this tree are skipped.
    pub fn deserialize(&mut self, state: &GroupState) {
        for parameter in &mut self.parameters {
            if let Some(entry) = state.parameters.get(parameter.id()) {
                parameter.deserialize(entry);
            }
        }
        for group in &mut self.groups {
            if let Some(entry) = state.groups.get(&group.name) {
                group.deserialize(entry);
            }
        }
    }

    fn collect_parameters<'a>(&'a self, out: &mut Vec<&'a Parameter>) {
        out.extend(self.parameters.iter());
        for group in &self.groups {
            group.collect_parameters(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParameterConfig;

    fn param(id: &str, default: f64) -> Parameter {
        Parameter::new(id, id.to_uppercase(), 0.0, 100.0, default).unwrap()
    }

    fn sample_tree() -> ParameterGroup {
        let mut root = ParameterGroup::new("root");
        root.add_parameter(param("a", 10.0));
        root.add_parameter(param("b", 20.0));
        let sub = root.add_group(ParameterGroup::new("sub"));
        sub.add_parameter(param("c", 30.0));
        root
    }

    fn ids(group: &ParameterGroup) -> Vec<&str> {
        group
            .get_all_parameters()
            .into_iter()
            .map(Parameter::id)
            .collect()
    }

    #[test]
    fn flattens_depth_first_in_insertion_order() {
        let mut root = sample_tree();
        assert_eq!(ids(&root), vec!["a", "b", "c"]);

        let deep = root.add_group(ParameterGroup::new("deep"));
        deep.add_parameter(param("d", 0.0));
        root.get_group_mut("sub")
            .unwrap()
            .add_group(ParameterGroup::new("inner"))
            .add_parameter(param("e", 0.0));

        assert_eq!(ids(&root), vec!["a", "b", "c", "e", "d"]);
        assert_eq!(root.len(), 5);
    }

    #[test]
    fn finds_parameters_recursively() {
        let mut root = sample_tree();
        assert_eq!(root.get_parameter("c").unwrap().value(), 30.0);
        assert!(root.get_parameter("missing").is_none());

        root.get_parameter_mut("c").unwrap().set_value(75.0);
        assert_eq!(root.get_parameter("c").unwrap().value(), 75.0);
    }

    #[test]
    fn direct_children_shadow_nested_matches() {
        let mut root = ParameterGroup::new("root");
        root.add_group(ParameterGroup::new("sub"))
            .add_parameter(param("x", 1.0));
        root.add_parameter(param("x", 2.0));

        assert_eq!(root.get_parameter("x").unwrap().value(), 2.0);
    }

    #[test]
    fn re_adding_replaces_in_place() {
        let mut root = sample_tree();
        root.add_parameter(param("a", 99.0));
        assert_eq!(ids(&root), vec!["a", "b", "c"]);
        assert_eq!(root.get_parameter("a").unwrap().value(), 99.0);
    }

    #[test]
    fn reset_restores_defaults_in_subtree() {
        let mut root = sample_tree();
        for id in ["a", "b", "c"] {
            root.get_parameter_mut(id).unwrap().set_value(0.0);
        }

        root.reset();
        let values: Vec<f64> = root.get_all_parameters().iter().map(|p| p.value()).collect();
        assert_eq!(values, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn tick_drives_smoothing_across_the_tree() {
        let mut root = sample_tree();
        let smooth = Parameter::with_config(
            "glide",
            "Glide",
            0.0,
            1.0,
            0.0,
            ParameterConfig::default().with_smoothing(0.5),
        )
        .unwrap();
        root.get_group_mut("sub").unwrap().add_parameter(smooth);

        root.get_parameter_mut("glide").unwrap().set_value(1.0);
        assert_eq!(root.tick(), 1);

        let mut frames = 1;
        while root.tick() > 0 {
            frames += 1;
            assert!(frames < 100);
        }
        assert_eq!(root.get_parameter("glide").unwrap().value(), 1.0);
    }

    fn smoothed_tree() -> ParameterGroup {
        let mut root = sample_tree();
        let glide = Parameter::with_config(
            "glide",
            "Glide",
            0.0,
            100.0,
            40.0,
            ParameterConfig::default().with_smoothing(0.5),
        )
        .unwrap();
        root.get_group_mut("sub").unwrap().add_parameter(glide);
        root
    }

    #[test]
    fn reset_smooths_configured_parameters_back_to_default() {
        let mut root = smoothed_tree();
        let glide = root.get_parameter_mut("glide").unwrap();
        glide.begin_gesture();
        glide.set_value(100.0);
        glide.end_gesture();
        root.get_parameter_mut("a").unwrap().set_value(0.0);

        root.reset();
        assert_eq!(root.get_parameter("a").unwrap().value(), 10.0);
        assert_eq!(root.get_parameter("glide").unwrap().value(), 100.0);
        assert!(root.get_parameter("glide").unwrap().is_smoothing());

        root.tick();
        assert_eq!(root.get_parameter("glide").unwrap().value(), 70.0);
        while root.tick() > 0 {}
        assert_eq!(root.get_parameter("glide").unwrap().value(), 40.0);
    }

    #[test]
    fn deserialize_restores_smoothed_parameters_immediately_and_quietly() {
        let mut source = smoothed_tree();
        let glide = source.get_parameter_mut("glide").unwrap();
        glide.begin_gesture();
        glide.set_value(90.0);
        glide.end_gesture();
        let state = source.serialize();

        let mut target = smoothed_tree();
        let notifications = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = notifications.clone();
        target
            .get_parameter_mut("glide")
            .unwrap()
            .add_listener(move |_, _| {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            });

        target.deserialize(&state);
        assert_eq!(target.get_parameter("glide").unwrap().value(), 90.0);
        assert_eq!(target.tick(), 0);
        assert_eq!(notifications.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn state_round_trips_through_json() {
        let mut source = sample_tree();
        source.get_parameter_mut("a").unwrap().set_value(1.0);
        source.get_parameter_mut("c").unwrap().set_value(64.0);

        let json = source.serialize().to_json().unwrap();
        let state = GroupState::from_json(&json).unwrap();

        let mut target = sample_tree();
        target.deserialize(&state);
        assert_eq!(target.get_parameter("a").unwrap().value(), 1.0);
        assert_eq!(target.get_parameter("b").unwrap().value(), 20.0);
        assert_eq!(target.get_parameter("c").unwrap().value(), 64.0);
        assert_eq!(target.serialize(), source.serialize());
    }

    #[test]
    fn persisted_shape_mirrors_tree() {
        let value = serde_json::to_value(sample_tree().serialize()).unwrap();
        assert_eq!(value["name"], "root");
        assert_eq!(value["parameters"]["a"]["value"], 10.0);
        assert_eq!(value["groups"]["sub"]["name"], "sub");
        assert_eq!(value["groups"]["sub"]["parameters"]["c"]["normalizedValue"], 0.3);
    }

    #[test]
    fn unmatched_state_entries_are_ignored() {
        let raw = r#"{
            "name": "root",
            "parameters": {
                "a": { "id": "a", "value": 5.0, "normalizedValue": 0.05 },
                "ghost": { "id": "ghost", "value": 1.0, "normalizedValue": 0.01 },
                "b": { "id": "wired-wrong", "value": 7.0, "normalizedValue": 0.07 }
            },
            "groups": {
                "nowhere": { "name": "nowhere" }
            }
        }"#;
        let state = GroupState::from_json(raw).unwrap();

        let mut root = sample_tree();
        root.deserialize(&state);
        assert_eq!(root.get_parameter("a").unwrap().value(), 5.0);
        assert_eq!(root.get_parameter("b").unwrap().value(), 20.0);
        assert_eq!(root.get_parameter("c").unwrap().value(), 30.0);
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = GroupState::from_json("{ not json").unwrap_err();
        assert!(matches!(err, crate::EngineError::Json(_)));
    }
}
