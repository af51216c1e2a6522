//! Named, bounded numeric controls.
//!
//! A [`Parameter`] stores a physical value inside `[min, max]` together with
//! its normalized form, and layers three behaviours on top:
//!
//! * **Smoothing**: with a non-zero damping coefficient, writes set a target
//!   and the value approaches it one [`Parameter::tick`] at a time.
//! * **Gestures**: between [`Parameter::begin_gesture`] and
//!   [`Parameter::end_gesture`] writes skip smoothing entirely.
//! * **Modulation**: named sources offset the reported value by up to half
//!   of the range in either direction without touching the stored value.
//!
//! ```text
//!            set_value (smoothing > 0, no gesture)
//!   Idle  ------------------------------------------>  Smoothing
//!    ^                                                   |  tick: value += diff * (1 - smoothing)
//!    +---------------------------------------------------+
//!         tick with |target - value| < 0.001, or an immediate write
//! ```

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use serde::{Deserialize, Serialize};

use crate::{
    EngineError, ListenerId, ListenerResult, ListenerSet, ModulationMixer, ParameterConfig,
    ParameterEvent, Result, ValueMapper,
};

/// Residual distance below which smoothing snaps onto the target.
const CONVERGENCE_THRESHOLD: f64 = 0.001;
/// Fraction of the range a full-scale modulation depth shifts the value by.
const MODULATION_RANGE_FRACTION: f64 = 0.5;

/// Whether a parameter is currently interpolating toward its target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SmoothingState {
    #[default]
    Idle,
    Smoothing,
}

/// Minimal snapshot of a parameter's session state.
///
/// Configuration (bounds, skew, step, units) is schema and is not included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterState {
    pub id: String,
    pub value: f64,
    pub normalized_value: f64,
}

/// Lock-free view of a parameter's modulated value for other threads.
///
/// The owning [`Parameter`] is the only writer.
#[derive(Debug, Clone)]
pub struct ValueReader {
    bits: Arc<AtomicU64>,
}

impl ValueReader {
    /// Returns the most recently published modulated value.
    pub fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}

pub struct Parameter {
    id: String,
    name: String,
    default_value: f64,
    config: ParameterConfig,
    mapper: ValueMapper,
    value: f64,
    normalized_value: f64,
    target_value: f64,
    state: SmoothingState,
    gesture_active: bool,
    modulation: ModulationMixer,
    listeners: ListenerSet<Parameter>,
    published: Arc<AtomicU64>,
}

impl Parameter {
    /// Creates a parameter with the default [`ParameterConfig`].
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        min: f64,
        max: f64,
        default: f64,
    ) -> Result<Self> {
        Self::with_config(id, name, min, max, default, ParameterConfig::default())
    }

    /// Creates a parameter, rejecting configuration that would break its
    /// invariants (inverted or non-finite bounds, a default outside the
    /// range, a non-positive skew, a negative step, or smoothing outside
    /// `[0, 1)`).
    pub fn with_config(
        id: impl Into<String>,
        name: impl Into<String>,
        min: f64,
        max: f64,
        default: f64,
        config: ParameterConfig,
    ) -> Result<Self> {
        let id = id.into();
        validate(&id, min, max, default, &config)?;

        let mapper = ValueMapper::new(min, max, config.skew, config.step);
        Ok(Self {
            id,
            name: name.into(),
            default_value: default,
            config,
            mapper,
            value: default,
            normalized_value: mapper.value_to_normalized(default),
            target_value: default,
            state: SmoothingState::Idle,
            gesture_active: false,
            modulation: ModulationMixer::new(),
            listeners: ListenerSet::new(),
            published: Arc::new(AtomicU64::new(default.to_bits())),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_value(&self) -> f64 {
        self.mapper.min()
    }

    pub fn max_value(&self) -> f64 {
        self.mapper.max()
    }

    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    pub fn config(&self) -> &ParameterConfig {
        &self.config
    }

    pub fn mapper(&self) -> &ValueMapper {
        &self.mapper
    }

    /// Stored physical value, always within `[min, max]`.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Value smoothing is converging toward. Equal to [`value`](Self::value)
    /// while idle.
    pub fn target_value(&self) -> f64 {
        self.target_value
    }

    /// Normalized form of the stored value.
    pub fn normalized_value(&self) -> f64 {
        self.normalized_value
    }

    /// Stored value shifted by the modulation offset. Not clamped to the
    /// parameter range.
    pub fn modulated_value(&self) -> f64 {
        self.value + self.modulation_offset()
    }

    pub fn modulation_offset(&self) -> f64 {
        self.modulation.depth() * self.mapper.span() * MODULATION_RANGE_FRACTION
    }

    pub fn smoothing_state(&self) -> SmoothingState {
        self.state
    }

    pub fn is_smoothing(&self) -> bool {
        self.state == SmoothingState::Smoothing
    }

    pub fn is_gesture_active(&self) -> bool {
        self.gesture_active
    }

    /// Writes a new value and notifies listeners once it is applied.
    pub fn set_value(&mut self, value: f64) {
        self.apply_value(value, true);
    }

    /// Same as [`set_value`](Self::set_value) but an immediate write does not
    /// notify listeners.
    pub fn set_value_silently(&mut self, value: f64) {
        self.apply_value(value, false);
    }

    /// Writes a value expressed in the normalized domain.
    pub fn set_normalized_value(&mut self, normalized: f64) {
        if normalized.is_nan() {
            tracing::debug!(id = %self.id, "ignoring NaN normalized value");
            return;
        }

        let value = self.mapper.normalized_to_value(normalized.clamp(0.0, 1.0));
        self.set_value(value);
    }

    /// Advances smoothing by one frame and returns the resulting state.
    /// Idle parameters are left untouched.
    pub fn tick(&mut self) -> SmoothingState {
        if self.state == SmoothingState::Idle {
            return SmoothingState::Idle;
        }

        let diff = self.target_value - self.value;
        let next = self.value + diff * (1.0 - self.config.smoothing);
        // At large magnitudes the step can fall below float resolution, in
        // which case `value` would never move again.
        if diff.abs() < CONVERGENCE_THRESHOLD || next == self.value {
            self.state = SmoothingState::Idle;
            self.store(self.target_value);
            tracing::debug!(id = %self.id, value = self.value, "smoothing settled");
        } else {
            self.store(next);
        }

        self.notify(ParameterEvent::ValueChanged);
        self.state
    }

    /// Restores the default value through the normal write path, so smoothing
    /// still applies.
    pub fn reset(&mut self) {
        self.set_value(self.default_value);
    }

    pub fn begin_gesture(&mut self) {
        self.gesture_active = true;
        self.notify(ParameterEvent::GestureBegin);
    }

    pub fn end_gesture(&mut self) {
        self.gesture_active = false;
        self.notify(ParameterEvent::GestureEnd);
    }

    /// Registers a change listener. The callback runs synchronously inside
    /// the mutating call.
    pub fn add_listener<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&Parameter, ParameterEvent) -> ListenerResult + Send + 'static,
    {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Sets the depth contributed by `source`. Listeners are notified when
    /// the combined depth changes.
    pub fn add_modulation(&mut self, source: impl Into<String>, depth: f64) {
        let source = source.into();
        let before = self.modulation.depth();
        if !self.modulation.set(source.as_str(), depth) {
            tracing::debug!(id = %self.id, source = %source, "ignoring NaN modulation depth");
            return;
        }
        self.modulation_changed(before);
    }

    pub fn remove_modulation(&mut self, source: &str) -> bool {
        let before = self.modulation.depth();
        if self.modulation.remove(source).is_none() {
            return false;
        }
        self.modulation_changed(before);
        true
    }

    pub fn clear_modulations(&mut self) {
        let before = self.modulation.depth();
        self.modulation.clear();
        self.modulation_changed(before);
    }

    /// Combined modulation depth in `[-1, 1]`.
    pub fn modulation_depth(&self) -> f64 {
        self.modulation.depth()
    }

    pub fn modulation_sources(&self) -> impl Iterator<Item = (&str, f64)> {
        self.modulation.sources()
    }

    /// Stored value formatted for display, including units.
    pub fn display_text(&self) -> String {
        self.mapper.format(self.value, &self.config.units)
    }

    pub fn serialize(&self) -> ParameterState {
        ParameterState {
            id: self.id.clone(),
            value: self.value,
            normalized_value: self.normalized_value,
        }
    }

    /// Applies a snapshot immediately and without notifying listeners, even
    /// when smoothing is configured. Snapshots for another id are ignored and
    /// `false` is returned.
    pub fn deserialize(&mut self, state: &ParameterState) -> bool {
        if state.id != self.id {
            tracing::debug!(id = %self.id, found = %state.id, "ignoring state for another parameter");
            return false;
        }
        if state.value.is_nan() {
            tracing::debug!(id = %self.id, "ignoring NaN value in state");
            return false;
        }

        self.write_now(self.mapper.clamp(state.value));
        true
    }

    /// Returns a handle that reads the modulated value without borrowing
    /// the parameter.
    pub fn reader(&self) -> ValueReader {
        ValueReader {
            bits: self.published.clone(),
        }
    }

    fn apply_value(&mut self, value: f64, notify: bool) {
        if value.is_nan() {
            tracing::debug!(id = %self.id, "ignoring NaN value");
            return;
        }

        let clamped = self.mapper.clamp(value);
        self.target_value = clamped;

        if self.config.smoothing > 0.0 && !self.gesture_active {
            if self.state == SmoothingState::Idle {
                self.state = SmoothingState::Smoothing;
                tracing::debug!(id = %self.id, target_value = clamped, "smoothing started");
            }
            return;
        }

        self.write_now(clamped);
        if notify {
            self.notify(ParameterEvent::ValueChanged);
        }
    }

    /// Applies an already clamped value, ending any smoothing in flight.
    fn write_now(&mut self, value: f64) {
        self.target_value = value;
        self.state = SmoothingState::Idle;
        self.store(value);
    }

    /// Updates the value and its normalized form together.
    fn store(&mut self, value: f64) {
        self.value = value;
        self.normalized_value = self.mapper.value_to_normalized(value);
        self.publish();
    }

    fn modulation_changed(&mut self, before: f64) {
        if self.modulation.depth() != before {
            self.publish();
            self.notify(ParameterEvent::ValueChanged);
        }
    }

    fn publish(&self) {
        self.published
            .store(self.modulated_value().to_bits(), Ordering::Release);
    }

    fn notify(&mut self, event: ParameterEvent) {
        if self.listeners.is_empty() {
            return;
        }

        let mut listeners = std::mem::take(&mut self.listeners);
        listeners.notify(&self.id, self, event);
        self.listeners = listeners;
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("min", &self.mapper.min())
            .field("max", &self.mapper.max())
            .field("value", &self.value)
            .field("target_value", &self.target_value)
            .field("state", &self.state)
            .field("gesture_active", &self.gesture_active)
            .field("modulation_depth", &self.modulation.depth())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn validate(id: &str, min: f64, max: f64, default: f64, config: &ParameterConfig) -> Result<()> {
    if !min.is_finite() || !max.is_finite() {
        return Err(EngineError::invalid(id, "bounds must be finite"));
    }
    if min > max {
        return Err(EngineError::invalid(
            id,
            format!("minimum {min} exceeds maximum {max}"),
        ));
    }
    if !(min..=max).contains(&default) {
        return Err(EngineError::invalid(
            id,
            format!("default {default} lies outside [{min}, {max}]"),
        ));
    }
    if !config.skew.is_finite() || config.skew <= 0.0 {
        return Err(EngineError::invalid(id, "skew must be finite and positive"));
    }
    if !config.step.is_finite() || config.step < 0.0 {
        return Err(EngineError::invalid(id, "step must be finite and non-negative"));
    }
    if !(0.0..1.0).contains(&config.smoothing) {
        return Err(EngineError::invalid(id, "smoothing must lie in [0, 1)"));
    }
    Ok(())
}
