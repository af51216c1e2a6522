//! Parameter automation and modulation engine.
//!
//! The crate models named, bounded numeric controls that can be driven by
//! direct input, host automation, gestures and summed modulation sources.
//! Parameters optionally smooth their writes over discrete frames and can be
//! arranged in groups for lookup, bulk reset and state snapshots.
//!
//! Everything is single threaded and cooperative: smoothing only advances
//! when the owner calls [`Parameter::tick`] (or [`ParameterGroup::tick`]) once
//! per frame. [`ValueReader`] is the one piece meant to cross threads.

pub mod config;
pub mod error;
pub mod group;
pub mod mapping;
pub mod modulation;
pub mod notify;
pub mod parameter;

pub use config::{AppConfig, FrameConfig, ParameterConfig};
pub use error::{EngineError, Result};
pub use group::{GroupState, ParameterGroup};
pub use mapping::ValueMapper;
pub use modulation::ModulationMixer;
pub use notify::{Listener, ListenerError, ListenerId, ListenerResult, ListenerSet, ParameterEvent};
pub use parameter::{Parameter, ParameterState, SmoothingState, ValueReader};
