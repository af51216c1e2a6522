//! Change notification plumbing shared by every parameter.
//!
//! Listeners are plain callbacks registered on a [`ListenerSet`]. Delivery is
//! synchronous and isolated: a listener that returns an error or panics is
//! logged and skipped, and the remaining listeners still run.

use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
};

/// Kind of change a listener is told about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ParameterEvent {
    /// The stored or reported value changed.
    #[default]
    ValueChanged,
    /// A user interaction started.
    GestureBegin,
    /// The interaction started by [`ParameterEvent::GestureBegin`] ended.
    GestureEnd,
}

impl ParameterEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValueChanged => "value-changed",
            Self::GestureBegin => "gesture-begin",
            Self::GestureEnd => "gesture-end",
        }
    }
}

impl fmt::Display for ParameterEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error a listener may report back. It is logged, never propagated.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ListenerError(String);

impl ListenerError {
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self(msg.into())
    }
}

impl From<&str> for ListenerError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for ListenerError {
    fn from(value: String) -> Self {
        Self(value)
    }
}

pub type ListenerResult = std::result::Result<(), ListenerError>;

/// Boxed callback invoked with the notifying object and the event kind.
pub type Listener<T> = Box<dyn FnMut(&T, ParameterEvent) -> ListenerResult + Send>;

/// Handle returned on registration, used to unregister a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// Registered listeners for a single notifying object.
///
/// There is no capacity limit; bounding registrations is left to callers.
pub struct ListenerSet<T> {
    next_id: u64,
    entries: Vec<(ListenerId, Listener<T>)>,
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<T> ListenerSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&T, ParameterEvent) -> ListenerResult + Send + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(listener)));
        id
    }

    /// Unregisters a listener. Returns `false` if the id was unknown.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invokes every listener once with `target` and `event`. `source` only
    /// labels log output. Returns the number of listeners that failed.
    pub fn notify(&mut self, source: &str, target: &T, event: ParameterEvent) -> usize {
        let mut failures = 0;
        for (id, listener) in &mut self.entries {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(target, event)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    failures += 1;
                    tracing::warn!(source, listener = id.0, %event, error = %err, "listener failed");
                }
                Err(payload) => {
                    failures += 1;
                    tracing::warn!(
                        source,
                        listener = id.0,
                        %event,
                        panic = panic_message(payload.as_ref()),
                        "listener panicked"
                    );
                }
            }
        }
        failures
    }
}

impl<T> fmt::Debug for ListenerSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.entries.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
