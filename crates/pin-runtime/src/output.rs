//! Published output values and the control-runtime seam.
//!
//! The control runtime owns the named output values; the sampler only gets
//! a write handle ([`OutputSlot`]) for each. Values are `f64` stored as bits
//! in an atomic so readers in other threads never see a torn write.

use pin_common::{PinResult, PinSpeedError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Writable end of a published scalar.
#[derive(Debug)]
pub struct OutputSlot {
    name: String,
    bits: Arc<AtomicU64>,
}

impl OutputSlot {
    /// Create a slot initialized to 0 and a reader for it.
    #[must_use]
    pub fn new(name: &str) -> (Self, OutputReader) {
        let bits = Arc::new(AtomicU64::new(0f64.to_bits()));
        (
            Self {
                name: name.to_string(),
                bits: Arc::clone(&bits),
            },
            OutputReader {
                name: name.to_string(),
                bits,
            },
        )
    }

    /// Publish a new value.
    #[inline]
    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    /// Fully-qualified output name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Read-only view of an [`OutputSlot`].
#[derive(Debug, Clone)]
pub struct OutputReader {
    name: String,
    bits: Arc<AtomicU64>,
}

impl OutputReader {
    /// Current published value.
    #[must_use]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Fully-qualified output name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Registration handle returned by [`ControlRuntime::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ComponentId(pub u32);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "comp#{}", self.0)
    }
}

/// Registration facility of the external control runtime.
///
/// Call order is `init`, `create_output` for each value, `mark_ready`;
/// `shutdown` tears the registration down and may be called at any point
/// after `init`.
pub trait ControlRuntime: Send {
    /// Register a component under `name`.
    ///
    /// # Errors
    ///
    /// [`PinSpeedError::RuntimeInit`] if the runtime refuses the component.
    fn init(&mut self, name: &str) -> PinResult<ComponentId>;

    /// Create an output value owned by `id`, initialized to 0.
    ///
    /// # Errors
    ///
    /// [`PinSpeedError::OutputCreate`] if the value cannot be created.
    fn create_output(&mut self, id: ComponentId, name: &str) -> PinResult<OutputSlot>;

    /// Announce that all outputs exist and the component is live.
    ///
    /// # Errors
    ///
    /// [`PinSpeedError::RuntimeInit`] if `id` is unknown.
    fn mark_ready(&mut self, id: ComponentId) -> PinResult<()>;

    /// Remove the component and its outputs.
    fn shutdown(&mut self, id: ComponentId);
}

impl<R: ControlRuntime + ?Sized> ControlRuntime for Box<R> {
    fn init(&mut self, name: &str) -> PinResult<ComponentId> {
        (**self).init(name)
    }

    fn create_output(&mut self, id: ComponentId, name: &str) -> PinResult<OutputSlot> {
        (**self).create_output(id, name)
    }

    fn mark_ready(&mut self, id: ComponentId) -> PinResult<()> {
        (**self).mark_ready(id)
    }

    fn shutdown(&mut self, id: ComponentId) {
        (**self).shutdown(id);
    }
}

#[derive(Debug)]
struct LocalComponent {
    name: String,
    ready: bool,
    outputs: BTreeMap<String, OutputReader>,
}

/// In-process control runtime.
///
/// Keeps a table of registered components and their outputs. Observers
/// read published values through [`LocalRuntime::reader`].
#[derive(Debug, Default)]
pub struct LocalRuntime {
    next_id: u32,
    components: BTreeMap<ComponentId, LocalComponent>,
}

impl LocalRuntime {
    /// Create an empty runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reader for a published output, by full name.
    #[must_use]
    pub fn reader(&self, name: &str) -> Option<OutputReader> {
        self.components
            .values()
            .find_map(|c| c.outputs.get(name).cloned())
    }

    /// Snapshot of every published output as `(name, value)`.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, f64)> {
        self.components
            .values()
            .flat_map(|c| c.outputs.values())
            .map(|r| (r.name().to_string(), r.get()))
            .collect()
    }

    /// Whether the component has been marked ready.
    #[must_use]
    pub fn is_ready(&self, id: ComponentId) -> bool {
        self.components.get(&id).is_some_and(|c| c.ready)
    }

    /// Number of registered components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

impl ControlRuntime for LocalRuntime {
    fn init(&mut self, name: &str) -> PinResult<ComponentId> {
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(PinSpeedError::RuntimeInit {
                component: name.to_string(),
                reason: "component name must be non-empty without whitespace".into(),
            });
        }
        if self.components.values().any(|c| c.name == name) {
            return Err(PinSpeedError::RuntimeInit {
                component: name.to_string(),
                reason: "component already registered".into(),
            });
        }

        let id = ComponentId(self.next_id);
        self.next_id += 1;
        self.components.insert(
            id,
            LocalComponent {
                name: name.to_string(),
                ready: false,
                outputs: BTreeMap::new(),
            },
        );
        debug!(component = name, %id, "Component registered");
        Ok(id)
    }

    fn create_output(&mut self, id: ComponentId, name: &str) -> PinResult<OutputSlot> {
        let taken = self.reader(name).is_some();
        let component = self
            .components
            .get_mut(&id)
            .ok_or_else(|| PinSpeedError::OutputCreate {
                name: name.to_string(),
                reason: format!("unknown component {id}"),
            })?;
        if component.ready {
            return Err(PinSpeedError::OutputCreate {
                name: name.to_string(),
                reason: "component already marked ready".into(),
            });
        }
        if taken {
            return Err(PinSpeedError::OutputCreate {
                name: name.to_string(),
                reason: "name already in use".into(),
            });
        }

        let (slot, reader) = OutputSlot::new(name);
        component.outputs.insert(name.to_string(), reader);
        debug!(output = name, %id, "Output created");
        Ok(slot)
    }

    fn mark_ready(&mut self, id: ComponentId) -> PinResult<()> {
        let component = self
            .components
            .get_mut(&id)
            .ok_or_else(|| PinSpeedError::RuntimeInit {
                component: id.to_string(),
                reason: "unknown component".into(),
            })?;
        component.ready = true;
        info!(component = %component.name, outputs = component.outputs.len(), "Component ready");
        Ok(())
    }

    fn shutdown(&mut self, id: ComponentId) {
        if let Some(component) = self.components.remove(&id) {
            info!(component = %component.name, "Component removed");
        }
    }
}
