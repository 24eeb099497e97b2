//! Observer contract: every mutating operation publishes exactly one
//! [`Change`] after the view has been re-projected.

use std::fmt;

use crate::controller::RunMode;
use crate::engine::{EngineError, MemorySpace};
use crate::input::Key;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Loaded { rows: usize },
    Stepped { pc: u16 },
    RunStateChanged(RunMode),
    MemorySpaceChanged(MemorySpace),
    KeyPressed(Key),
    KeyReleased(Key),
    Reset,
    Refreshed,
    Halted(EngineError),
    RowSelected(u16),
    Scrolled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&Change)>;

#[derive(Default)]
pub struct EventBus {
    next: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn subscribe(&mut self, listener: impl FnMut(&Change) + 'static) -> SubscriptionId {
        self.next += 1;
        let id = SubscriptionId(self.next);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sub, _)| *sub != id);
        self.listeners.len() != before
    }

    pub fn publish(&mut self, change: &Change) {
        for (_, listener) in &mut self.listeners {
            listener(change);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
