use std::cell::Cell;
use std::rc::Rc;

use i8051emu_core::{Disassembler, Engine, Session, SubscriptionId};

/// Marks the screen stale whenever the session publishes a change, so the
/// host redraws once per batch of changes instead of after every call.
#[derive(Debug, Clone)]
pub struct RenderScheduler {
    dirty: Rc<Cell<bool>>,
    subscription: SubscriptionId,
}

impl RenderScheduler {
    /// Subscribe to `session`. The first frame is always due.
    pub fn attach<E: Engine, D: Disassembler>(session: &mut Session<E, D>) -> Self {
        let dirty = Rc::new(Cell::new(true));
        let flag = dirty.clone();
        let subscription = session.subscribe(move |_| flag.set(true));
        Self {
            dirty,
            subscription,
        }
    }

    pub fn detach<E: Engine, D: Disassembler>(self, session: &mut Session<E, D>) {
        session.unsubscribe(self.subscription);
    }

    /// Ask for a redraw that no change triggered, e.g. a terminal resize.
    pub fn request(&self) {
        self.dirty.set(true);
    }

    /// Whether a redraw is due. Clears the request.
    pub fn take(&self) -> bool {
        self.dirty.replace(false)
    }
}
