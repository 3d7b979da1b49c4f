//! Event subscription (§4.H, §6): instruction retire, exception taken,
//! breakpoint hit. No logging/tracing crate is used for this introspection;
//! a `Vec` of subscriber closures drained at each safe-point is plain
//! enough.

use arm_cpu::ExceptionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionEvent {
    Retired { pc: u32, branched: bool },
    Exception { pc: u32, kind: ExceptionKind },
    Breakpoint { pc: u32 },
}

pub type Subscriber = Box<dyn FnMut(ExecutionEvent)>;

#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self { subscribers: Vec::new() }
    }

    pub fn subscribe(&mut self, subscriber: Subscriber) {
        self.subscribers.push(subscriber);
    }

    pub fn publish(&mut self, event: ExecutionEvent) {
        for subscriber in &mut self.subscribers {
            subscriber(event);
        }
    }
}
