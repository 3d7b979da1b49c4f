//! The system host (§4.H): composes the register file, shifter, decoder/
//! executor and coprocessor bus (`arm-cpu`) with the address map and
//! device contract (`arm-bus`) into a runnable machine. Owns the clock,
//! the breakpoint set and the event subscriber list; the GUI/debugger
//! front end that would consume all of this is out of scope (§1) — this
//! crate stops at the API such a front end would call.

mod breakpoint;
mod events;
mod host;
mod host_error;
mod options;

pub use breakpoint::{Breakpoint, BreakpointSet, Condition as BreakpointCondition};
pub use events::{EventBus, ExecutionEvent, Subscriber};
pub use host::{Host, HostBuilder, RegisterSnapshot, RunUntil, StopReason};
pub use host_error::HostError;
pub use options::{ArchVariant, Extensions, Options};
