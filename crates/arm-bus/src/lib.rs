//! The routable physical address map and device contract (§4.B, §4.C).

mod bus;
mod device;
mod map;
mod ram;

pub use bus::{BusFault, SystemBus};
pub use device::{Device, DeviceRef, Width, device_ref};
pub use map::{AddressMap, MapEntry};
pub use ram::{Ram, Rom};
