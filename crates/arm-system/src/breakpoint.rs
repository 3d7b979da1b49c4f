//! Breakpoint management (§6 "System host API": set/clear at address,
//! conditional on register/memory predicates).

use arm_cpu::RegisterFile;

/// A predicate evaluated against the register file at a candidate
/// breakpoint address; the breakpoint only fires if it returns `true`.
/// Boxed rather than generic so a [`crate::Host`] can hold a
/// heterogeneous set of breakpoints.
pub type Condition = Box<dyn Fn(&RegisterFile) -> bool>;

pub struct Breakpoint {
    pub address: u32,
    pub enabled: bool,
    condition: Option<Condition>,
}

impl Breakpoint {
    #[must_use]
    pub fn unconditional(address: u32) -> Self {
        Self { address, enabled: true, condition: None }
    }

    #[must_use]
    pub fn conditional(address: u32, condition: Condition) -> Self {
        Self { address, enabled: true, condition: Some(condition) }
    }

    #[must_use]
    pub fn matches(&self, address: u32, registers: &RegisterFile) -> bool {
        self.enabled && self.address == address && self.condition.as_ref().is_none_or(|c| c(registers))
    }
}

/// The set of breakpoints a [`crate::Host`] checks before each fetch.
#[derive(Default)]
pub struct BreakpointSet {
    points: Vec<Breakpoint>,
}

impl BreakpointSet {
    #[must_use]
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn set(&mut self, breakpoint: Breakpoint) {
        self.clear(breakpoint.address);
        self.points.push(breakpoint);
    }

    pub fn clear(&mut self, address: u32) {
        self.points.retain(|b| b.address != address);
    }

    pub fn clear_all(&mut self) {
        self.points.clear();
    }

    #[must_use]
    pub fn hit_at(&self, address: u32, registers: &RegisterFile) -> bool {
        self.points.iter().any(|b| b.matches(address, registers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arm_cpu::AddressMode;

    #[test]
    fn unconditional_breakpoint_fires_only_at_its_address() {
        let mut set = BreakpointSet::new();
        set.set(Breakpoint::unconditional(0x1000));
        let regs = RegisterFile::new(AddressMode::Bit32);
        assert!(set.hit_at(0x1000, &regs));
        assert!(!set.hit_at(0x1004, &regs));
    }

    #[test]
    fn conditional_breakpoint_consults_its_predicate() {
        let mut set = BreakpointSet::new();
        set.set(Breakpoint::conditional(0x2000, Box::new(|regs| regs.read(0) == 5)));
        let mut regs = RegisterFile::new(AddressMode::Bit32);
        assert!(!set.hit_at(0x2000, &regs));
        regs.write(0, 5);
        assert!(set.hit_at(0x2000, &regs));
    }

    #[test]
    fn clearing_a_breakpoint_removes_it() {
        let mut set = BreakpointSet::new();
        set.set(Breakpoint::unconditional(0x1000));
        set.clear(0x1000);
        let regs = RegisterFile::new(AddressMode::Bit32);
        assert!(!set.hit_at(0x1000, &regs));
    }

    #[test]
    fn setting_again_at_the_same_address_replaces_the_old_breakpoint() {
        let mut set = BreakpointSet::new();
        set.set(Breakpoint::conditional(0x1000, Box::new(|_| false)));
        set.set(Breakpoint::unconditional(0x1000));
        let regs = RegisterFile::new(AddressMode::Bit32);
        assert!(set.hit_at(0x1000, &regs));
    }
}
