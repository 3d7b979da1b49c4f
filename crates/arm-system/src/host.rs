//! The system host (§4.H): composes the CPU core, the two address maps
//! and the device list into a runnable machine, and owns the clock.
//!
//! `HostBuilder` mirrors the original `ArmSystemBuilder`'s role of wiring
//! address-map entries from parsed options before the machine starts
//! running — a system is assembled once, then only `reset`/`step`/
//! `run_until` are called on it.

use arm_bus::{device_ref, AddressMap, Device, DeviceRef, SystemBus, Width};
use arm_cpu::{AddressMode, Cpu, ExceptionKind, RegisterFile, StepOutcome};

use crate::breakpoint::{Breakpoint, BreakpointSet};
use crate::events::{EventBus, ExecutionEvent, Subscriber};
use crate::host_error::HostError;
use crate::options::Options;

/// A read-only snapshot of the register file and PSR at a safe-point, the
/// shape a debugger front end asks for (§6 "Register read/write by name
/// or index").
#[derive(Debug, Clone, Copy)]
pub struct RegisterSnapshot {
    pub r: [u32; 16],
    pub cpsr: u32,
    pub mode: arm_cpu::Mode,
}

/// What should end a [`Host::run_until`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunUntil {
    /// Stop once the fetch address equals `addr` (checked before the
    /// instruction at that address executes).
    Address(u32),
    /// Stop once at least `cycles` total cycles have elapsed since the
    /// call started.
    Cycles(u64),
    /// Run until any enabled breakpoint fires.
    AnyBreakpoint,
    /// Run until a host-issued cancel flag is set (see [`Host::cancel`]).
    Cancelled,
}

/// Why a `run_until` call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    ReachedAddress(u32),
    CycleBudgetExhausted,
    Breakpoint(u32),
    Cancelled,
    /// The CPU entered a halt state (a `BKPT` without an attached
    /// debugger to resolve it is reported this way rather than spinning).
    Halted,
}

/// Assembles RAM/ROM/MMIO regions into a [`Host`] before execution starts,
/// the same "declarative builder installs regions, then `reset` runs"
/// shape as the original `ArmSystemBuilder`.
pub struct HostBuilder {
    options: Options,
    read_map: AddressMap,
    write_map: AddressMap,
    entry_pc: u32,
}

impl HostBuilder {
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self { options, read_map: AddressMap::new(), write_map: AddressMap::new(), entry_pc: 0 }
    }

    /// Map a region readable and writable at the same base (RAM).
    pub fn map_ram(&mut self, base_addr: u32, size: u32) -> Result<&mut Self, HostError> {
        let device = device_ref(arm_bus::Ram::new(size));
        self.map_device(base_addr, size, device, true)
    }

    /// Map ROM: readable everywhere, and also present in the write map so
    /// that writes reach the device (which then decides whether to
    /// ignore or fault them), matching §4.C's "writes ignored or faulted
    /// per configuration".
    pub fn map_rom(&mut self, base_addr: u32, bytes: Vec<u8>, fault_on_write: bool) -> Result<&mut Self, HostError> {
        let size = bytes.len() as u32;
        let device = device_ref(arm_bus::Rom::new(bytes, fault_on_write));
        self.map_device(base_addr, size, device, true)
    }

    /// Map an arbitrary device (MMIO) into both maps.
    pub fn map_device(
        &mut self,
        base_addr: u32,
        size: u32,
        device: DeviceRef,
        writable: bool,
    ) -> Result<&mut Self, HostError> {
        if !self.read_map.try_insert(base_addr, size, device.clone()) {
            return Err(HostError::MapConflict { base_addr, size });
        }
        if writable && !self.write_map.try_insert(base_addr, size, device) {
            return Err(HostError::MapConflict { base_addr, size });
        }
        Ok(self)
    }

    /// Map a device read-only: present only in `read_map`, so writes to
    /// its range are a bus error rather than a silently dropped write.
    pub fn map_device_read_only(&mut self, base_addr: u32, size: u32, device: DeviceRef) -> Result<&mut Self, HostError> {
        self.map_device(base_addr, size, device, false)
    }

    /// The PC `reset()` jumps to. Defaults to 0, the reset vector.
    pub fn entry_point(&mut self, entry_pc: u32) -> &mut Self {
        self.entry_pc = entry_pc;
        self
    }

    #[must_use]
    pub fn build(self) -> Host {
        let bus = SystemBus { read_map: self.read_map, write_map: self.write_map };
        let mut cpu = Cpu::new(self.options.address_mode);
        cpu.reset(self.entry_pc);
        Host {
            cpu,
            bus,
            options: self.options,
            entry_pc: self.entry_pc,
            events: EventBus::new(),
            breakpoints: BreakpointSet::new(),
            cancel: false,
        }
    }
}

/// The assembled machine: CPU, bus, configuration, event subscribers and
/// breakpoints. Owns no thread of its own — `step`/`run_until` are called
/// from whatever loop the embedding application runs (§5: single-threaded
/// cooperative scheduling, the host never blocks inside an instruction).
pub struct Host {
    cpu: Cpu,
    bus: SystemBus,
    options: Options,
    entry_pc: u32,
    events: EventBus,
    breakpoints: BreakpointSet,
    cancel: bool,
}

impl Host {
    #[must_use]
    pub fn builder(options: Options) -> HostBuilder {
        HostBuilder::new(options)
    }

    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// Re-initialise the CPU and jump back to the configured entry point.
    /// Device state (RAM contents, MMIO state machines) is left alone —
    /// only the processor core resets, matching real hardware where a
    /// soft reset doesn't clear RAM.
    pub fn reset(&mut self) {
        self.cpu.reset(self.entry_pc);
        self.cancel = false;
    }

    pub fn raise_irq(&mut self) {
        self.cpu.raise_irq();
    }

    pub fn lower_irq(&mut self) {
        self.cpu.lower_irq();
    }

    pub fn raise_fiq(&mut self) {
        self.cpu.raise_fiq();
    }

    pub fn lower_fiq(&mut self) {
        self.cpu.lower_fiq();
    }

    /// Set the cooperative cancel flag checked at the next safe-point
    /// (between retired instructions). The only shared mutable bit
    /// between an embedding host and the run loop, per §5.
    pub fn cancel(&mut self) {
        self.cancel = true;
    }

    pub fn subscribe(&mut self, subscriber: Subscriber) {
        self.events.subscribe(subscriber);
    }

    pub fn set_breakpoint(&mut self, breakpoint: Breakpoint) {
        self.breakpoints.set(breakpoint);
    }

    pub fn clear_breakpoint(&mut self, address: u32) {
        self.breakpoints.clear(address);
    }

    pub fn clear_all_breakpoints(&mut self) {
        self.breakpoints.clear_all();
    }

    #[must_use]
    pub fn registers(&self) -> &RegisterFile {
        &self.cpu.registers
    }

    #[must_use]
    pub fn metrics(&self) -> arm_cpu::ExecutionMetrics {
        self.cpu.metrics
    }

    /// Register/PSR/mode snapshot at the current safe-point (§6).
    #[must_use]
    pub fn snapshot_registers(&self) -> RegisterSnapshot {
        let regs = &self.cpu.registers;
        let mut r = [0u32; 16];
        for (i, slot) in r.iter_mut().enumerate() {
            *slot = regs.read(i as u8);
        }
        RegisterSnapshot { r, cpsr: regs.cpsr().to_bits(), mode: regs.cpsr().mode }
    }

    /// Debug-side word read, side-effect-free when the device allows it;
    /// returns 0 for an unmapped address rather than faulting the CPU —
    /// a debugger probing memory should never crash the simulated
    /// machine it's inspecting.
    #[must_use]
    pub fn read_word(&self, addr: u32) -> u32 {
        self.bus.debug_read(addr, Width::Word)
    }

    #[must_use]
    pub fn read_byte(&self, addr: u32) -> u8 {
        self.bus.debug_read(addr, Width::Byte) as u8
    }

    /// Debug-side word write. Unlike the CPU's own stores, a failed write
    /// (nothing mapped there) is surfaced as a `HostError` rather than
    /// becoming a simulated data abort — a debugger edit is a host-level
    /// operation, not an instruction the CPU executed.
    pub fn write_word(&mut self, addr: u32, value: u32) -> Result<(), HostError> {
        self.bus.write(addr, Width::Word, value).map_err(|e| HostError::BusFault(e.to_string()))
    }

    pub fn write_byte(&mut self, addr: u32, value: u8) -> Result<(), HostError> {
        self.bus.write(addr, Width::Byte, u32::from(value)).map_err(|e| HostError::BusFault(e.to_string()))
    }

    /// Load an `ObjectCode`-shaped flat binary at its own load address by
    /// writing it byte-by-byte through the write map.
    pub fn load_image(&mut self, load_address: u32, bytes: &[u8]) -> Result<(), HostError> {
        for (i, byte) in bytes.iter().enumerate() {
            self.write_byte(load_address.wrapping_add(i as u32), *byte)?;
        }
        Ok(())
    }

    /// Execute exactly one instruction (or take a pending exception
    /// instead), publish the corresponding event, and return the raw CPU
    /// outcome.
    pub fn step(&mut self) -> StepOutcome {
        let pc_before = self.cpu.registers.fetch_pc();
        let outcome = self.cpu.step(&self.bus);
        match outcome {
            StepOutcome::Retired { branched } => {
                self.events.publish(ExecutionEvent::Retired { pc: pc_before, branched });
            }
            StepOutcome::Exception(kind) => {
                self.events.publish(ExecutionEvent::Exception { pc: pc_before, kind });
            }
            StepOutcome::Breakpoint => {
                self.events.publish(ExecutionEvent::Breakpoint { pc: pc_before });
            }
        }
        outcome
    }

    /// Run until one of the conditions in `until` is met, a breakpoint
    /// fires, the cancel flag is set, or the CPU halts on an unresolved
    /// `BKPT`. Suspension only happens between retired instructions
    /// (§5): a data abort transitions atomically within `step`, never
    /// mid-instruction.
    pub fn run_until(&mut self, until: RunUntil) -> StopReason {
        let start_cycles = self.cpu.metrics.cycles.total();
        loop {
            if self.cancel {
                self.cancel = false;
                return StopReason::Cancelled;
            }
            let fetch_addr = self.cpu.registers.fetch_pc();
            if let RunUntil::Address(addr) = until {
                if fetch_addr == addr {
                    return StopReason::ReachedAddress(addr);
                }
            }
            if self.breakpoints.hit_at(fetch_addr, &self.cpu.registers) {
                return StopReason::Breakpoint(fetch_addr);
            }
            match self.step() {
                StepOutcome::Breakpoint => return StopReason::Halted,
                StepOutcome::Retired { .. } | StepOutcome::Exception(_) => {}
            }
            if let RunUntil::Cycles(budget) = until {
                if self.cpu.metrics.cycles.total() - start_cycles >= budget {
                    return StopReason::CycleBudgetExhausted;
                }
            }
        }
    }

    /// Convert the cumulative cycle count to simulated wall-clock time at
    /// `frequency_hz`, per §4.F "the Host converts cycles to wall-clock
    /// using the configured processor frequency".
    #[must_use]
    pub fn elapsed_time_ns(&self, frequency_hz: u64) -> u64 {
        if frequency_hz == 0 {
            return 0;
        }
        self.cpu.metrics.cycles.total() * 1_000_000_000 / frequency_hz
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use arm_cpu::Mode;

    fn host_with_program(words: &[u32]) -> Host {
        let mut builder = HostBuilder::new(Options { address_mode: AddressMode::Bit32, ..Options::default() });
        builder.map_ram(0, 0x1000).unwrap();
        let mut host = builder.build();
        for (i, word) in words.iter().enumerate() {
            host.write_word((i * 4) as u32, *word).unwrap();
        }
        host
    }

    #[test]
    fn run_until_address_stops_exactly_there() {
        // MOV R0,#1 ; MOV R1,#2 ; ADD R2,R0,R1 ; SWI &11
        let mut host = host_with_program(&[0xE3A0_0001, 0xE3A0_1002, 0xE080_2001, 0xEF00_0011]);
        let reason = host.run_until(RunUntil::Address(0xC));
        assert_eq!(reason, StopReason::ReachedAddress(0xC));
        assert_eq!(host.registers().read(0), 1);
        assert_eq!(host.registers().read(1), 2);
        assert_eq!(host.registers().read(2), 3);
    }

    #[test]
    fn swi_enters_supervisor_mode_with_return_address() {
        let mut host = host_with_program(&[0xE3A0_0001, 0xE3A0_1002, 0xE080_2001, 0xEF00_0011]);
        // Run one instruction past the SWI itself.
        for _ in 0..4 {
            host.step();
        }
        let snap = host.snapshot_registers();
        assert_eq!(snap.mode, Mode::Supervisor);
        assert_eq!(host.registers().read_in(14, Mode::Supervisor), 0xC + 4);
    }

    #[test]
    fn breakpoint_stops_run_until_before_executing_that_instruction() {
        let mut host = host_with_program(&[0xE3A0_0001, 0xE3A0_1002, 0xE080_2001]);
        host.set_breakpoint(Breakpoint::unconditional(8));
        let reason = host.run_until(RunUntil::Cycles(1000));
        assert_eq!(reason, StopReason::Breakpoint(8));
        assert_eq!(host.registers().read(2), 0); // ADD at 0x8 never ran
    }

    #[test]
    fn debug_read_of_unmapped_address_returns_zero_not_a_fault() {
        let host = host_with_program(&[]);
        assert_eq!(host.read_word(0x5000_0000), 0);
    }

    #[test]
    fn cancel_flag_stops_the_run_loop_at_the_next_safepoint() {
        // BNE loop, spins forever unless cancelled.
        let mut host = host_with_program(&[0x1AFF_FFFF]);
        host.cancel();
        let reason = host.run_until(RunUntil::Cycles(u64::MAX));
        assert_eq!(reason, StopReason::Cancelled);
    }

    #[test]
    fn metrics_accumulate_additively_across_separate_run_until_calls() {
        let mut host = host_with_program(&[0xE3A0_0001, 0xE3A0_1002, 0xE080_2001]);
        host.run_until(RunUntil::Address(4));
        let mid = host.metrics();
        host.run_until(RunUntil::Address(8));
        let end = host.metrics();
        assert_eq!(end.instruction_count, mid.instruction_count + 1);
    }
}
