//! The run loop (§4.F/§4.G): fetch, decode, execute, one instruction at a
//! time, with exception priority resolved before each fetch.

use arm_bus::{SystemBus, Width};

use crate::coprocessor::CoprocessorBus;
use crate::decode::decode;
pub use crate::execute::ExceptionKind;
use crate::execute::execute;
use crate::instruction::Instruction;
use crate::metrics::{CycleBreakdown, ExecutionMetrics};
use crate::registers::{AddressMode, RegisterFile};

/// What one call to [`Cpu::step`] produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// An instruction executed and retired normally (or its condition
    /// failed, which still retires — just cheaply).
    Retired { branched: bool },
    /// An exception was taken; the CPU is now at its entry vector.
    Exception(ExceptionKind),
    /// A `BKPT` was hit. Vectors through `PrefetchAbort` like the
    /// instruction it replaces, but reported distinctly so a host can
    /// stop the run loop instead of simulating the abort handler.
    Breakpoint,
}

/// The ARM2/ARM3-class core: register file, coprocessor bus and
/// cumulative execution metrics. Owns no memory itself — every `step`
/// takes the [`SystemBus`] it should fetch and transfer through.
pub struct Cpu {
    pub registers: RegisterFile,
    pub coprocessors: CoprocessorBus,
    pub metrics: ExecutionMetrics,
    irq_pending: bool,
    fiq_pending: bool,
}

impl Cpu {
    #[must_use]
    pub fn new(address_mode: AddressMode) -> Self {
        Self {
            registers: RegisterFile::new(address_mode),
            coprocessors: CoprocessorBus::new(),
            metrics: ExecutionMetrics::default(),
            irq_pending: false,
            fiq_pending: false,
        }
    }

    /// Re-initialise the register file and jump to `entry_pc`, as if the
    /// reset vector had just fired. Does not clear registered
    /// coprocessors.
    pub fn reset(&mut self, entry_pc: u32) {
        self.registers = RegisterFile::new(self.registers.address_mode);
        self.registers.set_fetch_pc(entry_pc);
        self.metrics = ExecutionMetrics::default();
        self.irq_pending = false;
        self.fiq_pending = false;
    }

    pub fn raise_irq(&mut self) {
        self.irq_pending = true;
    }

    pub fn lower_irq(&mut self) {
        self.irq_pending = false;
    }

    pub fn raise_fiq(&mut self) {
        self.fiq_pending = true;
    }

    pub fn lower_fiq(&mut self) {
        self.fiq_pending = false;
    }

    /// Fetch-decode-execute one instruction, or take a pending exception
    /// instead if one is unmasked. IRQ and FIQ are checked ahead of every
    /// fetch, in that priority order after FIQ's own higher hardware
    /// priority is accounted for by checking it second so it is never
    /// starved relative to an IRQ raised in the same cycle.
    pub fn step(&mut self, bus: &SystemBus) -> StepOutcome {
        if self.fiq_pending && !self.registers.cpsr().f {
            let return_addr = self.registers.fetch_pc().wrapping_add(4);
            return self.enter_exception(ExceptionKind::Fiq, return_addr);
        }
        if self.irq_pending && !self.registers.cpsr().i {
            let return_addr = self.registers.fetch_pc().wrapping_add(4);
            return self.enter_exception(ExceptionKind::Irq, return_addr);
        }

        let fetch_addr = self.registers.fetch_pc();
        let word = match bus.read(fetch_addr, Width::Word) {
            Ok(word) => word,
            Err(_) => return self.enter_exception(ExceptionKind::PrefetchAbort, fetch_addr.wrapping_add(4)),
        };
        let instr = decode(word);
        let result = execute(instr, &mut self.registers, bus, &mut self.coprocessors);
        self.metrics = self.metrics + result.metrics;
        if !result.branched {
            self.registers.set_fetch_pc(fetch_addr.wrapping_add(4));
        }
        if matches!(instr, Instruction::Breakpoint { .. }) {
            return StepOutcome::Breakpoint;
        }
        if let Some(kind) = result.exception {
            // The fetched instruction's own `+4` advance already ran above;
            // Data Abort's saved return address is PC-of-fault+8, so it
            // needs one more word on top of that, while SWI/UNDEF's is
            // PC-of-instr+4, already exactly what the advance produced.
            let extra = if kind == ExceptionKind::DataAbort { 4 } else { 0 };
            return self.enter_exception(kind, fetch_addr.wrapping_add(4).wrapping_add(extra));
        }
        StepOutcome::Retired { branched: result.branched }
    }

    fn enter_exception(&mut self, kind: ExceptionKind, return_addr: u32) -> StepOutcome {
        self.metrics = self.metrics + ExecutionMetrics::single(CycleBreakdown { nonsequential: 1, ..Default::default() });
        self.registers.enter_mode(kind.entry_mode(), return_addr);
        let mut psr = self.registers.cpsr();
        psr.i = true;
        if kind.masks_fiq() {
            psr.f = true;
        }
        self.registers.set_cpsr(psr);
        self.registers.set_fetch_pc(kind.vector());
        StepOutcome::Exception(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::Mode;
    use arm_bus::{device_ref, AddressMap, Device, Ram};

    fn cpu_with_program(words: &[u32]) -> (Cpu, SystemBus) {
        let mut cpu = Cpu::new(AddressMode::Bit32);
        cpu.reset(0);
        let ram = device_ref(Ram::new(0x1000));
        {
            let mut dev = ram.borrow_mut();
            for (i, word) in words.iter().enumerate() {
                dev.write((i * 4) as u32, Width::Word, *word);
            }
        }
        let mut read_map = AddressMap::new();
        read_map.try_insert(0, 0x1000, ram.clone());
        let mut write_map = AddressMap::new();
        write_map.try_insert(0, 0x1000, ram);
        (cpu, SystemBus { read_map, write_map })
    }

    #[test]
    fn run_loop_retires_a_simple_add_program() {
        // MOV R0, #1 ; MOV R1, #2 ; ADD R2, R0, R1
        let (mut cpu, bus) = cpu_with_program(&[0xE3A0_0001, 0xE3A0_1002, 0xE080_2001]);
        for _ in 0..3 {
            let outcome = cpu.step(&bus);
            assert!(matches!(outcome, StepOutcome::Retired { .. }));
        }
        assert_eq!(cpu.registers.read(2), 3);
        assert_eq!(cpu.metrics.instruction_count, 3);
    }

    #[test]
    fn condition_fail_is_cheap_and_still_retires() {
        // MOVEQ R0, #1 with Z clear (reset state): condition fails.
        let (mut cpu, bus) = cpu_with_program(&[0x03A0_0001]);
        let before = cpu.metrics;
        let outcome = cpu.step(&bus);
        assert!(matches!(outcome, StepOutcome::Retired { branched: false }));
        assert_eq!(cpu.registers.read(0), 0);
        assert_eq!((cpu.metrics - before).cycles.total(), 1);
    }

    #[test]
    fn software_interrupt_vectors_to_supervisor_mode() {
        let (mut cpu, bus) = cpu_with_program(&[0xEF00_0000]);
        let outcome = cpu.step(&bus);
        assert_eq!(outcome, StepOutcome::Exception(ExceptionKind::SoftwareInterrupt));
        assert_eq!(cpu.registers.cpsr().mode, Mode::Supervisor);
        assert_eq!(cpu.registers.fetch_pc(), ExceptionKind::SoftwareInterrupt.vector());
        assert!(cpu.registers.cpsr().i);
        assert_eq!(cpu.registers.read_in(14, Mode::Supervisor), 4);
    }

    #[test]
    fn unmapped_fetch_raises_prefetch_abort() {
        let mut cpu = Cpu::new(AddressMode::Bit32);
        cpu.reset(0x2000);
        let bus = SystemBus::new();
        let outcome = cpu.step(&bus);
        assert_eq!(outcome, StepOutcome::Exception(ExceptionKind::PrefetchAbort));
        assert_eq!(cpu.registers.read_in(14, Mode::Abort), 0x2004);
    }

    #[test]
    fn irq_saves_next_instruction_address_plus_four() {
        let (mut cpu, bus) = cpu_with_program(&[0xE1A0_0000]); // MOV R0, R0
        cpu.raise_irq();
        let outcome = cpu.step(&bus);
        assert_eq!(outcome, StepOutcome::Exception(ExceptionKind::Irq));
        assert_eq!(cpu.registers.cpsr().mode, Mode::Irq);
        assert_eq!(cpu.registers.read_in(14, Mode::Irq), 4);
    }

    #[test]
    fn fiq_saves_next_instruction_address_plus_four() {
        let (mut cpu, bus) = cpu_with_program(&[0xE1A0_0000]); // MOV R0, R0
        cpu.raise_fiq();
        let outcome = cpu.step(&bus);
        assert_eq!(outcome, StepOutcome::Exception(ExceptionKind::Fiq));
        assert_eq!(cpu.registers.cpsr().mode, Mode::Fiq);
        assert_eq!(cpu.registers.read_in(14, Mode::Fiq), 4);
        assert!(cpu.registers.cpsr().f);
    }

    #[test]
    fn data_abort_saves_faulting_instruction_address_plus_eight() {
        use crate::condition::Condition;
        use crate::instruction::{AddressOperand, ShifterOperand};

        // LDR R0, [R1], with R1 pointing outside the mapped region.
        let word = crate::encode::encode(Instruction::CoreDataTransfer {
            cond: Condition::Al,
            load: true,
            width: crate::instruction::TransferWidth::Word,
            rd: 0,
            address: AddressOperand { rn: 1, offset: ShifterOperand::Immediate(0), pre_indexed: true, negative_offset: false, writeback: false },
        })
        .unwrap();
        let (mut cpu, bus) = cpu_with_program(&[word]);
        cpu.registers.write(1, 0x9000);
        let outcome = cpu.step(&bus);
        assert_eq!(outcome, StepOutcome::Exception(ExceptionKind::DataAbort));
        assert_eq!(cpu.registers.cpsr().mode, Mode::Abort);
        assert_eq!(cpu.registers.read_in(14, Mode::Abort), 8);
    }

    #[test]
    fn bkpt_reports_breakpoint_without_taking_prefetch_abort() {
        // BKPT #0
        let word = crate::encode::encode(Instruction::Breakpoint { immediate: 0 }).unwrap();
        let (mut cpu, bus) = cpu_with_program(&[word]);
        let outcome = cpu.step(&bus);
        assert_eq!(outcome, StepOutcome::Breakpoint);
        assert_eq!(cpu.registers.cpsr().mode, Mode::User);
        assert_eq!(cpu.registers.fetch_pc(), 4);
    }
}
