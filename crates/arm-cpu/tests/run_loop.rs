//! End-to-end run-loop scenarios driven entirely through the public API,
//! the way a host crate (`arm-system`) would use this crate.

use arm_bus::{device_ref, AddressMap, Device, Ram, SystemBus, Width};
use arm_cpu::{AddressMode, Cpu, ExceptionKind, StepOutcome};

fn bus_with_program(words: &[u32]) -> SystemBus {
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
    SystemBus { read_map, write_map }
}

#[test]
fn a_small_program_retires_and_accumulates_metrics() {
    // MOV R0, #10 ; MOV R1, #20 ; ADD R2, R0, R1 ; SUBS R3, R2, R0
    let bus = bus_with_program(&[0xE3A0_000A, 0xE3A0_1014, 0xE080_2001, 0xE052_3000]);
    let mut cpu = Cpu::new(AddressMode::Bit32);
    cpu.reset(0);
    for _ in 0..4 {
        assert!(matches!(cpu.step(&bus), StepOutcome::Retired { .. }));
    }
    assert_eq!(cpu.registers.read(2), 30);
    assert_eq!(cpu.registers.read(3), 20);
    assert_eq!(cpu.metrics.instruction_count, 4);
    assert!(cpu.metrics.cycles.total() >= 4);
}

#[test]
fn branch_loop_terminates_via_condition_code() {
    // R0 counts down from 3 to 0:
    //   loop: SUBS R0, R0, #1
    //         BNE loop
    let bus = bus_with_program(&[0xE250_0001, 0x1AFF_FFFD]);
    let mut cpu = Cpu::new(AddressMode::Bit32);
    cpu.reset(0);
    cpu.registers.write(0, 3);
    let mut steps = 0;
    loop {
        cpu.step(&bus);
        steps += 1;
        if cpu.registers.read(0) == 0 && cpu.registers.cpsr().z {
            cpu.step(&bus); // final BNE, condition now fails, loop exits.
            break;
        }
        assert!(steps < 100, "loop did not converge");
    }
    assert_eq!(cpu.registers.read(0), 0);
}

#[test]
fn software_interrupt_vectors_and_masks_irq() {
    let bus = bus_with_program(&[0xEF00_0000]);
    let mut cpu = Cpu::new(AddressMode::Bit32);
    cpu.reset(0);
    let outcome = cpu.step(&bus);
    assert_eq!(outcome, StepOutcome::Exception(ExceptionKind::SoftwareInterrupt));
    assert_eq!(cpu.registers.fetch_pc(), ExceptionKind::SoftwareInterrupt.vector());
    assert!(cpu.registers.cpsr().i);
}
