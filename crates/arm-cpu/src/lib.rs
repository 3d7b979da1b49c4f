//! ARM2/ARM3-class CPU core: banked register file, barrel shifter,
//! instruction decoder/executor and coprocessor bus.

mod condition;
mod coprocessor;
mod cpu;
mod decode;
mod encode;
mod execute;
mod instruction;
mod metrics;
mod registers;
mod shifter;

pub use condition::Condition;
pub use coprocessor::{CoprocessorBus, CoprocessorOutcome, CoprocessorRegisterHandler};
pub use cpu::{Cpu, ExceptionKind, StepOutcome};
pub use decode::decode;
pub use encode::{encode, encode_rotated_immediate};
pub use execute::execute;
pub use instruction::{
    AddressOperand, AluOp, BlockDirection, FpaPrecision, Instruction, PsrFieldMask, PsrSource, ShifterOperand,
    TransferWidth,
};
pub use metrics::ExecutionMetrics;
pub use registers::{pack_psr26, psr_field, unpack_psr26, AddressMode, Mode, Psr, RegisterFile};
pub use shifter::{apply, apply_by_register, apply_immediate, ShiftType};
