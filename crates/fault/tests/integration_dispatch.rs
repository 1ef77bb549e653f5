//! End-to-end dispatch scenarios over the mock register file.
//!
//! Each test drives the full pipeline — locate → classify → recover or
//! hand off — the way the exception trampoline would, with synthetic
//! register state standing in for the hardware.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use fault::registers::{cfsr, icsr, sfsr};
use fault::{
    BasicFrame, ExceptionStackFrame, FatalHandler, FaultConfig, FaultDispatcher, FaultReason,
    GuardedStackResolver, MockFaultRegisters, MockSecondaryMpu, MpuPortError, Outcome,
    RecoverableFaultTable, RecoverableRegion, SecurityState,
};

/// EXC_RETURN: thread mode, process stack, standard frame (canonical).
const THREAD_PSP: u32 = 0xFFFF_FFFD;
/// EXC_RETURN: handler mode, main stack, standard frame (canonical).
const HANDLER_MSP: u32 = 0xFFFF_FFF1;

const MSP: usize = 0x2000_8000;

struct RecordingFatal {
    calls: Vec<(FaultReason, ExceptionStackFrame)>,
}

impl RecordingFatal {
    fn new() -> Self {
        Self { calls: Vec::new() }
    }
}

impl FatalHandler for RecordingFatal {
    fn fatal_error(&mut self, reason: FaultReason, esf: &ExceptionStackFrame) {
        self.calls.push((reason, *esf));
    }
}

fn never_overflow(_addr: Option<usize>, _sp: usize) -> Option<usize> {
    None
}

#[test]
fn data_access_violation_with_mmfar_hands_off_mem_data_access() {
    let mut regs = MockFaultRegisters::new();
    regs.icsr = 4; // MemManage vector
    regs.cfsr = cfsr::DACCVIOL | cfsr::MMARVALID;
    regs.mmfar.set(0xFF00_1234);
    let mut fatal = RecordingFatal::new();
    let mut esf = BasicFrame { pc: 0x0800_2000, ..BasicFrame::default() };
    let psp = core::ptr::addr_of_mut!(esf) as usize;

    let mut dispatcher = FaultDispatcher::new(
        &mut regs,
        FaultConfig::mainline(),
        &never_overflow,
        &[],
        &mut fatal,
    );
    let outcome = dispatcher.handle(MSP, psp, THREAD_PSP, None);

    assert_eq!(outcome, Outcome::HandedOff(FaultReason::MemDataAccess));
    // The sticky byte was cleared exactly once: a second fault can never
    // be attributed to this one's bits.
    assert_eq!(regs.cfsr_clear_count(cfsr::MEMFAULT_MASK), 1);
    assert_eq!(regs.cfsr & cfsr::MEMFAULT_MASK, 0);
    assert_eq!(regs.mmfar_reads.get(), 1);
    assert_eq!(fatal.calls.len(), 1);
}

#[test]
fn stack_overrun_beats_data_access_and_forces_the_psp() {
    // MSTKERR + DACCVIOL with guard support and a resolver that confirms
    // the overrun: STACK_CHK_FAIL, not MEM_DATA_ACCESS.
    let resolver = GuardedStackResolver {
        stack_bottom: 0x2000_0000,
        guard_size: 0x100,
    };
    let mut regs = MockFaultRegisters::new();
    regs.icsr = 4 | icsr::RETTOBASE;
    regs.cfsr = cfsr::MSTKERR | cfsr::DACCVIOL | cfsr::MMARVALID;
    regs.mmfar.set(0x2000_0080); // inside the guard region
    let mut fatal = RecordingFatal::new();
    let mut config = FaultConfig::mainline();
    config.mpu_stack_guard = true;
    let mut esf = BasicFrame::default();
    let psp = core::ptr::addr_of_mut!(esf) as usize;

    let mut dispatcher = FaultDispatcher::new(&mut regs, config, &resolver, &[], &mut fatal);
    let outcome = dispatcher.handle(MSP, psp, THREAD_PSP, None);

    assert_eq!(outcome, Outcome::HandedOff(FaultReason::StackCheckFail));
    assert_eq!(regs.psp_writes.as_slice(), &[0x2000_0100]);
}

#[test]
fn stacking_error_without_guard_support_surfaces_as_internal_fault() {
    let mut regs = MockFaultRegisters::new();
    regs.icsr = 4;
    regs.cfsr = cfsr::MSTKERR;
    let mut fatal = RecordingFatal::new();
    let mut esf = BasicFrame::default();
    let psp = core::ptr::addr_of_mut!(esf) as usize;

    let mut dispatcher = FaultDispatcher::new(
        &mut regs,
        FaultConfig::mainline(),
        &never_overflow,
        &[],
        &mut fatal,
    );
    let outcome = dispatcher.handle(MSP, psp, THREAD_PSP, None);

    // Surfaced as the generic internal-inconsistency reason — never
    // silently misclassified as an ordinary MemManage stacking fault.
    assert_eq!(outcome, Outcome::HandedOff(FaultReason::CpuException));
    assert_eq!(fatal.calls[0].0, FaultReason::CpuException);
}

#[test]
fn hard_fault_escalation_of_imprecise_bus_error() {
    use fault::registers::hfsr;

    let mut regs = MockFaultRegisters::new();
    regs.icsr = 3; // HardFault vector
    regs.hfsr = hfsr::FORCED;
    regs.cfsr = cfsr::IMPRECISERR;
    regs.probed_insn = 0x4770; // not an SVC
    let mut fatal = RecordingFatal::new();
    let mut esf = BasicFrame { pc: 0x0800_4000, ..BasicFrame::default() };
    let psp = core::ptr::addr_of_mut!(esf) as usize;

    let mut dispatcher = FaultDispatcher::new(
        &mut regs,
        FaultConfig::mainline(),
        &never_overflow,
        &[],
        &mut fatal,
    );
    let outcome = dispatcher.handle(MSP, psp, THREAD_PSP, None);

    assert_eq!(outcome, Outcome::HandedOff(FaultReason::BusImpreciseData));
    assert_eq!(regs.cfsr & cfsr::BUSFAULT_MASK, 0);
}

#[test]
fn registered_probe_fault_resumes_at_the_fixup() {
    // A user-mode string-length probe faults one instruction into its
    // registered range: recoverable, PC rewritten, fatal never invoked.
    let mut table: RecoverableFaultTable<4> = RecoverableFaultTable::new();
    table
        .register(RecoverableRegion {
            start: 0x0800_0101, // Thumb bit set, as linker symbols carry it
            end: 0x0800_0121,
            fixup: 0x0800_0301,
        })
        .unwrap();

    let mut regs = MockFaultRegisters::new();
    regs.icsr = 4;
    regs.cfsr = cfsr::DACCVIOL;
    let mut fatal = RecordingFatal::new();
    let mut esf = BasicFrame { pc: 0x0800_0102, ..BasicFrame::default() };
    let psp = core::ptr::addr_of_mut!(esf) as usize;

    let mut dispatcher = FaultDispatcher::new(
        &mut regs,
        FaultConfig::mainline(),
        &never_overflow,
        table.regions(),
        &mut fatal,
    );
    let outcome = dispatcher.handle(MSP, psp, THREAD_PSP, None);

    assert_eq!(outcome, Outcome::Resumed);
    assert!(fatal.calls.is_empty());
    assert_eq!(esf.pc, 0x0800_0301);
}

#[test]
fn nested_handler_fault_dispatches_from_the_main_stack() {
    let mut regs = MockFaultRegisters::new();
    regs.icsr = 5;
    regs.cfsr = cfsr::PRECISERR;
    let mut fatal = RecordingFatal::new();
    let mut esf = BasicFrame { pc: 0x0800_7000, ..BasicFrame::default() };
    let msp = core::ptr::addr_of_mut!(esf) as usize;

    let mut dispatcher = FaultDispatcher::new(
        &mut regs,
        FaultConfig::mainline(),
        &never_overflow,
        &[],
        &mut fatal,
    );
    let outcome = dispatcher.handle(msp, 0x2000_4000, HANDLER_MSP, None);

    assert_eq!(outcome, Outcome::HandedOff(FaultReason::BusPreciseData));
    assert_eq!(fatal.calls[0].1.basic.pc, 0x0800_7000);
}

#[test]
fn secure_fault_first_match_chain() {
    let mut regs = MockFaultRegisters::new();
    regs.icsr = 7; // SecureFault vector
    regs.sfsr = sfsr::AUVIOL | sfsr::LSERR | sfsr::SFARVALID;
    regs.sfar = 0x1000_0000;
    let mut fatal = RecordingFatal::new();
    let config = FaultConfig {
        security: SecurityState::Secure,
        ..FaultConfig::mainline()
    };
    let mut esf = BasicFrame::default();
    let psp = core::ptr::addr_of_mut!(esf) as usize;

    let mut dispatcher = FaultDispatcher::new(&mut regs, config, &never_overflow, &[], &mut fatal);
    // Canonical secure thread/PSP EXC_RETURN.
    let outcome = dispatcher.handle(MSP, psp, THREAD_PSP, None);

    assert_eq!(outcome, Outcome::HandedOff(FaultReason::SecureAttributionUnit));
    assert_eq!(regs.sfsr & sfsr::ALL_MASK, 0);
}

#[test]
fn secondary_mpu_port_resolution_reports_stack_overflow() {
    let resolver = GuardedStackResolver {
        stack_bottom: 0x2000_0000,
        guard_size: 0x100,
    };
    let mut regs = MockFaultRegisters::new();
    regs.icsr = 5 | icsr::RETTOBASE;
    regs.cfsr = cfsr::STKERR;
    let mut mpu = MockSecondaryMpu::with_ports(2);
    mpu.latch(0, MpuPortError { address: 0x2000_0040, detail: 0x1 });
    let mut fatal = RecordingFatal::new();
    let mut config = FaultConfig::mainline();
    config.mpu_stack_guard = true;
    let mut esf = BasicFrame::default();
    let psp = core::ptr::addr_of_mut!(esf) as usize;

    let mut dispatcher = FaultDispatcher::new(&mut regs, config, &resolver, &[], &mut fatal)
        .with_secondary_mpu(&mut mpu);
    let outcome = dispatcher.handle(MSP, psp, THREAD_PSP, None);

    assert_eq!(outcome, Outcome::HandedOff(FaultReason::StackCheckFail));
    assert_eq!(mpu.clears.as_slice(), &[0b01]);
}

#[test]
fn baseline_svc_oops_takes_reason_from_r0() {
    let mut regs = MockFaultRegisters::new();
    regs.icsr = 3;
    regs.probed_insn = 0xDF02; // svc #2
    let mut fatal = RecordingFatal::new();
    let mut esf = BasicFrame {
        r0: FaultReason::KernelOops.as_u32(),
        pc: 0x0800_0010,
        ..BasicFrame::default()
    };
    let psp = core::ptr::addr_of_mut!(esf) as usize;

    let mut dispatcher = FaultDispatcher::new(
        &mut regs,
        FaultConfig::baseline(),
        &never_overflow,
        &[],
        &mut fatal,
    );
    let outcome = dispatcher.handle(MSP, psp, THREAD_PSP, None);

    assert_eq!(outcome, Outcome::HandedOff(FaultReason::KernelOops));
    // The opcode probe looked two bytes behind the stacked return address.
    assert_eq!(regs.probe_addrs.as_slice(), &[0x0800_000E]);
}

#[test]
fn debug_monitor_non_error_event_resumes() {
    let mut regs = MockFaultRegisters::new();
    regs.icsr = 12;
    regs.debug_event_error = false;
    let mut fatal = RecordingFatal::new();
    let mut config = FaultConfig::mainline();
    config.null_pointer_dwt = true;
    let mut esf = BasicFrame::default();
    let psp = core::ptr::addr_of_mut!(esf) as usize;

    let mut dispatcher = FaultDispatcher::new(&mut regs, config, &never_overflow, &[], &mut fatal);
    let outcome = dispatcher.handle(MSP, psp, THREAD_PSP, None);

    assert_eq!(outcome, Outcome::Resumed);
    assert!(fatal.calls.is_empty());
}

#[test]
fn reserved_vector_is_generic_and_fatal() {
    let mut regs = MockFaultRegisters::new();
    regs.icsr = 13; // reserved vector
    let mut fatal = RecordingFatal::new();
    let mut esf = BasicFrame::default();
    let psp = core::ptr::addr_of_mut!(esf) as usize;

    let mut dispatcher = FaultDispatcher::new(
        &mut regs,
        FaultConfig::mainline(),
        &never_overflow,
        &[],
        &mut fatal,
    );
    let outcome = dispatcher.handle(MSP, psp, THREAD_PSP, None);
    assert_eq!(outcome, Outcome::HandedOff(FaultReason::CpuException));
}
