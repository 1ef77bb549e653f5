//! Per-category fault classifiers
//!
//! One classifier per fault vector. Each produces a single
//! [`FaultReason`] plus a recoverable flag, and clears the sticky status
//! bits it inspected — required so a later, unrelated fault of the same
//! category is never attributed to stale bits (invoking a classifier twice
//! on the same snapshot is impossible in practice).
//!
//! Precedence is policy, not accident:
//!
//! - MemManage/BusFault/UsageFault walk their cause bits in a fixed order
//!   where the *last* applicable check wins, with the stack-corruption
//!   assessment able to override the final result;
//! - SecureFault is an exclusive first-match chain;
//! - HardFault disambiguates via HFSR and re-enters the other classifiers
//!   on escalation.

pub(crate) mod bus;
pub(crate) mod debug;
pub(crate) mod hard;
pub(crate) mod mem_manage;
pub(crate) mod secure;
pub(crate) mod usage;

use crate::config::{FaultConfig, SecurityState};
use crate::fault_log;
use crate::frame::BasicFrame;
use crate::reason::FaultReason;
use crate::recoverable::RecoverableRegion;
use crate::registers::{icsr, FaultRegisters, SecondaryMpu};
use crate::stack::StackOverflowResolver;

/// Everything a classifier may consult or mutate.
///
/// Borrowed for the duration of one dispatch; no cross-fault state.
pub struct ClassifierCtx<'a, 'm, R: FaultRegisters> {
    /// Hardware (or mock) register view.
    pub regs: &'a mut R,
    /// Build capability configuration.
    pub config: &'a FaultConfig,
    /// Thread stack geometry oracle.
    pub resolver: &'a dyn StackOverflowResolver,
    /// Registered expected-fault regions.
    pub table: &'a [RecoverableRegion],
    /// Vendor secondary MPU, when the SoC has one.
    pub secondary_mpu: Option<&'a mut (dyn SecondaryMpu + 'm)>,
}

/// Route one fault vector to its classifier.
///
/// `esf_addr` is the address of the in-memory frame (doubles as the stack
/// pointer at fault for the overflow assessment); `esf` is the borrowed
/// frame itself.
pub fn classify_vector<R: FaultRegisters>(
    ctx: &mut ClassifierCtx<'_, '_, R>,
    vector: u32,
    esf_addr: usize,
    esf: &mut BasicFrame,
) -> (FaultReason, bool) {
    match vector {
        3 => hard::hard_fault(ctx, esf_addr, esf),
        4 => mem_manage::mem_manage_fault(ctx, esf_addr, esf, false),
        5 => bus::bus_fault(ctx, esf_addr, esf, false),
        6 => usage::usage_fault(ctx),
        7 if ctx.config.security == SecurityState::Secure => secure::secure_fault(ctx),
        12 => debug::debug_monitor(ctx, esf),
        other => reserved_exception(other),
    }
}

/// Reserved exception vectors and spurious interrupts: always the generic
/// reason, never recoverable.
fn reserved_exception(vector: u32) -> (FaultReason, bool) {
    if vector < 16 {
        fault_log!("***** Reserved Exception ({=u32}) *****", vector);
    } else {
        fault_log!("***** Spurious interrupt (IRQ {=u32}) *****", vector.wrapping_sub(16));
    }
    (FaultReason::CpuException, false)
}

/// Outcome of the thread-stack-corruption assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StackAssessment {
    /// Genuine guard overrun; PSP has been forced to a safe value.
    Overflow,
    /// The hardware state contradicts the build configuration — treat as
    /// an internal programming error, not a classifiable fault.
    Inconsistent,
    /// Not a stack overflow (or not assessable from this context).
    NotAssessed,
}

/// Assess whether a stacking/data-access fault is thread stack exhaustion.
///
/// Shared by the MemManage and BusFault classifiers. The assessment only
/// runs when this exception is the outermost active one (ICSR.RETTOBASE):
/// the resolver reasons about the *thread* stack and must never see a
/// handler-mode frame.
pub(crate) fn assess_stack_candidate<R: FaultRegisters>(
    ctx: &mut ClassifierCtx<'_, '_, R>,
    esf_addr: usize,
    fault_addr: Option<u32>,
    stacking_bit_set: bool,
) -> StackAssessment {
    if !ctx.config.stack_guard_support() {
        if stacking_bit_set {
            // No guard region and no userspace means nothing in this build
            // can legitimately produce a stacking fault.
            fault_log!("  Stacking error without stack guard support");
            return StackAssessment::Inconsistent;
        }
        return StackAssessment::NotAssessed;
    }
    if ctx.regs.icsr() & icsr::RETTOBASE == 0 {
        return StackAssessment::NotAssessed;
    }
    match ctx.resolver.resolve(fault_addr.map(|a| a as usize), esf_addr) {
        Some(safe_sp) => {
            // Force the live PSP off the guard region before the exception
            // returns; the context-switch path reads through it.
            ctx.regs.set_psp(safe_sp);
            StackAssessment::Overflow
        }
        None if stacking_bit_set => {
            // The hardware reported a stacking failure the thread stack
            // geometry cannot explain.
            fault_log!("  Stacking error not caused by stack exhaustion");
            StackAssessment::Inconsistent
        }
        None => StackAssessment::NotAssessed,
    }
}

/// SVC opcode prefix (Thumb `SVC #imm8` is `0xDF imm8`).
const SVC_OPCODE_PREFIX: u16 = 0xDF00;

/// SVC immediate reserved for application-raised runtime exceptions.
const SVC_RUNTIME_EXCEPT: u16 = 0x02;

/// Whether the faulting instruction was the kernel's runtime-exception SVC.
///
/// The stacked return address points one instruction past a synchronous
/// SVC, so the opcode lives two bytes back. The probe itself is guarded
/// against cascading bus faults inside
/// [`FaultRegisters::probe_insn`].
pub(crate) fn is_synchronous_svc<R: FaultRegisters>(
    ctx: &mut ClassifierCtx<'_, '_, R>,
    esf: &BasicFrame,
) -> bool {
    let opcode_addr = esf.pc.wrapping_sub(2);
    let insn = ctx.regs.probe_insn(opcode_addr);
    insn & 0xFF00 == SVC_OPCODE_PREFIX && insn & 0x00FF == SVC_RUNTIME_EXCEPT
}

/// Reason for an application-raised exception, taken from the stacked r0.
///
/// An r0 that does not name a documented reason degrades to
/// [`FaultReason::KernelOops`] instead of trusting arbitrary memory.
pub(crate) fn application_reason(r0: u32) -> FaultReason {
    FaultReason::from_u32(r0).unwrap_or(FaultReason::KernelOops)
}
