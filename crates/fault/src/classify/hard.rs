//! HardFault classification
//!
//! On baseline (ARMv6-M) cores HardFault is the only fault vector, so the
//! classifier starts from nothing: check the recoverable table, then probe
//! the faulting instruction for the kernel's runtime-exception SVC.
//!
//! On mainline cores HFSR says why the fault arrived here: a vector-table
//! read error, a debug event, or escalation of a configurable fault whose
//! cause bits are still sitting in CFSR/SFSR — in which case the matching
//! classifier is re-entered with `from_hard_fault` set.

use crate::classify::{
    application_reason, bus, is_synchronous_svc, mem_manage, secure, usage, ClassifierCtx,
};
use crate::config::{Arch, SecurityState};
use crate::fault_log;
use crate::frame::BasicFrame;
use crate::reason::FaultReason;
use crate::recoverable::apply_fixup;
use crate::registers::{cfsr, hfsr, FaultRegisters};

/// Classify one HardFault (vector 3).
pub(crate) fn hard_fault<R: FaultRegisters>(
    ctx: &mut ClassifierCtx<'_, '_, R>,
    esf_addr: usize,
    esf: &mut BasicFrame,
) -> (FaultReason, bool) {
    let mut reason = FaultReason::CpuException;
    let mut recoverable = false;

    fault_log!("***** HARD FAULT *****");

    match ctx.config.arch {
        Arch::Baseline => {
            // Expected probe faults escalate straight here on baseline
            // cores; resolve them before touching anything else.
            if apply_fixup(ctx.table, esf, true) {
                return (reason, true);
            }
            if is_synchronous_svc(ctx, esf) {
                reason = application_reason(esf.r0);
                fault_log!("Application-raised exception, reason {=u32}", esf.r0);
            }
        }
        Arch::Mainline => {
            let status = ctx.regs.hfsr();
            if status & hfsr::VECTTBL != 0 {
                fault_log!("  Bus fault on vector table read");
            } else if status & hfsr::DEBUGEVT != 0 {
                fault_log!("  Debug event");
            } else if status & hfsr::FORCED != 0 {
                fault_log!("  Fault escalation (see below)");
                if is_synchronous_svc(ctx, esf) {
                    reason = application_reason(esf.r0);
                    fault_log!("Application-raised exception, reason {=u32}", esf.r0);
                } else if ctx.regs.cfsr() & cfsr::MEMFAULT_MASK != 0 {
                    (reason, recoverable) = mem_manage::mem_manage_fault(ctx, esf_addr, esf, true);
                } else if ctx.regs.cfsr() & cfsr::BUSFAULT_MASK != 0 {
                    (reason, recoverable) = bus::bus_fault(ctx, esf_addr, esf, true);
                } else if ctx.regs.cfsr() & cfsr::USGFAULT_MASK != 0 {
                    (reason, recoverable) = usage::usage_fault(ctx);
                } else if ctx.config.security == SecurityState::Secure && ctx.regs.sfsr() != 0 {
                    (reason, recoverable) = secure::secure_fault(ctx);
                } else {
                    // Escalation with no status bits anywhere: the fault
                    // machinery state is not trustworthy.
                    fault_log!("  Fault escalation without any status bit set");
                }
            } else {
                fault_log!("  HardFault with no HFSR cause bit set");
            }
        }
    }
    (reason, recoverable)
}
