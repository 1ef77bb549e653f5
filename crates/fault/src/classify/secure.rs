//! SecureFault classification (ARMv8-M security extension)
//!
//! Unlike the MemManage/BusFault/UsageFault walks, SFSR causes are an
//! exclusive first-match chain. SFAR is captured under the same
//! read-then-validate discipline as the other address registers.

use crate::classify::ClassifierCtx;
use crate::fault_log;
use crate::reason::FaultReason;
use crate::registers::{sfsr, FaultRegisters};

/// Classify one SecureFault (vector 7 on secure builds, or HardFault
/// escalation). Never recoverable — a security violation is never an
/// expected probe fault.
pub(crate) fn secure_fault<R: FaultRegisters>(ctx: &mut ClassifierCtx<'_, '_, R>) -> (FaultReason, bool) {
    let mut reason = FaultReason::SecureGeneric;

    fault_log!("***** SECURE FAULT *****");

    if ctx.regs.sfsr() & sfsr::INVEP != 0 {
        reason = FaultReason::SecureEntryPoint;
        fault_log!("  Invalid entry point");
    } else if ctx.regs.sfsr() & sfsr::INVIS != 0 {
        reason = FaultReason::SecureIntegritySignature;
        fault_log!("  Invalid integrity signature");
    } else if ctx.regs.sfsr() & sfsr::INVER != 0 {
        reason = FaultReason::SecureExceptionReturn;
        fault_log!("  Invalid exception return");
    } else if ctx.regs.sfsr() & sfsr::AUVIOL != 0 {
        reason = FaultReason::SecureAttributionUnit;
        fault_log!("  Attribution unit violation");
        if let Some(addr) = ctx.regs.sfar_captured() {
            fault_log!("  SFAR Address: {=u32:#x}", addr);
        }
    } else if ctx.regs.sfsr() & sfsr::INVTRAN != 0 {
        reason = FaultReason::SecureTransition;
        fault_log!("  Invalid transition");
    } else if ctx.regs.sfsr() & sfsr::LSPERR != 0 {
        reason = FaultReason::SecureLazyStatePreservation;
        fault_log!("  Lazy state preservation error");
    } else if ctx.regs.sfsr() & sfsr::LSERR != 0 {
        reason = FaultReason::SecureLazyStateError;
        fault_log!("  Lazy state error");
    }

    ctx.regs.clear_sfsr(sfsr::ALL_MASK);
    (reason, false)
}
