//! UsageFault classification
//!
//! Fixed-order UFSR walk, last applicable bit wins — except the ARMv8-M
//! stack-limit violation on builds with the built-in stack guard, which
//! overrides every other bit: the limit check fires *before* the frame is
//! written, so nothing else read from the stacked context can be trusted.

use crate::classify::ClassifierCtx;
use crate::config::Arch;
use crate::fault_log;
use crate::reason::FaultReason;
use crate::registers::{cfsr, FaultRegisters};

/// Classify one UsageFault (vector 6, or HardFault escalation).
///
/// Usage faults are never recoverable: none of the causes can be an
/// expected probe fault.
pub(crate) fn usage_fault<R: FaultRegisters>(ctx: &mut ClassifierCtx<'_, '_, R>) -> (FaultReason, bool) {
    let mut reason = FaultReason::UsageGeneric;
    let mut forced_stack_overflow = false;

    fault_log!("***** USAGE FAULT *****");

    if ctx.regs.cfsr() & cfsr::DIVBYZERO != 0 {
        reason = FaultReason::UsageDivByZero;
        fault_log!("  Division by zero");
    }
    if ctx.regs.cfsr() & cfsr::UNALIGNED != 0 {
        reason = FaultReason::UsageUnaligned;
        fault_log!("  Unaligned memory access");
    }
    if ctx.config.arch == Arch::Mainline && ctx.regs.cfsr() & cfsr::STKOF != 0 {
        reason = FaultReason::UsageStackOverflow;
        fault_log!("  Stack overflow (context area not valid)");
        if ctx.config.builtin_stack_guard {
            forced_stack_overflow = true;
        }
    }
    if ctx.regs.cfsr() & cfsr::NOCP != 0 {
        reason = FaultReason::UsageNoCoprocessor;
        fault_log!("  Attempt to use a coprocessor that is not present");
    }
    if ctx.regs.cfsr() & cfsr::INVPC != 0 {
        reason = FaultReason::UsageIllegalExcReturn;
        fault_log!("  Illegal EXC_RETURN loaded to PC");
    }
    if ctx.regs.cfsr() & cfsr::INVSTATE != 0 {
        reason = FaultReason::UsageIllegalEpsr;
        fault_log!("  Illegal use of the EPSR");
    }
    if ctx.regs.cfsr() & cfsr::UNDEFINSTR != 0 {
        reason = FaultReason::UsageUndefinedInstruction;
        fault_log!("  Undefined instruction");
    }

    ctx.regs.clear_cfsr(cfsr::USGFAULT_MASK);

    if forced_stack_overflow {
        reason = FaultReason::StackCheckFail;
    }
    (reason, false)
}
