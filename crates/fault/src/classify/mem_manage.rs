//! MemManage fault classification
//!
//! Walks the MMFSR cause bits in fixed order (last applicable wins),
//! captures MMFAR under the read-then-validate discipline, assesses the
//! thread-stack-corruption candidates, and clears the MMFSR byte on the
//! way out.

use crate::classify::{assess_stack_candidate, ClassifierCtx, StackAssessment};
use crate::fault_log;
use crate::frame::BasicFrame;
use crate::reason::FaultReason;
use crate::recoverable::apply_fixup;
use crate::registers::{cfsr, FaultRegisters};

/// Classify one MemManage fault (vector 4, or HardFault escalation).
///
/// `from_hard_fault` marks re-entry from the HardFault classifier; on that
/// path the MMFAR valid flag is explicitly reset after capture so the
/// re-entered classification cannot attribute the address to a later
/// fault.
pub(crate) fn mem_manage_fault<R: FaultRegisters>(
    ctx: &mut ClassifierCtx<'_, '_, R>,
    esf_addr: usize,
    esf: &mut BasicFrame,
    from_hard_fault: bool,
) -> (FaultReason, bool) {
    let mut reason = FaultReason::MemGeneric;
    let mut mmfar: Option<u32> = None;

    fault_log!("***** MPU FAULT *****");

    if ctx.regs.cfsr() & cfsr::MSTKERR != 0 {
        reason = FaultReason::MemStacking;
        fault_log!("  Stacking error (context area might be not valid)");
    }
    if ctx.regs.cfsr() & cfsr::MUNSTKERR != 0 {
        reason = FaultReason::MemUnstacking;
        fault_log!("  Unstacking error");
    }
    if ctx.regs.cfsr() & cfsr::DACCVIOL != 0 {
        reason = FaultReason::MemDataAccess;
        fault_log!("  Data Access Violation");
        if let Some(addr) = ctx.regs.mmfar_captured() {
            mmfar = Some(addr);
            fault_log!("  MMFAR Address: {=u32:#x}", addr);
            if from_hard_fault {
                ctx.regs.clear_cfsr(cfsr::MMARVALID);
            }
        }
    }
    if ctx.regs.cfsr() & cfsr::IACCVIOL != 0 {
        reason = FaultReason::MemInstructionAccess;
        fault_log!("  Instruction Access Violation");
    }
    if ctx.config.fp_lazy_state && ctx.regs.cfsr() & cfsr::MLSPERR != 0 {
        reason = FaultReason::MemFpLazyState;
        fault_log!("  Floating-point lazy state preservation error");
    }

    // A stacking or data-access violation may really be the thread stack
    // overrunning its guard region.
    let mut inconsistent = false;
    if ctx.regs.cfsr() & (cfsr::MSTKERR | cfsr::DACCVIOL) != 0 {
        let stacking = ctx.regs.cfsr() & cfsr::MSTKERR != 0;
        match assess_stack_candidate(ctx, esf_addr, mmfar, stacking) {
            StackAssessment::Overflow => reason = FaultReason::StackCheckFail,
            StackAssessment::Inconsistent => inconsistent = true,
            StackAssessment::NotAssessed => {}
        }
    }

    ctx.regs.clear_cfsr(cfsr::MEMFAULT_MASK);

    if inconsistent {
        return (FaultReason::CpuException, false);
    }
    let recoverable = apply_fixup(ctx.table, esf, true);
    (reason, recoverable)
}
