//! BusFault classification
//!
//! Same shape as MemManage: fixed-order cause-bit walk (last applicable
//! wins), BFAR capture under the read-then-validate discipline, the
//! stack-corruption assessment gated on the stacking bit, and a
//! write-one-to-clear sweep of the BFSR byte on exit.
//!
//! SoCs with a vendor bus-level MPU additionally latch per-port error
//! descriptors that surface here as (typically imprecise) BusFaults; the
//! port loop polls and clears them, attempting the stack-overflow fix per
//! errored port until one resolves.

use crate::classify::{assess_stack_candidate, ClassifierCtx, StackAssessment};
use crate::fault_log;
use crate::frame::BasicFrame;
use crate::reason::FaultReason;
use crate::recoverable::apply_fixup;
use crate::registers::{cfsr, icsr, FaultRegisters};

/// Upper bound on secondary-MPU ports (one bit each in the error mask).
const MAX_MPU_PORTS: u32 = 32;

/// Classify one BusFault (vector 5, or HardFault escalation).
pub(crate) fn bus_fault<R: FaultRegisters>(
    ctx: &mut ClassifierCtx<'_, '_, R>,
    esf_addr: usize,
    esf: &mut BasicFrame,
    from_hard_fault: bool,
) -> (FaultReason, bool) {
    let mut reason = FaultReason::BusGeneric;
    let mut bfar: Option<u32> = None;

    fault_log!("***** BUS FAULT *****");

    if ctx.regs.cfsr() & cfsr::STKERR != 0 {
        reason = FaultReason::BusStacking;
        fault_log!("  Stacking error (context area might be not valid)");
    }
    if ctx.regs.cfsr() & cfsr::UNSTKERR != 0 {
        reason = FaultReason::BusUnstacking;
        fault_log!("  Unstacking error");
    }
    if ctx.regs.cfsr() & cfsr::PRECISERR != 0 {
        reason = FaultReason::BusPreciseData;
        fault_log!("  Precise data bus error");
        if let Some(addr) = ctx.regs.bfar_captured() {
            bfar = Some(addr);
            fault_log!("  BFAR Address: {=u32:#x}", addr);
            if from_hard_fault {
                ctx.regs.clear_cfsr(cfsr::BFARVALID);
            }
        }
    }
    if ctx.regs.cfsr() & cfsr::IMPRECISERR != 0 {
        reason = FaultReason::BusImpreciseData;
        fault_log!("  Imprecise data bus error");
    }
    if ctx.regs.cfsr() & cfsr::IBUSERR != 0 {
        reason = FaultReason::BusInstruction;
        fault_log!("  Instruction bus error");
    }
    if ctx.config.fp_lazy_state && ctx.regs.cfsr() & cfsr::LSPERR != 0 {
        reason = FaultReason::BusFpLazyState;
        fault_log!("  Floating-point lazy state preservation error");
    }

    // Stack-corruption candidate, gated on the stacking bit specifically.
    let mut inconsistent = false;
    if ctx.regs.cfsr() & cfsr::STKERR != 0 {
        match assess_stack_candidate(ctx, esf_addr, bfar, true) {
            StackAssessment::Overflow => reason = FaultReason::StackCheckFail,
            StackAssessment::Inconsistent => inconsistent = true,
            StackAssessment::NotAssessed => {}
        }
    }

    // Poll the vendor MPU's per-port error latches. Every errored port is
    // reported; while the stacking bit stands, each port's address gets a
    // stack-overflow attempt until one resolves. Whether multiple attempts
    // per fault are intentional is inherited behavior — see the unit test
    // pinning it below.
    if let Some(mpu) = ctx.secondary_mpu.take() {
        let errored = mpu.error_ports();
        if errored != 0 {
            for port in 0..MAX_MPU_PORTS {
                if errored & (1u32 << port) == 0 {
                    continue;
                }
                let err = mpu.port_error(port);
                fault_log!(
                    "  Secondary MPU port {=u32}: address {=u32:#x}, detail {=u32:#x}",
                    port,
                    err.address,
                    err.detail
                );
                if ctx.regs.cfsr() & cfsr::STKERR == 0 {
                    continue;
                }
                if !ctx.config.stack_guard_support() {
                    continue;
                }
                if ctx.regs.icsr() & icsr::RETTOBASE == 0 {
                    continue;
                }
                if let Some(safe_sp) = ctx.resolver.resolve(Some(err.address as usize), esf_addr) {
                    ctx.regs.set_psp(safe_sp);
                    reason = FaultReason::StackCheckFail;
                    break;
                }
            }
            mpu.clear_errors(errored);
        }
        ctx.secondary_mpu = Some(mpu);
    }

    ctx.regs.clear_cfsr(cfsr::BUSFAULT_MASK);

    if inconsistent {
        return (FaultReason::CpuException, false);
    }
    let recoverable = apply_fixup(ctx.table, esf, true);
    (reason, recoverable)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::classify::test_util::*;
    use crate::config::FaultConfig;
    use crate::mock::{MockFaultRegisters, MockSecondaryMpu};
    use crate::registers::{MpuPortError, SecondaryMpu};

    const ESF_ADDR: usize = 0x2000_0800;

    fn frame() -> BasicFrame {
        BasicFrame { pc: 0x0800_0100, ..BasicFrame::default() }
    }

    #[test]
    fn precise_error_captures_bfar() {
        let mut regs = MockFaultRegisters::new();
        regs.cfsr = cfsr::PRECISERR | cfsr::BFARVALID;
        regs.bfar = 0x6000_0000;
        let config = FaultConfig::mainline();
        let mut c = ctx(&mut regs, &config, &no_overflow);
        let (reason, recoverable) = bus_fault(&mut c, ESF_ADDR, &mut frame(), false);
        assert_eq!(reason, FaultReason::BusPreciseData);
        assert!(!recoverable);
        assert_eq!(regs.cfsr & cfsr::BUSFAULT_MASK, 0);
        assert_eq!(regs.cfsr_clear_count(cfsr::BUSFAULT_MASK), 1);
    }

    #[test]
    fn imprecise_error_outranks_precise_in_program_order() {
        let mut regs = MockFaultRegisters::new();
        regs.cfsr = cfsr::PRECISERR | cfsr::IMPRECISERR;
        let config = FaultConfig::mainline();
        let mut c = ctx(&mut regs, &config, &no_overflow);
        let (reason, _) = bus_fault(&mut c, ESF_ADDR, &mut frame(), false);
        assert_eq!(reason, FaultReason::BusImpreciseData);
    }

    #[test]
    fn stacking_error_resolving_to_overflow() {
        let mut regs = MockFaultRegisters::new();
        regs.cfsr = cfsr::STKERR;
        regs.icsr = icsr::RETTOBASE;
        let mut config = FaultConfig::mainline();
        config.mpu_stack_guard = true;
        let mut c = ctx(&mut regs, &config, &always_overflow);
        let (reason, _) = bus_fault(&mut c, ESF_ADDR, &mut frame(), false);
        assert_eq!(reason, FaultReason::StackCheckFail);
        assert_eq!(regs.psp_writes.as_slice(), &[SAFE_SP]);
    }

    #[test]
    fn stacking_error_without_guard_support_is_internal_error() {
        let mut regs = MockFaultRegisters::new();
        regs.cfsr = cfsr::STKERR;
        let config = FaultConfig::mainline();
        let mut c = ctx(&mut regs, &config, &no_overflow);
        let (reason, recoverable) = bus_fault(&mut c, ESF_ADDR, &mut frame(), false);
        assert_eq!(reason, FaultReason::CpuException);
        assert!(!recoverable);
    }

    #[test]
    fn secondary_mpu_ports_are_polled_and_cleared() {
        let mut regs = MockFaultRegisters::new();
        regs.cfsr = cfsr::IMPRECISERR;
        let config = FaultConfig::mainline();
        let mut mpu = MockSecondaryMpu::with_ports(4);
        mpu.latch(0, MpuPortError { address: 0x6000_0000, detail: 0x1 });
        mpu.latch(2, MpuPortError { address: 0x6000_0040, detail: 0x2 });
        let resolver = no_overflow;
        let mut c = ClassifierCtx {
            regs: &mut regs,
            config: &config,
            resolver: &resolver,
            table: &[],
            secondary_mpu: Some(&mut mpu),
        };
        let (reason, _) = bus_fault(&mut c, ESF_ADDR, &mut frame(), false);
        assert_eq!(reason, FaultReason::BusImpreciseData);
        assert_eq!(mpu.consulted.as_slice(), &[0, 2]);
        assert_eq!(mpu.clears.as_slice(), &[0b101]);
        assert_eq!(mpu.error_ports(), 0);
    }

    /// Pins the inherited multi-attempt behavior: with the stacking bit
    /// set, every errored port gets a stack-overflow attempt until one
    /// resolves, and the loop stops consulting ports after the first
    /// success. Whether multi-attempt recovery is intentional upstream is
    /// an open question; this test documents the behavior as-is.
    #[test]
    fn secondary_mpu_ports_after_first_resolution_are_not_consulted() {
        let mut regs = MockFaultRegisters::new();
        regs.cfsr = cfsr::STKERR;
        regs.icsr = icsr::RETTOBASE;
        let mut config = FaultConfig::mainline();
        config.mpu_stack_guard = true;
        let mut mpu = MockSecondaryMpu::with_ports(4);
        mpu.latch(0, MpuPortError { address: 0x7000_0000, detail: 0x1 });
        mpu.latch(1, MpuPortError { address: 0x2000_0040, detail: 0x2 });
        mpu.latch(3, MpuPortError { address: 0x2000_0080, detail: 0x3 });

        // Only the second port's address is inside the guard region.
        let resolver = |addr: Option<usize>, _sp: usize| -> Option<usize> {
            (addr == Some(0x2000_0040)).then_some(SAFE_SP)
        };
        let mut c = ClassifierCtx {
            regs: &mut regs,
            config: &config,
            resolver: &resolver,
            table: &[],
            secondary_mpu: Some(&mut mpu),
        };
        let (reason, _) = bus_fault(&mut c, ESF_ADDR, &mut frame(), false);
        assert_eq!(reason, FaultReason::StackCheckFail);
        // Port 0 was attempted (and failed), port 1 resolved, port 3 was
        // never consulted.
        assert_eq!(mpu.consulted.as_slice(), &[0, 1]);
        // All latches captured up front are still cleared.
        assert_eq!(mpu.clears.as_slice(), &[0b1011]);
        // Exactly one PSP fixup despite two candidate ports.
        assert_eq!(regs.psp_writes.as_slice(), &[SAFE_SP]);
    }

    #[test]
    fn probe_region_bus_fault_is_recoverable() {
        let mut regs = MockFaultRegisters::new();
        regs.cfsr = cfsr::PRECISERR;
        let config = FaultConfig::mainline();
        let table = [crate::recoverable::RecoverableRegion {
            start: 0x0800_0100,
            end: 0x0800_0110,
            fixup: 0x0800_0200,
        }];
        let resolver = no_overflow;
        let mut c = ClassifierCtx {
            regs: &mut regs,
            config: &config,
            resolver: &resolver,
            table: &table,
            secondary_mpu: None,
        };
        let mut esf = BasicFrame { pc: 0x0800_0104, ..BasicFrame::default() };
        let (_, recoverable) = bus_fault(&mut c, ESF_ADDR, &mut esf, false);
        assert!(recoverable);
        assert_eq!(esf.pc, 0x0800_0200);
    }
}
