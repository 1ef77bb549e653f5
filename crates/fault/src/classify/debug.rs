//! DebugMonitor classification
//!
//! Only interesting on builds that arm a DWT watchpoint over the first
//! page to catch null-pointer dereferences. Any other debug-monitor event
//! is recoverable by definition. Watchpoint hits are asynchronous — the
//! offending access has already retired — so the recoverable-table lookup
//! runs with the extended match window.

use crate::classify::ClassifierCtx;
use crate::fault_log;
use crate::frame::BasicFrame;
use crate::reason::FaultReason;
use crate::recoverable::apply_fixup;
use crate::registers::FaultRegisters;

/// Classify one DebugMonitor exception (vector 12).
pub(crate) fn debug_monitor<R: FaultRegisters>(
    ctx: &mut ClassifierCtx<'_, '_, R>,
    esf: &mut BasicFrame,
) -> (FaultReason, bool) {
    let reason = FaultReason::CpuException;

    fault_log!("***** DEBUG MONITOR EXCEPTION *****");

    if !ctx.config.null_pointer_dwt {
        return (reason, false);
    }
    if !ctx.regs.debug_event_is_error() {
        // Not the null-pointer watchpoint: an ordinary debug event,
        // recoverable by definition.
        return (reason, true);
    }
    fault_log!("  Null-pointer dereference detected");
    let recoverable = apply_fixup(ctx.table, esf, false);
    (reason, recoverable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::test_util::*;
    use crate::config::FaultConfig;
    use crate::mock::MockFaultRegisters;
    use crate::recoverable::RecoverableRegion;

    fn dwt_config() -> FaultConfig {
        let mut config = FaultConfig::mainline();
        config.null_pointer_dwt = true;
        config
    }

    #[test]
    fn without_dwt_support_events_are_fatal_generic() {
        let mut regs = MockFaultRegisters::new();
        regs.debug_event_error = true;
        let config = FaultConfig::mainline();
        let mut c = ctx(&mut regs, &config, &no_overflow);
        let (reason, recoverable) = debug_monitor(&mut c, &mut BasicFrame::default());
        assert_eq!(reason, FaultReason::CpuException);
        assert!(!recoverable);
    }

    #[test]
    fn non_error_events_are_recoverable() {
        let mut regs = MockFaultRegisters::new();
        regs.debug_event_error = false;
        let config = dwt_config();
        let mut c = ctx(&mut regs, &config, &no_overflow);
        let (_, recoverable) = debug_monitor(&mut c, &mut BasicFrame::default());
        assert!(recoverable);
    }

    #[test]
    fn null_pointer_hit_in_probe_region_uses_the_extended_window() {
        let mut regs = MockFaultRegisters::new();
        regs.debug_event_error = true;
        let config = dwt_config();
        let table = [RecoverableRegion {
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
        // One instruction past the range end: only the asynchronous
        // (extended) window matches.
        let mut esf = BasicFrame { pc: 0x0800_0110, ..BasicFrame::default() };
        let (_, recoverable) = debug_monitor(&mut c, &mut esf);
        assert!(recoverable);
        assert_eq!(esf.pc, 0x0800_0200);
    }

    #[test]
    fn null_pointer_hit_outside_probe_regions_is_fatal() {
        let mut regs = MockFaultRegisters::new();
        regs.debug_event_error = true;
        let config = dwt_config();
        let mut c = ctx(&mut regs, &config, &no_overflow);
        let mut esf = BasicFrame { pc: 0x0800_9000, ..BasicFrame::default() };
        let (reason, recoverable) = debug_monitor(&mut c, &mut esf);
        assert_eq!(reason, FaultReason::CpuException);
        assert!(!recoverable);
    }
}
