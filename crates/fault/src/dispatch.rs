//! Top-level fault dispatch
//!
//! One [`FaultDispatcher::handle`] call per fault occurrence:
//!
//! ```text
//! Dispatched → Located → Classified → Recoverable → Resumed
//!                                   ↘ Unrecoverable → ContextBuilt → HandedOff
//! ```
//!
//! The dispatcher never loops or retries; it either returns (and the
//! trampoline performs the exception return) or invokes the fatal-error
//! collaborator exactly once.

use crate::classify::{classify_vector, ClassifierCtx};
use crate::config::FaultConfig;
use crate::fault_log;
use crate::frame::{BasicFrame, CalleeRegs, ExceptionStackFrame, ExtraInfo};
use crate::locate::locate;
use crate::reason::FaultReason;
use crate::recoverable::RecoverableRegion;
use crate::registers::{icsr, FaultRegisters, SecondaryMpu};
use crate::stack::StackOverflowResolver;

/// Terminal state of one fault dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Outcome {
    /// The fault was a registered expected fault; the stacked PC has been
    /// rewritten and execution resumes at the fixup.
    Resumed,
    /// The fatal-error collaborator was invoked with this reason.
    HandedOff(FaultReason),
}

/// The RTOS fatal-error policy (reboot, halt, thread abort — not this
/// subsystem's concern).
///
/// Invoked at most once per fault occurrence, and never when the dispatch
/// resolved as recoverable.
pub trait FatalHandler {
    /// Consume one classified, unrecoverable fault.
    fn fatal_error(&mut self, reason: FaultReason, esf: &ExceptionStackFrame);
}

/// Transient per-dispatch record; created at entry, dropped when the
/// dispatch returns or hands off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultContext {
    /// Active exception number (ICSR.VECTACTIVE).
    pub vector: u32,
    /// The fault interrupted another exception.
    pub nested: bool,
    /// The dispatch resolved as recoverable.
    pub recoverable: bool,
    /// Classification outcome.
    pub reason: FaultReason,
    /// Owned copy of the fault context for the hand-off.
    pub esf: ExceptionStackFrame,
}

/// Composes frame location, classification and the recovery decision.
pub struct FaultDispatcher<'a, R: FaultRegisters> {
    regs: &'a mut R,
    config: FaultConfig,
    resolver: &'a dyn StackOverflowResolver,
    table: &'a [RecoverableRegion],
    secondary_mpu: Option<&'a mut dyn SecondaryMpu>,
    fatal: &'a mut dyn FatalHandler,
}

impl<'a, R: FaultRegisters> FaultDispatcher<'a, R> {
    /// Assemble a dispatcher over the given collaborators.
    pub fn new(
        regs: &'a mut R,
        config: FaultConfig,
        resolver: &'a dyn StackOverflowResolver,
        table: &'a [RecoverableRegion],
        fatal: &'a mut dyn FatalHandler,
    ) -> Self {
        Self {
            regs,
            config,
            resolver,
            table,
            secondary_mpu: None,
            fatal,
        }
    }

    /// Attach a vendor secondary MPU to be polled on BusFaults.
    #[must_use]
    pub fn with_secondary_mpu(mut self, mpu: &'a mut dyn SecondaryMpu) -> Self {
        self.secondary_mpu = Some(mpu);
        self
    }

    /// Handle one fault, as entered from the exception trampoline.
    ///
    /// `msp`/`psp` are this image's stack pointers captured at handler
    /// entry, `exc_return` the LR value hardware loaded, `callee` the
    /// trampoline-saved callee registers when available.
    pub fn handle(
        &mut self,
        msp: usize,
        psp: usize,
        exc_return: u32,
        callee: Option<&CalleeRegs>,
    ) -> Outcome {
        // Re-enable interrupts unconditionally: a higher-priority fault
        // must be able to tail-chain into this classification.
        self.regs.unlock_interrupts();

        let vector = self.regs.icsr() & icsr::VECTACTIVE_MASK;

        let (esf_addr, nested) = match locate(msp, psp, exc_return, &self.config, self.regs) {
            Ok(located) => located,
            Err(err) => {
                // The stacked context cannot be trusted; hand off a
                // zeroed frame with the raw entry values preserved.
                fault_log!("Could not locate the exception stack frame: {}", err);
                let context = FaultContext {
                    vector,
                    nested: false,
                    recoverable: false,
                    reason: FaultReason::CpuException,
                    esf: ExceptionStackFrame {
                        basic: BasicFrame::default(),
                        extra: ExtraInfo {
                            callee: callee.copied(),
                            exc_return,
                            msp,
                        },
                    },
                };
                self.fatal.fatal_error(context.reason, &context.esf);
                return Outcome::HandedOff(context.reason);
            }
        };

        // SAFETY: locate() validated EXC_RETURN consistency and rejected a
        // null address; the address points at the hardware-stacked 8-word
        // block, valid (and exclusively ours to mutate) for the duration
        // of this exception.
        let esf = unsafe { &mut *(esf_addr as *mut BasicFrame) };

        let (reason, recoverable) = {
            let mut ctx = ClassifierCtx {
                regs: &mut *self.regs,
                config: &self.config,
                resolver: self.resolver,
                table: self.table,
                secondary_mpu: self.secondary_mpu.as_deref_mut(),
            };
            classify_vector(&mut ctx, vector, esf_addr, esf)
        };

        if recoverable {
            return Outcome::Resumed;
        }

        // Copy the frame out of stack memory before hand-off: a repaired
        // stack pointer may have made the original unreachable.
        let mut context = FaultContext {
            vector,
            nested,
            recoverable,
            reason,
            esf: ExceptionStackFrame {
                basic: *esf,
                extra: ExtraInfo {
                    callee: callee.copied(),
                    exc_return,
                    msp,
                },
            },
        };
        if self.config.simplified_reasons && context.reason.is_arch_specific() {
            context.reason = FaultReason::CpuException;
        }
        fault_log!(
            "Faulting instruction address (pc): {=u32:#x}",
            context.esf.basic.pc
        );
        self.fatal.fatal_error(context.reason, &context.esf);
        Outcome::HandedOff(context.reason)
    }
}
