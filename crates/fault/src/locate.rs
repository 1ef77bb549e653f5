//! Exception stack frame location
//!
//! Given the stack pointers and EXC_RETURN captured by the trampoline, work
//! out where the hardware actually pushed the frame to classify. The answer
//! depends on the security configuration: on a TrustZone part the banked
//! MSP/PSP visible to the handler can point at a cross-domain "bridge"
//! frame rather than the interrupted context's frame.
//!
//! Every inconsistency here is fatal, never recoverable — if the frame
//! cannot be trusted, neither can anything classification would read from
//! it.

use thiserror_no_std::Error;

use crate::config::{FaultConfig, SecurityState};
use crate::exc_return::{ExcReturnError, ExcReturnFields};
use crate::registers::FaultRegisters;

/// The stacked context cannot be located or trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LocateError {
    /// EXC_RETURN failed to decode.
    #[error("invalid EXC_RETURN: {0}")]
    InvalidExcReturn(#[from] ExcReturnError),
    /// A secure image took a non-secure exception, or a non-secure image
    /// took a secure one.
    #[error("exception security state does not match this image")]
    SecurityStateMismatch,
    /// Thread-mode EXC_RETURN with the main stack selected — hardware
    /// state this kernel never produces.
    #[error("thread-mode EXC_RETURN with SPSEL indicating the main stack")]
    SpselMismatch,
    /// The selected stack pointer reads as null.
    #[error("located frame address is null")]
    NullFrame,
}

/// Locate the exception stack frame.
///
/// Returns the frame address and whether the fault interrupted another
/// exception (`nested`). `msp`/`psp` are this image's banked stack pointers
/// as captured at handler entry.
///
/// # Errors
///
/// Any [`LocateError`]; the caller must treat all of them as fatal internal
/// inconsistencies.
pub fn locate<R: FaultRegisters>(
    msp: usize,
    psp: usize,
    exc_return: u32,
    config: &FaultConfig,
    regs: &R,
) -> Result<(usize, bool), LocateError> {
    let fields = ExcReturnFields::decode(exc_return)?;
    let mut nested = false;
    let mut frame: Option<usize> = None;

    match config.security {
        SecurityState::Secure => {
            // A secure image must only ever fault on secure exceptions.
            if !fields.secure_exception {
                return Err(LocateError::SecurityStateMismatch);
            }
            if !fields.secure_return_stack {
                // Exception entry from non-secure code: the secure MSP/PSP
                // point at the bridge frame pushed on this side of the
                // boundary, not at the interrupted context. The real frame
                // is on the non-secure bank.
                if fields.process_stack {
                    frame = Some(regs.psp_ns());
                } else {
                    nested = true;
                    frame = Some(regs.msp_ns());
                }
            }
        }
        SecurityState::NonSecure => {
            // A non-secure image must only ever fault on non-secure
            // exceptions.
            if fields.secure_exception {
                return Err(LocateError::SecurityStateMismatch);
            }
            if fields.secure_return_stack {
                // The fault hit while secure code was running on behalf of
                // a non-secure caller. The secure frame is not reachable
                // from here; the nearest observable context is this bank's
                // own stack (diagnostic bridge case, not a nesting level).
                frame = Some(if fields.process_stack { psp } else { msp });
            }
        }
        SecurityState::Single => {
            // Thread mode always runs on the process stack in this kernel;
            // anything else means the hardware state is not trustworthy.
            if fields.thread_mode && !fields.process_stack {
                return Err(LocateError::SpselMismatch);
            }
        }
    }

    let frame = match frame {
        Some(addr) => addr,
        None => {
            // Same-security-state entry, common to all builds.
            if fields.thread_mode {
                psp
            } else {
                nested = true;
                msp
            }
        }
    };

    if frame == 0 {
        return Err(LocateError::NullFrame);
    }
    Ok((frame, nested))
}
