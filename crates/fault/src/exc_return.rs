//! EXC_RETURN decode/encode
//!
//! At exception entry the processor loads a magic value into LR; writing it
//! back to PC performs the exception return. The value encodes where the
//! interrupted context lives and how much of it hardware stacked.
//!
//! # Bit layout (ARMv8-M ARM, §B3.19; positions identical on ARMv7-M where
//! the field exists)
//!
//! ```text
//! [31:24] prefix       — must read 0xFF or the value is not an EXC_RETURN
//! [6]     S (return stack) — 1 = secure stack was used for the frame
//! [5]     DCRS         — 1 = default callee-register stacking rules
//! [4]     FType        — 1 = standard (basic) frame, 0 = extended FP frame
//! [3]     Mode         — 1 = return to Thread mode, 0 = Handler mode
//! [2]     SPSEL        — 1 = frame on the process stack (PSP), 0 = MSP
//! [0]     ES           — 1 = the exception itself is targeted at Secure state
//! ```
//!
//! Bit 1 is reserved-zero; bits 23:7 are reserved-one on v8-M. The codec
//! canonicalises them on encode and ignores them on decode.

use thiserror_no_std::Error;

/// Indicator prefix occupying EXC_RETURN bits 31:24.
pub const EXC_RETURN_INDICATOR: u32 = 0xFF00_0000;

/// Reserved-one field, bits 23:7 (canonical encoding).
const RESERVED_ONES: u32 = 0x00FF_FF80;

const BIT_SECURE_EXCEPTION: u32 = 1 << 0;
const BIT_SPSEL_PROCESS: u32 = 1 << 2;
const BIT_MODE_THREAD: u32 = 1 << 3;
const BIT_STANDARD_FRAME: u32 = 1 << 4;
const BIT_DEFAULT_CALLEE: u32 = 1 << 5;
const BIT_SECURE_RETURN_STACK: u32 = 1 << 6;

/// A value that is not a legal EXC_RETURN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExcReturnError {
    /// Bits 31:24 did not read back as the fixed `0xFF` indicator.
    #[error("EXC_RETURN {raw:#010x} is missing the 0xFF indicator prefix")]
    InvalidPrefix {
        /// The offending raw value.
        raw: u32,
    },
}

/// Decoded EXC_RETURN fields.
///
/// Produced once per fault by [`ExcReturnFields::decode`]; plain bit
/// extractions, no side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExcReturnFields {
    /// The exception is targeted at Secure state (bit 0).
    pub secure_exception: bool,
    /// The interrupted context's frame is on the process stack (bit 2).
    pub process_stack: bool,
    /// Return is to Thread mode (bit 3); Handler mode when `false`.
    pub thread_mode: bool,
    /// Standard 8-word frame (bit 4); extended FP frame when `false`.
    pub standard_frame: bool,
    /// Default callee-register stacking rules apply (bit 5).
    pub default_callee_stacking: bool,
    /// The frame was pushed to the secure stack bank (bit 6).
    pub secure_return_stack: bool,
}

impl ExcReturnFields {
    /// Decode a raw EXC_RETURN value.
    ///
    /// # Errors
    ///
    /// [`ExcReturnError::InvalidPrefix`] when bits 31:24 are not `0xFF`.
    /// A trampoline handing over such a value means the fault machinery
    /// itself cannot be trusted; frame location fails fatally on it.
    pub const fn decode(raw: u32) -> Result<Self, ExcReturnError> {
        if raw & EXC_RETURN_INDICATOR != EXC_RETURN_INDICATOR {
            return Err(ExcReturnError::InvalidPrefix { raw });
        }
        Ok(Self {
            secure_exception: raw & BIT_SECURE_EXCEPTION != 0,
            process_stack: raw & BIT_SPSEL_PROCESS != 0,
            thread_mode: raw & BIT_MODE_THREAD != 0,
            standard_frame: raw & BIT_STANDARD_FRAME != 0,
            default_callee_stacking: raw & BIT_DEFAULT_CALLEE != 0,
            secure_return_stack: raw & BIT_SECURE_RETURN_STACK != 0,
        })
    }

    /// Encode back to the canonical 32-bit pattern (prefix `0xFF`,
    /// reserved bits 23:7 set, bit 1 clear).
    #[must_use]
    pub const fn encode(self) -> u32 {
        let mut raw = EXC_RETURN_INDICATOR | RESERVED_ONES;
        if self.secure_exception {
            raw |= BIT_SECURE_EXCEPTION;
        }
        if self.process_stack {
            raw |= BIT_SPSEL_PROCESS;
        }
        if self.thread_mode {
            raw |= BIT_MODE_THREAD;
        }
        if self.standard_frame {
            raw |= BIT_STANDARD_FRAME;
        }
        if self.default_callee_stacking {
            raw |= BIT_DEFAULT_CALLEE;
        }
        if self.secure_return_stack {
            raw |= BIT_SECURE_RETURN_STACK;
        }
        raw
    }
}
