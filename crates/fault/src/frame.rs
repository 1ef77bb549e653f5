//! Exception stack frame types
//!
//! The processor pushes a [`BasicFrame`] at exception entry; the trampoline
//! additionally saves the callee registers the hardware does not stack.
//! Classification only ever *borrows* the in-memory frame — it lives on a
//! thread or exception stack that may stop being valid the moment a
//! corrupted stack pointer is repaired — and the dispatcher copies it into
//! an [`ExceptionStackFrame`] before the fatal hand-off.

/// The 8-word register block pushed by hardware at exception entry.
///
/// Field order is the architectural stacking order; this struct is read
/// directly out of stack memory, so the layout must stay exact.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BasicFrame {
    /// Argument/scratch register r0. Carries the application-supplied
    /// reason code on SVC-raised exceptions.
    pub r0: u32,
    /// Argument/scratch register r1.
    pub r1: u32,
    /// Argument/scratch register r2.
    pub r2: u32,
    /// Argument/scratch register r3.
    pub r3: u32,
    /// Intra-procedure scratch register r12.
    pub r12: u32,
    /// Link register of the interrupted context.
    pub lr: u32,
    /// Return address: the faulting (or next) instruction.
    pub pc: u32,
    /// Program status register of the interrupted context.
    pub xpsr: u32,
}

/// Callee-saved registers captured by the trampoline (hardware does not
/// stack these).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalleeRegs {
    /// r4
    pub r4: u32,
    /// r5
    pub r5: u32,
    /// r6
    pub r6: u32,
    /// r7
    pub r7: u32,
    /// r8
    pub r8: u32,
    /// r9
    pub r9: u32,
    /// r10
    pub r10: u32,
    /// r11
    pub r11: u32,
    /// Process stack pointer at the time of the fault.
    pub psp: u32,
}

/// Context beyond the basic frame, captured for the fatal dump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExtraInfo {
    /// Copy of the callee-saved block, when the trampoline provided one.
    pub callee: Option<CalleeRegs>,
    /// Raw EXC_RETURN value of this exception.
    pub exc_return: u32,
    /// Main stack pointer at dispatch entry.
    pub msp: usize,
}

/// Owned copy of the complete fault context handed to the fatal-error
/// collaborator.
///
/// Copied out of stack memory by the dispatcher because the original frame
/// may become unreachable once a corrupted stack pointer has been repaired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExceptionStackFrame {
    /// The hardware-stacked register block.
    pub basic: BasicFrame,
    /// Software-captured context beyond the basic frame.
    pub extra: ExtraInfo,
}
