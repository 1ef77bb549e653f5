//! Stable fault-reason enumeration
//!
//! [`FaultReason`] is the single output of every fault dispatch. The integer
//! values form the ABI consumed by the fatal-error policy collaborator (and
//! by coredump tooling that post-processes its output), so the set is closed,
//! contiguous, and append-only: new reasons may be added at the end, existing
//! values must never be renumbered.
//!
//! Values 0–4 are the generic kernel codes shared with the rest of the RTOS;
//! everything from [`FaultReason::MemGeneric`] up is Cortex-M specific and
//! can be collapsed back to [`FaultReason::CpuException`] by integrators that
//! pin their ABI to the generic set (see
//! [`FaultConfig::simplified_reasons`](crate::config::FaultConfig)).

/// Root-cause classification of one fault occurrence.
///
/// Exactly one value is produced per dispatch. The discriminants are a
/// stable, contiguous ABI — do not reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum FaultReason {
    /// Generic CPU exception; also the code for every internal
    /// inconsistency in the fault machinery itself (untrustworthy frame,
    /// invalid EXC_RETURN, escalation with no status bits).
    CpuException = 0,
    /// Interrupt with no registered handler. Raised by the interrupt
    /// subsystem, never by this pipeline; reserved here to keep the
    /// numbering contiguous.
    SpuriousIrq = 1,
    /// Thread stack overflow or corruption, detected either by guard-region
    /// analysis or by the ARMv8-M built-in stack-limit check.
    StackCheckFail = 2,
    /// Application-raised recoverable-by-policy exception (`oops`).
    KernelOops = 3,
    /// Application-raised unconditional panic.
    KernelPanic = 4,

    /// MemManage fault with no more specific cause bit set.
    MemGeneric = 5,
    /// MemManage fault while stacking the exception frame.
    MemStacking = 6,
    /// MemManage fault while unstacking on exception return.
    MemUnstacking = 7,
    /// Data access violation (MMFAR may hold the offending address).
    MemDataAccess = 8,
    /// Instruction access violation.
    MemInstructionAccess = 9,
    /// MemManage fault during lazy floating-point state preservation.
    MemFpLazyState = 10,

    /// BusFault with no more specific cause bit set.
    BusGeneric = 11,
    /// BusFault while stacking the exception frame.
    BusStacking = 12,
    /// BusFault while unstacking on exception return.
    BusUnstacking = 13,
    /// Precise data bus error (BFAR may hold the offending address).
    BusPreciseData = 14,
    /// Imprecise data bus error; the faulting instruction has retired.
    BusImpreciseData = 15,
    /// Instruction bus error on fetch.
    BusInstruction = 16,
    /// BusFault during lazy floating-point state preservation.
    BusFpLazyState = 17,

    /// UsageFault with no more specific cause bit set.
    UsageGeneric = 18,
    /// Integer division by zero (requires the DIV_0_TRP enable).
    UsageDivByZero = 19,
    /// Unaligned memory access (requires the UNALIGN_TRP enable).
    UsageUnaligned = 20,
    /// ARMv8-M stack-limit violation reported through UFSR when no built-in
    /// stack-guard support is configured.
    UsageStackOverflow = 21,
    /// Access to a missing or disabled coprocessor.
    UsageNoCoprocessor = 22,
    /// Illegal EXC_RETURN value loaded to PC.
    UsageIllegalExcReturn = 23,
    /// Illegal use of the EPSR (e.g. executing with the Thumb bit clear).
    UsageIllegalEpsr = 24,
    /// Undefined instruction.
    UsageUndefinedInstruction = 25,

    /// SecureFault with no more specific cause bit set.
    SecureGeneric = 26,
    /// Non-secure code jumped to an invalid secure entry point.
    SecureEntryPoint = 27,
    /// Invalid integrity signature in an exception stack frame.
    SecureIntegritySignature = 28,
    /// Invalid exception return crossing security states.
    SecureExceptionReturn = 29,
    /// Attribution-unit violation (SFAR may hold the offending address).
    SecureAttributionUnit = 30,
    /// Invalid transition between security states.
    SecureTransition = 31,
    /// SecureFault during lazy state preservation.
    SecureLazyStatePreservation = 32,
    /// Lazy state error flag.
    SecureLazyStateError = 33,
}

/// First architecture-specific discriminant; everything below is a generic
/// kernel code shared across architectures.
const ARCH_SPECIFIC_START: u32 = FaultReason::MemGeneric as u32;

impl FaultReason {
    /// Converts a reason to its stable ABI value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Converts a stable ABI value back into a reason.
    ///
    /// Returns `None` for values outside the documented set — callers
    /// decoding an application-supplied value (the SVC-raised exception
    /// path) must not trust arbitrary register contents.
    #[must_use]
    pub const fn from_u32(value: u32) -> Option<Self> {
        Some(match value {
            0 => Self::CpuException,
            1 => Self::SpuriousIrq,
            2 => Self::StackCheckFail,
            3 => Self::KernelOops,
            4 => Self::KernelPanic,
            5 => Self::MemGeneric,
            6 => Self::MemStacking,
            7 => Self::MemUnstacking,
            8 => Self::MemDataAccess,
            9 => Self::MemInstructionAccess,
            10 => Self::MemFpLazyState,
            11 => Self::BusGeneric,
            12 => Self::BusStacking,
            13 => Self::BusUnstacking,
            14 => Self::BusPreciseData,
            15 => Self::BusImpreciseData,
            16 => Self::BusInstruction,
            17 => Self::BusFpLazyState,
            18 => Self::UsageGeneric,
            19 => Self::UsageDivByZero,
            20 => Self::UsageUnaligned,
            21 => Self::UsageStackOverflow,
            22 => Self::UsageNoCoprocessor,
            23 => Self::UsageIllegalExcReturn,
            24 => Self::UsageIllegalEpsr,
            25 => Self::UsageUndefinedInstruction,
            26 => Self::SecureGeneric,
            27 => Self::SecureEntryPoint,
            28 => Self::SecureIntegritySignature,
            29 => Self::SecureExceptionReturn,
            30 => Self::SecureAttributionUnit,
            31 => Self::SecureTransition,
            32 => Self::SecureLazyStatePreservation,
            33 => Self::SecureLazyStateError,
            _ => return None,
        })
    }

    /// `true` for the Cortex-M specific codes that
    /// [`FaultConfig::simplified_reasons`](crate::config::FaultConfig)
    /// collapses to [`FaultReason::CpuException`] before hand-off.
    #[must_use]
    pub const fn is_arch_specific(self) -> bool {
        self.as_u32() >= ARCH_SPECIFIC_START
    }

    /// Human-readable description for diagnostic output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CpuException => "Generic CPU exception",
            Self::SpuriousIrq => "Spurious interrupt",
            Self::StackCheckFail => "Stack overflow",
            Self::KernelOops => "Kernel oops",
            Self::KernelPanic => "Kernel panic",
            Self::MemGeneric => "MemManage fault",
            Self::MemStacking => "MemManage stacking error",
            Self::MemUnstacking => "MemManage unstacking error",
            Self::MemDataAccess => "Data access violation",
            Self::MemInstructionAccess => "Instruction access violation",
            Self::MemFpLazyState => "MemManage lazy FP state preservation error",
            Self::BusGeneric => "Bus fault",
            Self::BusStacking => "Bus stacking error",
            Self::BusUnstacking => "Bus unstacking error",
            Self::BusPreciseData => "Precise data bus error",
            Self::BusImpreciseData => "Imprecise data bus error",
            Self::BusInstruction => "Instruction bus error",
            Self::BusFpLazyState => "Bus lazy FP state preservation error",
            Self::UsageGeneric => "Usage fault",
            Self::UsageDivByZero => "Division by zero",
            Self::UsageUnaligned => "Unaligned memory access",
            Self::UsageStackOverflow => "Stack limit violation",
            Self::UsageNoCoprocessor => "No coprocessor",
            Self::UsageIllegalExcReturn => "Illegal EXC_RETURN load to PC",
            Self::UsageIllegalEpsr => "Illegal EPSR use",
            Self::UsageUndefinedInstruction => "Undefined instruction",
            Self::SecureGeneric => "Secure fault",
            Self::SecureEntryPoint => "Invalid secure entry point",
            Self::SecureIntegritySignature => "Invalid integrity signature",
            Self::SecureExceptionReturn => "Invalid exception return",
            Self::SecureAttributionUnit => "Attribution unit violation",
            Self::SecureTransition => "Invalid security state transition",
            Self::SecureLazyStatePreservation => "Secure lazy state preservation error",
            Self::SecureLazyStateError => "Secure lazy state error",
        }
    }
}

/// Exception vector name for diagnostic output (IPSR/VECTACTIVE value).
#[must_use]
pub const fn vector_name(vector: u32) -> &'static str {
    match vector {
        0 => "Thread Mode",
        1 | 8..=10 | 13 => "Reserved",
        2 => "NMI",
        3 => "HardFault",
        4 => "MemManage",
        5 => "BusFault",
        6 => "UsageFault",
        7 => "SecureFault",
        11 => "SVCall",
        12 => "DebugMonitor",
        14 => "PendSV",
        15 => "SysTick",
        _ => "IRQn",
    }
}
