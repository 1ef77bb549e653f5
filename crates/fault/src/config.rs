//! Build-time capability configuration
//!
//! The original decision tables vary along a handful of axes: core
//! architecture generation, TrustZone security state, FP lazy stacking,
//! stack-guard flavour, user-mode support, and debug-based null-pointer
//! detection. Instead of scattering conditional compilation through the
//! control flow, the integrator selects one [`FaultConfig`] at bring-up and
//! threads it through the pipeline; every classifier branches on explicit
//! capability fields.

/// Core architecture generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Arch {
    /// ARMv6-M class (Cortex-M0/M0+/M1): HardFault is the only fault
    /// vector and there are no fault status registers.
    Baseline,
    /// ARMv7-M / ARMv8-M mainline: configurable fault exceptions with
    /// CFSR/HFSR/MMFAR/BFAR.
    Mainline,
}

/// TrustZone security configuration of this image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SecurityState {
    /// Secure image on a core with the security extension.
    Secure,
    /// Non-secure image on a core with the security extension.
    NonSecure,
    /// No security extension, or it is not in use.
    Single,
}

/// Capability set threaded through frame location and classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultConfig {
    /// Core architecture generation.
    pub arch: Arch,
    /// TrustZone security configuration.
    pub security: SecurityState,
    /// Lazy floating-point state preservation is enabled (MLSPERR/LSPERR
    /// become reachable).
    pub fp_lazy_state: bool,
    /// ARMv8-M built-in stack limit checking (PSPLIM/MSPLIM) is in use.
    pub builtin_stack_guard: bool,
    /// An MPU guard region protects thread stacks.
    pub mpu_stack_guard: bool,
    /// User-mode (unprivileged thread) memory protection is in use.
    pub userspace: bool,
    /// Null-pointer dereference detection via a DWT watchpoint is armed;
    /// routes through the DebugMonitor vector.
    pub null_pointer_dwt: bool,
    /// Collapse architecture-specific reason codes to
    /// [`FaultReason::CpuException`](crate::FaultReason::CpuException)
    /// before the fatal hand-off.
    pub simplified_reasons: bool,
}

impl FaultConfig {
    /// Mainline single-security-state core with no optional feature
    /// enabled — the baseline most boards start from.
    #[must_use]
    pub const fn mainline() -> Self {
        Self {
            arch: Arch::Mainline,
            security: SecurityState::Single,
            fp_lazy_state: false,
            builtin_stack_guard: false,
            mpu_stack_guard: false,
            userspace: false,
            null_pointer_dwt: false,
            simplified_reasons: false,
        }
    }

    /// ARMv6-M class core.
    #[must_use]
    pub const fn baseline() -> Self {
        Self {
            arch: Arch::Baseline,
            ..Self::mainline()
        }
    }

    /// Whether any stack-corruption assessment support is configured.
    ///
    /// A stacking fault on a build where this is `false` has no legitimate
    /// cause and is treated as a programming error.
    #[must_use]
    pub const fn stack_guard_support(&self) -> bool {
        self.mpu_stack_guard || self.userspace
    }
}
