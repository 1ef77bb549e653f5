//! One-shot fault exception enablement
//!
//! Bring-up order (MUST be respected):
//!   1. [`crate::fatal::install`] — publish config, resolver and the
//!      recoverable-fault regions
//!   2. [`init`] — enable the configurable fault exceptions and traps
//!
//! Enabling the vectors before install would let an early fault reach the
//! trampoline with no published configuration.
//!
//! All register *values* are computed by pure functions here (fully
//! host-testable); only the `apply` step touches hardware.
//!
//! # SHCSR / CCR bit layout (ARMv7-M ARM §B3.2.13, §B3.2.8)
//!
//! ```text
//! SHCSR[16] MEMFAULTENA    — route MemManage to vector 4 (else escalate)
//! SHCSR[17] BUSFAULTENA    — route BusFault to vector 5
//! SHCSR[18] USGFAULTENA    — route UsageFault to vector 6
//! SHCSR[19] SECUREFAULTENA — route SecureFault to vector 7 (v8-M secure)
//! CCR[3]    UNALIGN_TRP    — trap unaligned accesses
//! CCR[4]    DIV_0_TRP      — trap divide by zero
//! ```

use fault::{Arch, FaultConfig, SecurityState};

/// SHCSR: MemManage fault enable.
pub const SHCSR_MEMFAULTENA: u32 = 1 << 16;
/// SHCSR: BusFault enable.
pub const SHCSR_BUSFAULTENA: u32 = 1 << 17;
/// SHCSR: UsageFault enable.
pub const SHCSR_USGFAULTENA: u32 = 1 << 18;
/// SHCSR: SecureFault enable (ARMv8-M security extension).
pub const SHCSR_SECUREFAULTENA: u32 = 1 << 19;

/// CCR: trap unaligned word/halfword accesses.
pub const CCR_UNALIGN_TRP: u32 = 1 << 3;
/// CCR: trap integer divide by zero.
pub const CCR_DIV_0_TRP: u32 = 1 << 4;

/// Compute the SHCSR enable bits for `config`.
///
/// Baseline cores have no configurable fault exceptions — everything
/// escalates to HardFault and the mask is empty.
#[must_use]
pub const fn shcsr_enable_mask(config: &FaultConfig) -> u32 {
    if matches!(config.arch, Arch::Baseline) {
        return 0;
    }
    let mut mask = SHCSR_MEMFAULTENA | SHCSR_BUSFAULTENA | SHCSR_USGFAULTENA;
    if matches!(config.security, SecurityState::Secure) {
        mask |= SHCSR_SECUREFAULTENA;
    }
    mask
}

/// Compute the CCR trap bits for `config`.
///
/// Divide-by-zero is always trapped on mainline cores (silent zero
/// results hide real bugs); the unaligned trap is the integrator's call
/// because compilers emit legitimate unaligned accesses for packed data.
#[must_use]
pub const fn ccr_trap_mask(config: &FaultConfig, trap_unaligned: bool) -> u32 {
    if matches!(config.arch, Arch::Baseline) {
        return 0;
    }
    let mut mask = CCR_DIV_0_TRP;
    if trap_unaligned {
        mask |= CCR_UNALIGN_TRP;
    }
    mask
}

/// Enable the configurable fault exceptions and traps. Run once from
/// privileged bring-up, after [`crate::fatal::install`].
#[cfg(feature = "hardware")]
pub fn init(config: &FaultConfig, trap_unaligned: bool) {
    const SHCSR: *mut u32 = 0xE000_ED24 as *mut u32;
    const CCR: *mut u32 = 0xE000_ED14 as *mut u32;

    // SAFETY: read-modify-write of architectural SCB registers from
    // privileged mode; barriers make the enables visible before the next
    // instruction can fault.
    unsafe {
        SHCSR.write_volatile(SHCSR.read_volatile() | shcsr_enable_mask(config));
        CCR.write_volatile(CCR.read_volatile() | ccr_trap_mask(config, trap_unaligned));
        cortex_m::asm::dsb();
        cortex_m::asm::isb();
    }
}
