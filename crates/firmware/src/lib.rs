//! Cortex-M hardware binding for the fault subsystem
//!
//! Everything the `fault` crate abstracts away lives here: the MMIO
//! implementation of its register view, the assembly exception-entry
//! trampoline, the one-shot routine that enables the configurable fault
//! exceptions, and the default fatal-error policy (defmt dump + halt).
//!
//! # Architecture Layers
//!
//! ```text
//! Vector table (cortex-m-rt)
//!         ↓
//! handlers — asm trampoline, captures (msp, psp, EXC_RETURN, callee regs)
//!         ↓
//! fault::FaultDispatcher over scb::ScbFaultRegisters
//!         ↓
//! fatal::DefaultFatalPolicy (defmt dump, never returns)
//! ```
//!
//! # Features
//!
//! - `hardware` — build for a Cortex-M target (cortex-m, cortex-m-rt,
//!   defmt/RTT, panic-probe). Without it only the pure, host-testable
//!   pieces compile (register-mask computation, vector bookkeeping).

#![cfg_attr(not(test), no_std)]
// Pedantic cast lints are noise here: all register values are u32 and all
// addresses widen losslessly on both the target and the test host.
#![allow(clippy::cast_possible_truncation)]

// Link-time dependencies: the vector table (whose fault entries our
// trampoline symbols override), the RTT transport for defmt, and the
// panic-probe panic handler.
#[cfg(feature = "hardware")]
use cortex_m_rt as _;
#[cfg(feature = "hardware")]
use defmt_rtt as _;
#[cfg(feature = "hardware")]
use panic_probe as _;

pub mod handlers;
pub mod init;

#[cfg(feature = "hardware")]
pub mod fatal;
#[cfg(feature = "hardware")]
pub mod scb;
