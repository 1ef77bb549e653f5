//! CPU fault classification and recovery decision pipeline for Cortex-M
//!
//! When the processor raises a synchronous exception (MemManage, BusFault,
//! UsageFault, SecureFault, HardFault, DebugMonitor, or a reserved vector),
//! hardware pushes a partial register snapshot and enters the assembly
//! trampoline in the `firmware` crate. This crate is everything that happens
//! after that: locating the stacked frame, interrogating the fault status
//! registers, classifying the root cause into a single [`FaultReason`], and
//! deciding whether execution can resume or the fatal-error policy must be
//! invoked.
//!
//! # Architecture Layers
//!
//! ```text
//! Exception trampoline (firmware crate, asm)
//!         ↓
//! FaultDispatcher (dispatch module)
//!         ↓
//! FrameLocator → per-category classifiers → recoverable-fault table
//!         ↓
//! FatalHandler collaborator (RTOS fatal-error policy)
//! ```
//!
//! All hardware access goes through the [`FaultRegisters`] trait, so the
//! entire pipeline runs against [`MockFaultRegisters`] on the host — no ARM
//! toolchain or board needed for the decision-logic tests.
//!
//! # Features
//!
//! - `defmt` — classification breadcrumbs and `defmt::Format` derives on
//!   public types (enabled by the firmware crate's `hardware` feature)
//! - `std` — standard library support for host-side consumers
//!
//! # Re-entrancy
//!
//! The dispatcher force-unlocks interrupts at entry so a higher-priority
//! fault can tail-chain into classification. Every detail-register read
//! therefore follows a strict "read the raw register before checking its
//! valid bit" ordering — see [`FaultRegisters::mmfar_captured`].

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]

/// Classification breadcrumb, emitted at `error` level when the `defmt`
/// feature is enabled; compiles to nothing (arguments still type-checked
/// for use) on host builds.
#[cfg(feature = "defmt")]
macro_rules! fault_log {
    ($s:literal $(, $arg:expr)* $(,)?) => {
        defmt::error!($s $(, $arg)*)
    };
}
#[cfg(not(feature = "defmt"))]
macro_rules! fault_log {
    ($s:literal $(, $arg:expr)* $(,)?) => {{
        $( let _ = &$arg; )*
    }};
}
pub(crate) use fault_log;

pub mod classify;
pub mod config;
pub mod dispatch;
pub mod exc_return;
pub mod frame;
pub mod locate;
pub mod mock;
pub mod reason;
pub mod recoverable;
pub mod registers;
pub mod stack;

pub use config::{Arch, FaultConfig, SecurityState};
pub use dispatch::{FatalHandler, FaultContext, FaultDispatcher, Outcome};
pub use exc_return::{ExcReturnError, ExcReturnFields};
pub use frame::{BasicFrame, CalleeRegs, ExceptionStackFrame, ExtraInfo};
pub use locate::LocateError;
pub use mock::{MockFaultRegisters, MockSecondaryMpu};
pub use reason::{vector_name, FaultReason};
pub use recoverable::{RecoverableFaultTable, RecoverableRegion};
pub use registers::{FaultRegisters, MpuPortError, SecondaryMpu};
pub use stack::{GuardedStackResolver, StackOverflowResolver};
