//! Cortex-M fault exception entry
//!
//! One assembly trampoline serves every fault vector. It captures the
//! values classification needs *before* touching the stack — the MSP as
//! hardware left it is the exception frame address for handler-mode
//! faults — then saves the callee registers hardware does not stack and
//! calls into the Rust dispatcher.
//!
//! The trampoline symbols override the `DefaultHandler` fallbacks that
//! `cortex-m-rt` PROVIDEs for the fault vectors, and its `HardFault`
//! symbol replaces the rt trampoline's target (LR still holds EXC_RETURN
//! there because the rt shim branches with `b`, never `bl`).
//!
//! On a recoverable outcome the dispatcher returns; the pop of the saved
//! EXC_RETURN into PC performs the exception return and execution resumes
//! at the fixup the dispatcher wrote into the stacked frame.
//!
//! # Hardware-only module
//!
//! The asm requires ARM target intrinsics and is gated behind
//! `#[cfg(feature = "hardware")]`. The module itself (and
//! [`FAULT_VECTORS_DEFINED`]) compiles unconditionally so host tests can
//! verify the module exists without an ARM toolchain.

/// Marker constant — confirmed by host tests to verify this module exists.
///
/// When `FAULT_VECTORS_DEFINED` is `true`, the `handlers` module compiled
/// successfully, proving the vector symbols (in `#[cfg(feature =
/// "hardware")]` below) will be linked into the firmware binary.
pub const FAULT_VECTORS_DEFINED: bool = true;

/// Exception vectors routed through the common fault trampoline.
///
/// SysTick, PendSV and SVCall keep their own handlers elsewhere; NMI is
/// deliberately not captured (it must never be blocked on classification).
pub const TRAMPOLINE_VECTORS: &[&str] = &[
    "HardFault",
    "MemoryManagement",
    "BusFault",
    "UsageFault",
    "SecureFault",
    "DebugMonitor",
];

#[cfg(all(feature = "hardware", target_arch = "arm", target_os = "none"))]
core::arch::global_asm!(
    "
    .section .text.fault_exception_entry, \"ax\"
    .global MemoryManagement
    .global BusFault
    .global UsageFault
    .global SecureFault
    .global DebugMonitor
    .global HardFault
    .thumb_func
  MemoryManagement:
    .thumb_func
  BusFault:
    .thumb_func
  UsageFault:
    .thumb_func
  SecureFault:
    .thumb_func
  DebugMonitor:
    .thumb_func
  HardFault:
    // Capture the stack pointers before this handler pushes anything:
    // for handler-mode faults the un-modified MSP *is* the frame address.
    mrs r0, msp                       // r0 = MSP at entry
    mrs r1, psp                       // r1 = PSP at entry
    mov r2, lr                        // r2 = EXC_RETURN
    mrs r12, psp                      // r12 = PSP, saved into the callee block

    // Save the registers hardware does not stack, plus the PSP and the
    // EXC_RETURN. 10 words keeps the stack 8-byte aligned for the AAPCS
    // call below.
    push {{r4-r12, lr}}               // callee block: r4..r11, psp, exc_return
    mov r3, sp                        // r3 = &callee block

    bl {dispatch}

    // Only reachable when the dispatch resolved as recoverable: restore
    // the callee registers and load the saved EXC_RETURN into PC, which
    // performs the exception return to the (possibly fixed-up) context.
    pop {{r4-r12, pc}}
    ",
    dispatch = sym fault_dispatch_entry,
);

/// Rust side of the trampoline. `extern "C"` per the register/argument
/// mapping set up in the asm above.
#[cfg(all(feature = "hardware", target_arch = "arm", target_os = "none"))]
unsafe extern "C" fn fault_dispatch_entry(
    msp: u32,
    psp: u32,
    exc_return: u32,
    callee: *const fault::CalleeRegs,
) {
    // SAFETY: the trampoline just pushed the callee block at this address;
    // it stays live until the pop after this call returns.
    let callee = unsafe { callee.as_ref() };
    crate::fatal::dispatch(msp as usize, psp as usize, exc_return, callee);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_handlers_module_compiles() {
        assert!(FAULT_VECTORS_DEFINED);
    }

    #[test]
    fn all_fault_vectors_are_routed() {
        for vector in ["HardFault", "MemoryManagement", "BusFault", "UsageFault"] {
            assert!(
                TRAMPOLINE_VECTORS.contains(&vector),
                "{vector} must be routed through the fault trampoline"
            );
        }
        assert!(!TRAMPOLINE_VECTORS.contains(&"NMI"));
    }
}
