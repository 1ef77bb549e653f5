//! MMIO implementation of the fault register view
//!
//! Direct volatile access to the System Control Block and the secure fault
//! registers, one access per trait call so the pipeline's documented read
//! orderings hold at the hardware level.
//!
//! # Register addresses (ARMv7-M ARM §B3.2, ARMv8-M ARM §D1.2)
//!
//! | Register | Address       | Notes                                   |
//! |----------|---------------|-----------------------------------------|
//! | ICSR     | `0xE000_ED04` | VECTACTIVE, RETTOBASE                   |
//! | CCR      | `0xE000_ED14` | BFHFNMIGN lives here                    |
//! | SHCSR    | `0xE000_ED24` | fault-enable bits (see `init`)          |
//! | CFSR     | `0xE000_ED28` | MMFSR / BFSR / UFSR, W1C                |
//! | HFSR     | `0xE000_ED2C` | escalation cause                        |
//! | DFSR     | `0xE000_ED30` | debug event cause                       |
//! | MMFAR    | `0xE000_ED34` | valid only while MMARVALID holds        |
//! | BFAR     | `0xE000_ED38` | valid only while BFARVALID holds        |
//! | SFSR     | `0xE000_EDE4` | security extension only, W1C            |
//! | SFAR     | `0xE000_EDE8` | security extension only                 |

use fault::FaultRegisters;

const ICSR: *mut u32 = 0xE000_ED04 as *mut u32;
const CCR: *mut u32 = 0xE000_ED14 as *mut u32;
const CFSR: *mut u32 = 0xE000_ED28 as *mut u32;
const HFSR: *mut u32 = 0xE000_ED2C as *mut u32;
const DFSR: *mut u32 = 0xE000_ED30 as *mut u32;
const MMFAR: *mut u32 = 0xE000_ED34 as *mut u32;
const BFAR: *mut u32 = 0xE000_ED38 as *mut u32;
const SFSR: *mut u32 = 0xE000_EDE4 as *mut u32;
const SFAR: *mut u32 = 0xE000_EDE8 as *mut u32;

/// CCR: ignore bus faults and precise data faults in HardFault/NMI/FAULTMASK
/// handlers. Set only around the single-instruction probe window.
const CCR_BFHFNMIGN: u32 = 1 << 8;

/// DFSR: the debug event was a DWT watchpoint match.
const DFSR_DWTTRAP: u32 = 1 << 2;

/// Zero-sized handle over the SCB/SAU fault registers.
///
/// The registers are CPU-local and serialised by the processor; the
/// `&mut self` requirements of the trait model the sticky-bit side
/// effects, not a software lock.
pub struct ScbFaultRegisters;

impl FaultRegisters for ScbFaultRegisters {
    fn cfsr(&self) -> u32 {
        // SAFETY: architectural SCB register, always mapped, read has no
        // side effects.
        unsafe { CFSR.read_volatile() }
    }

    fn clear_cfsr(&mut self, mask: u32) {
        // SAFETY: CFSR is write-one-to-clear; writing `mask` clears
        // exactly the bits set in it.
        unsafe { CFSR.write_volatile(mask) }
    }

    fn hfsr(&self) -> u32 {
        // SAFETY: architectural SCB register read.
        unsafe { HFSR.read_volatile() }
    }

    fn mmfar(&self) -> u32 {
        // SAFETY: architectural SCB register read.
        unsafe { MMFAR.read_volatile() }
    }

    fn bfar(&self) -> u32 {
        // SAFETY: architectural SCB register read.
        unsafe { BFAR.read_volatile() }
    }

    fn sfsr(&self) -> u32 {
        // SAFETY: security-extension register; reads as RAZ from the
        // configurations that never route vector 7 here.
        unsafe { SFSR.read_volatile() }
    }

    fn clear_sfsr(&mut self, mask: u32) {
        // SAFETY: SFSR is write-one-to-clear.
        unsafe { SFSR.write_volatile(mask) }
    }

    fn sfar(&self) -> u32 {
        // SAFETY: security-extension register read.
        unsafe { SFAR.read_volatile() }
    }

    fn icsr(&self) -> u32 {
        // SAFETY: architectural SCB register read.
        unsafe { ICSR.read_volatile() }
    }

    #[cfg(feature = "trustzone")]
    fn psp_ns(&self) -> usize {
        let value: u32;
        // SAFETY: MRS of the non-secure banked PSP; executed only from
        // Secure state on cores with the security extension (the locator
        // reaches this solely on secure-image configurations).
        unsafe { core::arch::asm!("mrs {}, psp_ns", out(reg) value, options(nomem, nostack)) };
        value as usize
    }

    #[cfg(feature = "trustzone")]
    fn msp_ns(&self) -> usize {
        let value: u32;
        // SAFETY: MRS of the non-secure banked MSP; Secure state only, as
        // above.
        unsafe { core::arch::asm!("mrs {}, msp_ns", out(reg) value, options(nomem, nostack)) };
        value as usize
    }

    // Without the security extension the NS banks do not exist; a zero
    // answer is rejected by the locator as a null frame, so a
    // misconfigured secure image surfaces as an internal fatal instead of
    // dereferencing garbage.
    #[cfg(not(feature = "trustzone"))]
    fn psp_ns(&self) -> usize {
        0
    }

    #[cfg(not(feature = "trustzone"))]
    fn msp_ns(&self) -> usize {
        0
    }

    fn set_psp(&mut self, sp: usize) {
        // SAFETY: the caller (stack-overflow path) provides a pointer at
        // the guard boundary of the active thread's stack; writing PSP in
        // handler mode only takes effect on exception return.
        unsafe { cortex_m::register::psp::write(sp as u32) };
    }

    fn unlock_interrupts(&mut self) {
        // SAFETY: re-enabling interrupts inside the fault handler is the
        // documented re-entrancy contract of the dispatcher: a
        // higher-priority fault must be able to tail-chain in.
        unsafe { cortex_m::interrupt::enable() };
    }

    fn probe_insn(&mut self, addr: u32) -> u16 {
        // The stacked PC may itself be garbage; a probe through it must
        // not escalate into lockup. BFHFNMIGN turns the potential bus
        // fault into a read of zeros for exactly this window. Barriers on
        // both sides make the CCR change visible before and after the
        // single access.
        //
        // SAFETY: volatile accesses to an architectural register and one
        // 16-bit read that BFHFNMIGN makes side-effect free.
        unsafe {
            let ccr = CCR.read_volatile();
            CCR.write_volatile(ccr | CCR_BFHFNMIGN);
            cortex_m::asm::dsb();
            cortex_m::asm::isb();
            let insn = (addr as *const u16).read_volatile();
            CCR.write_volatile(ccr);
            cortex_m::asm::dsb();
            cortex_m::asm::isb();
            insn
        }
    }

    fn debug_event_is_error(&self) -> bool {
        // SAFETY: architectural DFSR read.
        let dfsr = unsafe { DFSR.read_volatile() };
        // The null-pointer detection comparator is the only watchpoint
        // this kernel arms; any DWT-sourced monitor event is an error.
        dfsr & DFSR_DWTTRAP != 0
    }
}
