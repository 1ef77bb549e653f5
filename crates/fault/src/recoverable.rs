//! Recoverable fault table
//!
//! Some code regions fault on purpose: user-pointer probing helpers touch
//! memory that may be unmapped and expect to be bounced to a fixup label
//! instead of killing the system. The kernel registers those regions here
//! once at init; classification consults the table after determining a
//! reason, and on a hit rewrites the stacked PC so the exception return
//! resumes at the fixup.

use heapless::Vec;

use crate::frame::BasicFrame;

/// Width of a Thumb instruction, used to extend the match window on
/// asynchronous classification paths.
const THUMB_INSN_BYTES: u32 = 2;

/// One registered expected-fault region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RecoverableRegion {
    /// First instruction of the faulting region (function-pointer value;
    /// the Thumb bit is masked during comparison).
    pub start: u32,
    /// Exclusive end of the region.
    pub end: u32,
    /// Address execution resumes at when a fault lands in the region.
    pub fixup: u32,
}

/// Bounded, init-time-populated registry of [`RecoverableRegion`]s.
///
/// Read-only after init and shared without locking: the exception path
/// only ever reads it.
#[derive(Debug, Default)]
pub struct RecoverableFaultTable<const N: usize = 8> {
    regions: Vec<RecoverableRegion, N>,
}

impl<const N: usize> RecoverableFaultTable<N> {
    /// Empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self { regions: Vec::new() }
    }

    /// Register one region. Intended for bring-up code, before the fault
    /// handlers are live.
    ///
    /// # Errors
    ///
    /// Returns the region back when the table is full.
    pub fn register(&mut self, region: RecoverableRegion) -> Result<(), RecoverableRegion> {
        self.regions.push(region)
    }

    /// The registered regions.
    #[must_use]
    pub fn regions(&self) -> &[RecoverableRegion] {
        &self.regions
    }
}

/// Check the stacked PC against `regions` and apply the fixup on a match.
///
/// The Thumb bit is masked off the region bounds before comparison. On
/// asynchronous paths (`synchronous == false`, e.g. a debug-monitor event
/// delivered after the faulting instruction retired) the end bound is
/// extended by one instruction width.
///
/// Returns `true` — and rewrites `esf.pc` — when the fault is recoverable.
pub fn apply_fixup(regions: &[RecoverableRegion], esf: &mut BasicFrame, synchronous: bool) -> bool {
    for region in regions {
        let start = region.start & !0x1;
        let mut end = region.end & !0x1;
        if !synchronous {
            end = end.wrapping_add(THUMB_INSN_BYTES);
        }
        if esf.pc >= start && esf.pc < end {
            esf.pc = region.fixup;
            return true;
        }
    }
    false
}
