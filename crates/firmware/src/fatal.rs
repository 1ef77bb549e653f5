//! Fault system installation and the default fatal policy
//!
//! Bring-up code calls [`install`] once, before the fault exceptions are
//! enabled, to publish the capability configuration, the stack-overflow
//! resolver and the recoverable-fault regions to the exception path. The
//! trampoline then builds a dispatcher on its own stack per fault — the
//! published state is read-only, so the intentional re-entrancy of the
//! dispatcher needs no locking.
//!
//! The default fatal policy dumps the classified reason and the copied
//! frame over defmt, then halts through `defmt::panic!` (routed to
//! `panic-probe`). Kernels with a richer policy (thread abort, reboot)
//! implement [`fault::FatalHandler`] themselves and fork this module's
//! `dispatch` glue.

use core::cell::Cell;

use critical_section::Mutex;
use static_cell::StaticCell;

use fault::{
    vector_name, CalleeRegs, ExceptionStackFrame, FatalHandler, FaultConfig, FaultDispatcher,
    FaultReason, FaultRegisters, Outcome, RecoverableFaultTable, RecoverableRegion,
    StackOverflowResolver,
};

use crate::scb::ScbFaultRegisters;

/// Capacity of the installed recoverable-fault table.
pub const MAX_RECOVERABLE_REGIONS: usize = 8;

/// Published fault-system state; read-only after [`install`].
pub struct FaultSettings {
    /// Build capability configuration.
    pub config: FaultConfig,
    /// Thread stack geometry oracle (scheduler side of the kernel).
    pub resolver: &'static (dyn StackOverflowResolver + Sync),
    /// Registered expected-fault regions.
    pub table: RecoverableFaultTable<MAX_RECOVERABLE_REGIONS>,
}

static SETTINGS_CELL: StaticCell<FaultSettings> = StaticCell::new();
static INSTALLED: Mutex<Cell<Option<&'static FaultSettings>>> = Mutex::new(Cell::new(None));

/// Installation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InstallError {
    /// [`install`] was already called.
    AlreadyInstalled,
    /// More regions than [`MAX_RECOVERABLE_REGIONS`].
    TableFull,
}

/// Publish the fault-system configuration. Call once from bring-up,
/// before [`crate::init::init`] enables the fault exceptions.
///
/// # Errors
///
/// [`InstallError::AlreadyInstalled`] on a second call;
/// [`InstallError::TableFull`] when `regions` exceeds the table capacity.
pub fn install(
    config: FaultConfig,
    resolver: &'static (dyn StackOverflowResolver + Sync),
    regions: &[RecoverableRegion],
) -> Result<(), InstallError> {
    let mut table = RecoverableFaultTable::new();
    for region in regions {
        table.register(*region).map_err(|_| InstallError::TableFull)?;
    }
    let settings = SETTINGS_CELL
        .try_init(FaultSettings {
            config,
            resolver,
            table,
        })
        .ok_or(InstallError::AlreadyInstalled)?;
    critical_section::with(|cs| INSTALLED.borrow(cs).set(Some(settings)));
    Ok(())
}

/// Default fatal policy: defmt register dump, then halt.
pub struct DefaultFatalPolicy;

impl FatalHandler for DefaultFatalPolicy {
    fn fatal_error(&mut self, reason: FaultReason, esf: &ExceptionStackFrame) {
        defmt::error!("r0  {=u32:#010x}  r1 {=u32:#010x}", esf.basic.r0, esf.basic.r1);
        defmt::error!("r2  {=u32:#010x}  r3 {=u32:#010x}", esf.basic.r2, esf.basic.r3);
        defmt::error!("r12 {=u32:#010x}  lr {=u32:#010x}", esf.basic.r12, esf.basic.lr);
        defmt::error!("pc  {=u32:#010x} psr {=u32:#010x}", esf.basic.pc, esf.basic.xpsr);
        if let Some(callee) = &esf.extra.callee {
            defmt::error!("r4  {=u32:#010x}  r5 {=u32:#010x}", callee.r4, callee.r5);
            defmt::error!("r6  {=u32:#010x}  r7 {=u32:#010x}", callee.r6, callee.r7);
            defmt::error!("r8  {=u32:#010x}  r9 {=u32:#010x}", callee.r8, callee.r9);
            defmt::error!("r10 {=u32:#010x} r11 {=u32:#010x}", callee.r10, callee.r11);
            defmt::error!("psp {=u32:#010x}", callee.psp);
        }
        defmt::error!(
            "EXC_RETURN {=u32:#010x}, MSP {=usize:#010x}",
            esf.extra.exc_return,
            esf.extra.msp
        );
        defmt::panic!("{} (reason {=u32})", reason.as_str(), reason.as_u32());
    }
}

/// Exception-path entry: build a dispatcher over the live registers and
/// run one fault through it. Called from the asm trampoline; returns only
/// on a recoverable outcome.
pub fn dispatch(msp: usize, psp: usize, exc_return: u32, callee: Option<&CalleeRegs>) {
    let Some(settings) = critical_section::with(|cs| INSTALLED.borrow(cs).get()) else {
        // A fault before install() means bring-up wired the vectors ahead
        // of publishing the configuration.
        defmt::panic!("fault dispatched before fault system install");
    };
    let mut regs = ScbFaultRegisters;
    let vector = regs.icsr() & 0x1FF;
    defmt::error!("fault entry: vector {=u32} ({})", vector, vector_name(vector));

    let mut policy = DefaultFatalPolicy;
    let mut dispatcher = FaultDispatcher::new(
        &mut regs,
        settings.config,
        settings.resolver,
        settings.table.regions(),
        &mut policy,
    );
    match dispatcher.handle(msp, psp, exc_return, callee) {
        Outcome::Resumed => {}
        Outcome::HandedOff(_) => {
            // The default policy never returns; a custom policy that does
            // must not fall back into a context we just declared
            // untrustworthy.
            loop {
                cortex_m::asm::bkpt();
            }
        }
    }
}
