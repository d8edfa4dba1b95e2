//! High-level trap handling. The low-level vector (`trap.S`) spills the
//! register file onto the trapped stack and hands the frame to
//! [`trap_handler`]; the boot shim points `mtvec` at it before the kernel
//! runs.

mod context;

pub use context::TrapFrame;

use crate::syscall::syscall;

#[cfg(target_arch = "riscv64")]
core::arch::global_asm!(include_str!("trap.S"));

/// `mcause` value for the environment call a task issues with `ecall`.
const ENV_CALL: usize = 11;

/// Boot-banner probe: the trap vector must be installed before the
/// scheduler starts running tasks.
#[cfg(target_arch = "riscv64")]
pub fn vector_installed() -> bool {
    riscv::register::mtvec::read().bits() != 0
}

#[cfg(not(target_arch = "riscv64"))]
pub fn vector_installed() -> bool {
    true
}

/// Decode `mcause` and dispatch. An environment call resumes the task at
/// the instruction after its `ecall` with the syscall's result in a0,
/// unless the syscall itself switched away (EXIT never comes back here;
/// YIELD and a blocking SEM_WAIT come back once the process is scheduled
/// again). Any other cause is fatal: report it and park the hart.
#[no_mangle]
pub extern "C" fn trap_handler(frame: &mut TrapFrame) {
    let cause = read_mcause();
    if cause == ENV_CALL {
        frame.mepc += 4;
        let ret = syscall(frame.syscall_id(), frame.syscall_args());
        frame.set_return(ret);
        return;
    }
    println!("Error: unhandled trap, mcause = {:#x}", cause);
    loop {
        #[cfg(target_arch = "riscv64")]
        unsafe {
            riscv::asm::wfi()
        };
        #[cfg(not(target_arch = "riscv64"))]
        core::hint::spin_loop();
    }
}

#[cfg(target_arch = "riscv64")]
fn read_mcause() -> usize {
    riscv::register::mcause::read().bits()
}

#[cfg(not(target_arch = "riscv64"))]
fn read_mcause() -> usize {
    unreachable!("traps only occur on the target")
}
