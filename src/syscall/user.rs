//! `ecall` wrappers for cooperative tasks. A task must not call into the
//! scheduler directly; trapping is its one way to give up the CPU, so the
//! shell and the demo tasks go through these.

use super::{
    SYSCALL_EXIT, SYSCALL_SEM_CREATE, SYSCALL_SEM_DESTROY, SYSCALL_SEM_SIGNAL, SYSCALL_SEM_WAIT,
    SYSCALL_YIELD,
};

#[cfg(target_arch = "riscv64")]
fn syscall(id: usize, arg0: usize) -> isize {
    let mut ret: isize;
    unsafe {
        core::arch::asm!(
            "ecall",
            inlateout("a0") arg0 => ret,
            in("a7") id,
        );
    }
    ret
}

#[cfg(not(target_arch = "riscv64"))]
fn syscall(_id: usize, _arg0: usize) -> isize {
    unimplemented!("ecall needs the riscv64 target")
}

pub fn exit() -> ! {
    syscall(SYSCALL_EXIT, 0);
    unreachable!()
}

pub fn yield_() -> isize {
    syscall(SYSCALL_YIELD, 0)
}

pub fn sem_create(initial: i32) -> isize {
    syscall(SYSCALL_SEM_CREATE, initial as usize)
}

pub fn sem_wait(id: i32) -> isize {
    syscall(SYSCALL_SEM_WAIT, id as usize)
}

pub fn sem_signal(id: i32) -> isize {
    syscall(SYSCALL_SEM_SIGNAL, id as usize)
}

pub fn sem_destroy(id: i32) -> isize {
    syscall(SYSCALL_SEM_DESTROY, id as usize)
}
