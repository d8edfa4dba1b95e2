//! The scheduler loop. `run_tasks` owns the kernel stack; every dispatch
//! is a `__switch` out of `kernel_ctx` and every task exit path is a
//! `__switch` back into it, which resumes the loop right after the
//! dispatch. That resume point is the return hook.

use super::context::TaskContext;
use super::manager::SCHEDULER;
use super::switch::__switch;
use crate::config::DEFAULT_STACK_SIZE;

/// Run processes forever. If the table is empty the shell becomes the
/// first task; when nothing is runnable the hart idles until an interrupt.
pub fn run_tasks() -> ! {
    {
        let mut sched = SCHEDULER.lock();
        if sched.proc_count() == 0
            && sched
                .create_process(
                    crate::shell::shell_main as usize,
                    "shell",
                    DEFAULT_STACK_SIZE,
                )
                .is_err()
        {
            log::error!("failed to create the shell process");
        }
    }
    loop {
        let mut sched = SCHEDULER.lock();
        match sched.select_next() {
            Some(slot) => {
                sched.mark_running(slot);
                let task_ctx: *const TaskContext = &sched.proc(slot).ctx;
                let kernel_ctx: *mut TaskContext = &mut sched.kernel_ctx;
                drop(sched);
                unsafe { __switch(kernel_ctx, task_ctx) };
                // Back on the kernel stack: the task returned, yielded or
                // blocked. Reclaim its slot if it exited.
                SCHEDULER.lock().reclaim_current();
            }
            None => {
                drop(sched);
                wait_for_interrupt();
            }
        }
    }
}

/// First frame of every process, entered by the initial `__switch` with
/// the fresh stack already installed. A plain return from the entry
/// becomes an exit.
pub(super) extern "C" fn task_bootstrap() -> ! {
    let entry = {
        let sched = SCHEDULER.lock();
        let pid = sched.current.unwrap();
        let slot = sched.slot_of_pid(pid).unwrap();
        sched.proc(slot).entry
    };
    let entry: fn() = unsafe { core::mem::transmute(entry) };
    entry();
    super::exit_current_and_run_next()
}

fn wait_for_interrupt() {
    #[cfg(target_arch = "riscv64")]
    unsafe {
        riscv::asm::wfi()
    };
    #[cfg(not(target_arch = "riscv64"))]
    core::hint::spin_loop();
}
