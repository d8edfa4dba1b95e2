//! Process management: the process and semaphore tables, the cooperative
//! round-robin scheduler and the context-switch plumbing underneath it.
//!
//! Control only changes hands at explicit points: a process returns from
//! its entry, yields, or blocks on a semaphore. All three paths funnel
//! through `__switch` back into the scheduler loop's saved context, so be
//! careful around it: control flow there is not what it looks like.

mod context;
mod manager;
mod processor;
mod sem;
mod switch;
mod task;

pub use context::TaskContext;
pub use manager::{SchedError, WaitOutcome};
pub use processor::run_tasks;
pub use task::{ProcState, Process};

use manager::SCHEDULER;
use switch::__switch;

/// Reset the process and semaphore tables. Returns true so the boot
/// banner can report it like any other service.
pub fn scheduler_init() -> bool {
    SCHEDULER.lock().init();
    true
}

pub fn create_process(entry: fn(), name: &str, stack_size: usize) -> Result<i32, SchedError> {
    SCHEDULER
        .lock()
        .create_process(entry as usize, name, stack_size)
}

pub fn create_process_from_binary(
    binary: &[u8],
    name: &str,
    stack_size: usize,
) -> Result<i32, SchedError> {
    SCHEDULER
        .lock()
        .create_process_from_binary(binary, name, stack_size)
}

/// Mark a process ZOMBIE; reclamation happens in the return hook. Unknown
/// PIDs are ignored.
pub fn terminate_process(pid: i32) {
    SCHEDULER.lock().terminate(pid);
}

/// Whether `pid` still occupies a table slot (in any non-FREE state).
pub fn is_alive(pid: i32) -> bool {
    SCHEDULER.lock().slot_of_pid(pid).is_some()
}

/// Visit every occupied slot; used by the shell's `ps`.
pub fn for_each_proc(mut f: impl FnMut(&Process)) {
    let sched = SCHEDULER.lock();
    for proc in sched.procs().filter(|p| p.state != ProcState::Free) {
        f(proc);
    }
}

/// Give up the CPU voluntarily. Returns when the round-robin scan comes
/// back around to the caller.
pub fn suspend_current_and_run_next() {
    let (task_ctx, kernel_ctx) = {
        let mut sched = SCHEDULER.lock();
        let slot = match sched.current.and_then(|pid| sched.slot_of_pid(pid)) {
            Some(slot) => slot,
            None => return,
        };
        if sched.proc(slot).state == ProcState::Running {
            sched.proc_mut(slot).state = ProcState::Ready;
        }
        let task_ctx: *mut TaskContext = &mut sched.proc_mut(slot).ctx;
        let kernel_ctx: *const TaskContext = &sched.kernel_ctx;
        (task_ctx, kernel_ctx)
    };
    unsafe { __switch(task_ctx, kernel_ctx) };
}

/// Give up the CPU after `sem_wait` parked the caller. The process is
/// already BLOCKED_SEM; it regains control only after a later-scheduled
/// process signals the semaphore and the scan reaches it.
pub fn block_current_and_run_next() {
    let (task_ctx, kernel_ctx) = {
        let mut sched = SCHEDULER.lock();
        let slot = match sched.current.and_then(|pid| sched.slot_of_pid(pid)) {
            Some(slot) => slot,
            None => return,
        };
        debug_assert_eq!(sched.proc(slot).state, ProcState::BlockedSem);
        let task_ctx: *mut TaskContext = &mut sched.proc_mut(slot).ctx;
        let kernel_ctx: *const TaskContext = &sched.kernel_ctx;
        (task_ctx, kernel_ctx)
    };
    unsafe { __switch(task_ctx, kernel_ctx) };
}

/// Terminate the running process and never come back to it.
pub fn exit_current_and_run_next() -> ! {
    let kernel_ctx = {
        let mut sched = SCHEDULER.lock();
        if let Some(pid) = sched.current {
            sched.terminate(pid);
        }
        let kernel_ctx: *const TaskContext = &sched.kernel_ctx;
        kernel_ctx
    };
    // The context saved here is never resumed.
    let mut dead = TaskContext::zero_init();
    unsafe { __switch(&mut dead, kernel_ctx) };
    unreachable!()
}

// ----------------------------------------------------------------------
// Semaphore surface used by the syscall layer
// ----------------------------------------------------------------------

pub fn sem_create(initial: i32) -> Option<i32> {
    SCHEDULER.lock().sem_create(initial)
}

/// Run the table half of a wait. On `Blocked` the caller must follow up
/// with [`block_current_and_run_next`].
pub fn sem_wait_begin(id: i32) -> Result<WaitOutcome, SchedError> {
    SCHEDULER.lock().sem_wait(id)
}

pub fn sem_signal(id: i32) -> Result<(), SchedError> {
    SCHEDULER.lock().sem_signal(id)
}

pub fn sem_destroy(id: i32) -> Result<(), SchedError> {
    SCHEDULER.lock().sem_destroy(id)
}
