use crate::task::{exit_current_and_run_next, suspend_current_and_run_next};

/// Terminal: the process is marked ZOMBIE and the CPU goes back to the
/// scheduler for good.
pub fn sys_exit() -> isize {
    exit_current_and_run_next()
}

/// The caller becomes READY again and regains the CPU when the
/// round-robin scan comes back to it.
pub fn sys_yield() -> isize {
    suspend_current_and_run_next();
    0
}
