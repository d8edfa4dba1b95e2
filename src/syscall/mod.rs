//! Syscall numbers and dispatch. A task requests kernel service with
//! `ecall`: id in a7, up to four arguments in a0..a3, result back in a0.

pub const SYSCALL_EXIT: usize = 93;
pub const SYSCALL_YIELD: usize = 124;
pub const SYSCALL_SEM_CREATE: usize = 150;
pub const SYSCALL_SEM_WAIT: usize = 151;
pub const SYSCALL_SEM_SIGNAL: usize = 152;
pub const SYSCALL_SEM_DESTROY: usize = 153;

mod process;
mod sync;
pub mod user;

/// Dispatch on the syscall id. An unknown id is not fatal: complain and
/// let the task continue past its `ecall` with -1 in a0.
pub fn syscall(id: usize, args: [usize; 4]) -> isize {
    match id {
        SYSCALL_EXIT => process::sys_exit(),
        SYSCALL_YIELD => process::sys_yield(),
        SYSCALL_SEM_CREATE => sync::sys_sem_create(args[0] as i32),
        SYSCALL_SEM_WAIT => sync::sys_sem_wait(args[0] as i32),
        SYSCALL_SEM_SIGNAL => sync::sys_sem_signal(args[0] as i32),
        SYSCALL_SEM_DESTROY => sync::sys_sem_destroy(args[0] as i32),
        _ => {
            warn!("unsupported syscall id {}", id);
            -1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task;

    // These run against the global scheduler; keep them serialized.
    static TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn reset() -> std::sync::MutexGuard<'static, ()> {
        let guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        task::scheduler_init();
        guard
    }

    #[test]
    fn unknown_id_is_rejected_not_fatal() {
        let _guard = reset();
        assert_eq!(syscall(0xDEAD, [0; 4]), -1);
    }

    #[test]
    fn yield_without_a_running_process_is_harmless() {
        let _guard = reset();
        assert_eq!(syscall(SYSCALL_YIELD, [0; 4]), 0);
    }

    #[test]
    fn sem_create_returns_fresh_ids() {
        let _guard = reset();
        let a = syscall(SYSCALL_SEM_CREATE, [1, 0, 0, 0]);
        let b = syscall(SYSCALL_SEM_CREATE, [0, 0, 0, 0]);
        assert!(a > 0);
        assert_eq!(b, a + 1);
    }

    #[test]
    fn sem_ops_on_unknown_ids_return_the_sentinel() {
        let _guard = reset();
        assert_eq!(syscall(SYSCALL_SEM_WAIT, [77, 0, 0, 0]), -1);
        assert_eq!(syscall(SYSCALL_SEM_SIGNAL, [77, 0, 0, 0]), -1);
        assert_eq!(syscall(SYSCALL_SEM_DESTROY, [77, 0, 0, 0]), -1);
    }

    #[test]
    fn sem_signal_and_destroy_round_trip() {
        let _guard = reset();
        let id = syscall(SYSCALL_SEM_CREATE, [0, 0, 0, 0]);
        assert_eq!(syscall(SYSCALL_SEM_SIGNAL, [id as usize, 0, 0, 0]), 0);
        assert_eq!(syscall(SYSCALL_SEM_DESTROY, [id as usize, 0, 0, 0]), 0);
        // The id is gone: every further operation sees an unknown id.
        assert_eq!(syscall(SYSCALL_SEM_WAIT, [id as usize, 0, 0, 0]), -1);
        assert_eq!(syscall(SYSCALL_SEM_DESTROY, [id as usize, 0, 0, 0]), -1);
    }
}
