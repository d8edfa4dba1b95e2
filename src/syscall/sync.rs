use crate::task::{
    block_current_and_run_next, sem_create, sem_destroy, sem_signal, sem_wait_begin, WaitOutcome,
};

pub fn sys_sem_create(initial: i32) -> isize {
    match sem_create(initial) {
        Some(id) => id as isize,
        None => -1,
    }
}

/// Decrement the semaphore. If the count went negative the caller is
/// already parked on the wait list; give up the CPU here and only return
/// once a signal (or a destroy) released it.
pub fn sys_sem_wait(id: i32) -> isize {
    match sem_wait_begin(id) {
        Ok(WaitOutcome::Acquired) => 0,
        Ok(WaitOutcome::Blocked) => {
            block_current_and_run_next();
            0
        }
        Err(_) => -1,
    }
}

/// Wake at most one waiter. The caller keeps the CPU either way.
pub fn sys_sem_signal(id: i32) -> isize {
    match sem_signal(id) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}

pub fn sys_sem_destroy(id: i32) -> isize {
    match sem_destroy(id) {
        Ok(()) => 0,
        Err(_) => -1,
    }
}
