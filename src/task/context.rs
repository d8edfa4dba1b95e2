/// Callee-saved context captured by `__switch`. The scheduler keeps one of
/// these for the kernel loop itself: its `sp` field is the saved kernel
/// stack pointer and its `ra` field the point every task exit resumes.
#[repr(C)]
pub struct TaskContext {
    ra: usize,
    sp: usize,
    s: [usize; 12],
}

impl TaskContext {
    pub const fn zero_init() -> Self {
        TaskContext {
            ra: 0,
            sp: 0,
            s: [0; 12],
        }
    }

    /// Context for a process that has never run: the first `__switch` into
    /// it lands in the bootstrap with the fresh stack installed.
    pub fn goto_bootstrap(stack_top: usize) -> Self {
        TaskContext {
            ra: super::processor::task_bootstrap as usize,
            sp: stack_top,
            s: [0; 12],
        }
    }
}
