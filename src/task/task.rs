use super::context::TaskContext;
use crate::config::MAX_NAME_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Free,
    Ready,
    Running,
    /// Parked on a semaphore's wait list.
    BlockedSem,
    /// Reserved; nothing in the kernel sleeps yet.
    #[allow(dead_code)]
    Sleep,
    Zombie,
}

/// One slot of the process table. `pid == 0` means the slot is empty; live
/// PIDs are positive and never reused within a run.
pub struct Process {
    pub pid: i32,
    name: [u8; MAX_NAME_LEN],
    name_len: usize,
    /// Address the bootstrap jumps to.
    pub entry: usize,
    pub stack: usize,
    /// 16-byte aligned top of the stack region.
    pub stack_top: usize,
    pub stack_size: usize,
    pub state: ProcState,
    /// Semaphore id this process is blocked on; -1 when runnable.
    pub blocked_sem_id: i32,
    /// Intrusive wait-list link: the table slot of the next blocked
    /// process. The semaphore owns the list head; slots only borrow.
    pub next_blocked: Option<usize>,
    /// Saved callee context; live whenever the process is off-CPU.
    pub ctx: TaskContext,
}

impl Process {
    pub const fn empty() -> Self {
        Process {
            pid: 0,
            name: [0; MAX_NAME_LEN],
            name_len: 0,
            entry: 0,
            stack: 0,
            stack_top: 0,
            stack_size: 0,
            state: ProcState::Free,
            blocked_sem_id: -1,
            next_blocked: None,
            ctx: TaskContext::zero_init(),
        }
    }

    /// Wipe every field back to the empty-slot state, wait-list linkage
    /// included.
    pub fn clear(&mut self) {
        *self = Process::empty();
    }

    /// Copy `name` into the slot, truncated to `MAX_NAME_LEN - 1` bytes on
    /// a character boundary.
    pub fn set_name(&mut self, name: &str) {
        let mut len = name.len().min(MAX_NAME_LEN - 1);
        while !name.is_char_boundary(len) {
            len -= 1;
        }
        self.name[..len].copy_from_slice(&name.as_bytes()[..len]);
        self.name_len = len;
    }

    pub fn name(&self) -> &str {
        core::str::from_utf8(&self.name[..self.name_len]).unwrap_or("")
    }

    pub fn is_runnable(&self) -> bool {
        matches!(self.state, ProcState::Ready | ProcState::Running)
    }
}
