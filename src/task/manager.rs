//! The process and semaphore tables: slot claim and reclaim, PID issue,
//! round-robin selection, and the semaphore transitions that park and wake
//! processes.

use super::context::TaskContext;
use super::sem::{SemTable, Semaphore};
use super::task::{ProcState, Process};
use crate::config::{HEAP_ALIGN, MAX_PROCS};
use crate::mm;
use lazy_static::lazy_static;
use spin::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// Every process slot is taken.
    NoFreeSlot,
    /// The bump allocator could not back the request.
    OutOfMemory,
    /// Unknown semaphore id.
    NoSuchSem,
    /// The operation needs a running process and there is none.
    NoCurrent,
}

/// What a `sem_wait` did to the calling process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Acquired,
    /// The caller was parked on the wait list and must give up the CPU.
    Blocked,
}

pub struct Scheduler {
    procs: [Process; MAX_PROCS],
    sems: SemTable,
    /// PID of the process owning the CPU, if any.
    pub current: Option<i32>,
    next_pid: i32,
    /// Slot the last dispatch picked; the next scan starts one past it.
    last_slot: usize,
    /// The scheduler loop's own saved context. Its `sp` is the saved
    /// kernel stack pointer, its `ra` the return-hook resume point.
    pub kernel_ctx: TaskContext,
}

impl Scheduler {
    pub fn new() -> Self {
        const EMPTY: Process = Process::empty();
        Scheduler {
            procs: [EMPTY; MAX_PROCS],
            sems: SemTable::new(),
            current: None,
            next_pid: 1,
            last_slot: MAX_PROCS - 1,
            kernel_ctx: TaskContext::zero_init(),
        }
    }

    /// Free every slot, clear the semaphore table and restart both id
    /// counters at 1.
    pub fn init(&mut self) {
        for proc in self.procs.iter_mut() {
            proc.clear();
        }
        self.sems.reset();
        self.current = None;
        self.next_pid = 1;
        self.last_slot = MAX_PROCS - 1;
    }

    fn find_free_slot(&self) -> Option<usize> {
        self.procs.iter().position(|p| p.state == ProcState::Free)
    }

    pub fn slot_of_pid(&self, pid: i32) -> Option<usize> {
        if pid <= 0 {
            return None;
        }
        self.procs.iter().position(|p| p.pid == pid)
    }

    pub fn proc(&self, slot: usize) -> &Process {
        &self.procs[slot]
    }

    pub fn proc_mut(&mut self, slot: usize) -> &mut Process {
        &mut self.procs[slot]
    }

    pub fn procs(&self) -> impl Iterator<Item = &Process> {
        self.procs.iter()
    }

    pub fn proc_count(&self) -> usize {
        self.procs
            .iter()
            .filter(|p| p.state != ProcState::Free)
            .count()
    }

    fn install(
        &mut self,
        slot: usize,
        entry: usize,
        name: &str,
        stack_base: usize,
        stack_size: usize,
    ) -> i32 {
        let pid = self.next_pid;
        self.next_pid += 1;
        let proc = &mut self.procs[slot];
        proc.pid = pid;
        proc.set_name(name);
        proc.entry = entry;
        proc.stack = stack_base;
        proc.stack_top = (stack_base + stack_size) & !(HEAP_ALIGN - 1);
        proc.stack_size = stack_size;
        proc.state = ProcState::Ready;
        proc.blocked_sem_id = -1;
        proc.next_blocked = None;
        proc.ctx = TaskContext::goto_bootstrap(proc.stack_top);
        log::info!("process '{}' created [pid {}]", proc.name(), pid);
        pid
    }

    /// Claim a slot, give it a fresh stack and mark it READY.
    pub fn create_process(
        &mut self,
        entry: usize,
        name: &str,
        stack_size: usize,
    ) -> Result<i32, SchedError> {
        let slot = self.find_free_slot().ok_or(SchedError::NoFreeSlot)?;
        let stack = mm::kmalloc(stack_size).ok_or(SchedError::OutOfMemory)?;
        Ok(self.install(slot, entry, name, stack.as_ptr() as usize, stack_size))
    }

    /// Copy a flat binary into fresh code memory and run it from its first
    /// byte.
    pub fn create_process_from_binary(
        &mut self,
        binary: &[u8],
        name: &str,
        stack_size: usize,
    ) -> Result<i32, SchedError> {
        let slot = self.find_free_slot().ok_or(SchedError::NoFreeSlot)?;
        let code_size = (binary.len() + HEAP_ALIGN - 1) & !(HEAP_ALIGN - 1);
        let mem = mm::alloc_process_memory(code_size, stack_size);
        let (code, stack) = match (mem.code, mem.stack) {
            (Some(code), Some(stack)) => (code, stack),
            _ => return Err(SchedError::OutOfMemory),
        };
        unsafe {
            core::ptr::copy_nonoverlapping(binary.as_ptr(), code.as_ptr(), binary.len());
        }
        let entry = code.as_ptr() as usize;
        Ok(self.install(slot, entry, name, stack.as_ptr() as usize, stack_size))
    }

    /// Mark a process ZOMBIE; the slot is reclaimed by the return hook.
    /// Unknown PIDs are ignored.
    pub fn terminate(&mut self, pid: i32) {
        if let Some(slot) = self.slot_of_pid(pid) {
            self.procs[slot].state = ProcState::Zombie;
        }
    }

    /// Round-robin pick: scan at most `MAX_PROCS` slots starting one past
    /// the last dispatched slot and take the first READY or RUNNING one.
    pub fn select_next(&self) -> Option<usize> {
        let start = (self.last_slot + 1) % MAX_PROCS;
        (0..MAX_PROCS)
            .map(|off| (start + off) % MAX_PROCS)
            .find(|&slot| self.procs[slot].is_runnable())
    }

    /// Hand the CPU to `slot`.
    pub fn mark_running(&mut self, slot: usize) {
        debug_assert!(!self
            .procs
            .iter()
            .enumerate()
            .any(|(i, p)| i != slot && p.state == ProcState::Running));
        self.procs[slot].state = ProcState::Running;
        self.current = Some(self.procs[slot].pid);
        self.last_slot = slot;
    }

    /// The return hook's bookkeeping half: runs on the kernel stack after
    /// a task gave up the CPU. A ZOMBIE is wiped back to FREE; a yielded
    /// or blocked process keeps its slot.
    pub fn reclaim_current(&mut self) {
        if let Some(pid) = self.current.take() {
            if let Some(slot) = self.slot_of_pid(pid) {
                if self.procs[slot].state == ProcState::Zombie {
                    log::debug!(
                        "reclaiming pid {} ({} B stack at {:#x})",
                        pid,
                        self.procs[slot].stack_size,
                        self.procs[slot].stack
                    );
                    self.procs[slot].clear();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Semaphores
    // ------------------------------------------------------------------

    pub fn sem_create(&mut self, initial: i32) -> Option<i32> {
        let owner = self.current.unwrap_or(0);
        self.sems.create(initial, owner)
    }

    pub fn sem_get(&self, id: i32) -> Option<&Semaphore> {
        self.sems.get(id)
    }

    /// Decrement the count on behalf of the running process. A negative
    /// result parks the caller at the tail of the wait list; the caller
    /// must then actually yield the CPU.
    pub fn sem_wait(&mut self, id: i32) -> Result<WaitOutcome, SchedError> {
        let pid = self.current.ok_or(SchedError::NoCurrent)?;
        let slot = self.slot_of_pid(pid).ok_or(SchedError::NoCurrent)?;
        let sem = self.sems.get_mut(id).ok_or(SchedError::NoSuchSem)?;
        sem.count -= 1;
        if sem.count >= 0 {
            return Ok(WaitOutcome::Acquired);
        }
        assert!(self.procs[slot].next_blocked.is_none());
        self.procs[slot].state = ProcState::BlockedSem;
        self.procs[slot].blocked_sem_id = id;
        self.wait_list_push(id, slot);
        Ok(WaitOutcome::Blocked)
    }

    /// Increment the count; if processes were waiting, wake the one at the
    /// front of the list. The woken process runs when the round-robin scan
    /// next reaches it; the caller is not preempted.
    pub fn sem_signal(&mut self, id: i32) -> Result<(), SchedError> {
        let sem = self.sems.get_mut(id).ok_or(SchedError::NoSuchSem)?;
        sem.count += 1;
        if sem.count <= 0 {
            self.wake_one(id);
        }
        Ok(())
    }

    /// Tear the semaphore down. Any process still waiting is woken (its
    /// pending `sem_wait` completes) rather than left parked forever.
    pub fn sem_destroy(&mut self, id: i32) -> Result<(), SchedError> {
        let owner = self.sem_get(id).ok_or(SchedError::NoSuchSem)?.owner_pid;
        while self.sem_get(id).and_then(|s| s.head).is_some() {
            self.wake_one(id);
        }
        self.sems.free(id);
        log::debug!("sem {} destroyed (created by pid {})", id, owner);
        Ok(())
    }

    /// FIFO tail insert.
    fn wait_list_push(&mut self, id: i32, slot: usize) {
        let head = match self.sems.get(id).and_then(|s| s.head) {
            None => {
                if let Some(sem) = self.sems.get_mut(id) {
                    sem.head = Some(slot);
                }
                return;
            }
            Some(head) => head,
        };
        let mut tail = head;
        while let Some(next) = self.procs[tail].next_blocked {
            tail = next;
        }
        self.procs[tail].next_blocked = Some(slot);
    }

    /// Pop the front of the wait list and make it READY.
    fn wake_one(&mut self, id: i32) {
        let head = match self.sems.get(id).and_then(|s| s.head) {
            Some(head) => head,
            None => return,
        };
        debug_assert_eq!(self.procs[head].blocked_sem_id, id);
        let next = self.procs[head].next_blocked;
        if let Some(sem) = self.sems.get_mut(id) {
            sem.head = next;
        }
        let proc = &mut self.procs[head];
        proc.next_blocked = None;
        proc.blocked_sem_id = -1;
        proc.state = ProcState::Ready;
    }

    #[cfg(test)]
    fn wait_list_len(&self, id: i32) -> usize {
        let mut len = 0;
        let mut cursor = self.sems.get(id).and_then(|s| s.head);
        while let Some(slot) = cursor {
            len += 1;
            cursor = self.procs[slot].next_blocked;
        }
        len
    }
}

lazy_static! {
    pub(super) static ref SCHEDULER: Mutex<Scheduler> = Mutex::new(Scheduler::new());
}
