//! Counting semaphore slots. The wait list is intrusive: `head` names a
//! process-table slot and the chain continues through each process's
//! `next_blocked` link, so the transitions that touch both tables live in
//! the scheduler.

use crate::config::MAX_SEMS;

pub struct Semaphore {
    pub id: i32,
    /// Signed count; negative means `-count` processes are waiting.
    pub count: i32,
    /// PID that created the semaphore. Informational only.
    pub owner_pid: i32,
    /// Front of the FIFO wait list (woken first).
    pub head: Option<usize>,
    pub in_use: bool,
}

impl Semaphore {
    pub const EMPTY: Semaphore = Semaphore {
        id: 0,
        count: 0,
        owner_pid: 0,
        head: None,
        in_use: false,
    };
}

pub struct SemTable {
    sems: [Semaphore; MAX_SEMS],
    next_id: i32,
}

impl SemTable {
    pub const fn new() -> Self {
        SemTable {
            sems: [Semaphore::EMPTY; MAX_SEMS],
            next_id: 1,
        }
    }

    pub fn reset(&mut self) {
        for sem in self.sems.iter_mut() {
            *sem = Semaphore::EMPTY;
        }
        self.next_id = 1;
    }

    /// Claim a free slot and issue a fresh id.
    pub fn create(&mut self, initial: i32, owner_pid: i32) -> Option<i32> {
        let sem = self.sems.iter_mut().find(|s| !s.in_use)?;
        let id = self.next_id;
        self.next_id += 1;
        *sem = Semaphore {
            id,
            count: initial,
            owner_pid,
            head: None,
            in_use: true,
        };
        Some(id)
    }

    pub fn get(&self, id: i32) -> Option<&Semaphore> {
        if id <= 0 {
            return None;
        }
        self.sems.iter().find(|s| s.in_use && s.id == id)
    }

    pub fn get_mut(&mut self, id: i32) -> Option<&mut Semaphore> {
        if id <= 0 {
            return None;
        }
        self.sems.iter_mut().find(|s| s.in_use && s.id == id)
    }

    /// Release the slot. The caller has already emptied the wait list.
    pub fn free(&mut self, id: i32) -> bool {
        match self.get_mut(id) {
            Some(sem) => {
                *sem = Semaphore::EMPTY;
                true
            }
            None => false,
        }
    }
}
