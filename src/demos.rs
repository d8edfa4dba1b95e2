//! Built-in cooperative scheduling demos, launched from the shell. Each
//! one is the classic scenario it is named after: a yield interleaving, a
//! binary-semaphore critical section, and a producer/consumer handoff.
//! The launching shell waits by yielding until the workers are gone, so
//! the whole run stays cooperative.

use crate::config::DEFAULT_STACK_SIZE;
use crate::syscall::user;
use crate::task;
use core::sync::atomic::{AtomicI32, Ordering};

// Workers take no arguments, so the launcher parks shared semaphore ids
// here before creating them.
static MUTEX_SEM: AtomicI32 = AtomicI32::new(-1);
static FULL_SEM: AtomicI32 = AtomicI32::new(-1);
static EMPTY_SEM: AtomicI32 = AtomicI32::new(-1);

fn spawn(entry: fn(), name: &str) -> Option<i32> {
    match task::create_process(entry, name, DEFAULT_STACK_SIZE) {
        Ok(pid) => Some(pid),
        Err(err) => {
            println!("Error: failed to create '{}' ({:?})", name, err);
            None
        }
    }
}

/// Yield until every listed process has left the table.
fn wait_for(pids: &[i32]) {
    while pids.iter().any(|&pid| task::is_alive(pid)) {
        user::yield_();
    }
}

fn yield_worker_a() {
    print!("A A ");
    user::yield_();
    println!("A");
}

fn yield_worker_b() {
    print!("B B ");
    user::yield_();
    println!("B");
}

/// Two processes print twice, yield, print once more and return. Round
/// robin interleaves them as A A B B A B.
pub fn demo_yield() {
    let (Some(a), Some(b)) = (spawn(yield_worker_a, "A"), spawn(yield_worker_b, "B")) else {
        return;
    };
    wait_for(&[a, b]);
}

fn mutex_worker() {
    let sid = MUTEX_SEM.load(Ordering::Relaxed);
    user::sem_wait(sid);
    print!("x");
    user::yield_();
    print!("y");
    user::sem_signal(sid);
    user::exit()
}

/// Binary semaphore: both workers yield inside the critical section, yet
/// the output is "xy" twice, never "xx" or "yy".
pub fn demo_mutex() {
    let sid = user::sem_create(1);
    if sid < 0 {
        println!("Error: out of semaphores");
        return;
    }
    MUTEX_SEM.store(sid as i32, Ordering::Relaxed);
    let (Some(a), Some(b)) = (spawn(mutex_worker, "lock-a"), spawn(mutex_worker, "lock-b")) else {
        return;
    };
    wait_for(&[a, b]);
    user::sem_destroy(sid as i32);
    println!("");
}

fn producer() {
    user::sem_wait(EMPTY_SEM.load(Ordering::Relaxed));
    println!("(producer) item placed");
    user::sem_signal(FULL_SEM.load(Ordering::Relaxed));
    user::exit()
}

fn consumer() {
    user::sem_wait(FULL_SEM.load(Ordering::Relaxed));
    println!("(consumer) item taken");
    user::sem_signal(EMPTY_SEM.load(Ordering::Relaxed));
    user::exit()
}

/// The consumer starts first and blocks on `full`; starting the producer
/// unblocks it and both exit cleanly.
pub fn demo_prodcons() {
    let full = user::sem_create(0);
    let empty = user::sem_create(1);
    if full < 0 || empty < 0 {
        println!("Error: out of semaphores");
        return;
    }
    FULL_SEM.store(full as i32, Ordering::Relaxed);
    EMPTY_SEM.store(empty as i32, Ordering::Relaxed);
    let (Some(c), Some(p)) = (spawn(consumer, "consumer"), spawn(producer, "producer")) else {
        return;
    };
    wait_for(&[c, p]);
    user::sem_destroy(full as i32);
    user::sem_destroy(empty as i32);
}
