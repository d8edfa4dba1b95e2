//! Kernel memory: a monotonic bump allocator over the heap region the
//! linker script exports. There is no `free`; every allocation is owned for
//! the rest of the run.

use crate::config::{HEAP_ALIGN, PAGE_SIZE};
use core::ptr::NonNull;
use spin::Mutex;

pub struct BumpAllocator {
    next: usize,
    limit: usize,
}

impl BumpAllocator {
    pub const fn empty() -> Self {
        Self { next: 0, limit: 0 }
    }

    pub fn init(&mut self, start: usize, end: usize) {
        self.next = align_up(start);
        self.limit = end;
    }

    /// Hand out at least `size` bytes, 16-byte aligned. Returns `None` for
    /// a zero-sized request or when the region cannot fit the rounded size;
    /// a failed request consumes nothing.
    pub fn alloc(&mut self, size: usize) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }
        let size = size.checked_add(HEAP_ALIGN - 1)? & !(HEAP_ALIGN - 1);
        let end = self.next.checked_add(size)?;
        if end > self.limit {
            return None;
        }
        let ptr = self.next as *mut u8;
        self.next = end;
        NonNull::new(ptr)
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.next)
    }
}

fn align_up(addr: usize) -> usize {
    (addr + HEAP_ALIGN - 1) & !(HEAP_ALIGN - 1)
}

static KERNEL_HEAP: Mutex<BumpAllocator> = Mutex::new(BumpAllocator::empty());

/// Adopt the linker-defined heap region. Until this runs every allocation
/// fails.
#[cfg(target_os = "none")]
pub fn init() {
    extern "C" {
        fn _kernel_heap_start();
        fn _kernel_heap_end();
    }
    let (start, end) = (_kernel_heap_start as usize, _kernel_heap_end as usize);
    KERNEL_HEAP.lock().init(start, end);
    log::info!("heap {:#x}..{:#x}", start, end);
}

/// Heap self-test for the boot banner: the region must be non-empty and
/// writable.
#[cfg(target_os = "none")]
pub fn sanity_check() -> bool {
    extern "C" {
        fn _kernel_heap_start();
        fn _kernel_heap_end();
    }
    let (start, end) = (_kernel_heap_start as usize, _kernel_heap_end as usize);
    if end <= start {
        return false;
    }
    let probe = start as *mut u8;
    unsafe {
        probe.write_volatile(0xAA);
        probe.add(1).write_volatile(0x55);
        probe.read_volatile() == 0xAA && probe.add(1).read_volatile() == 0x55
    }
}

pub fn kmalloc(size: usize) -> Option<NonNull<u8>> {
    KERNEL_HEAP.lock().alloc(size)
}

pub fn alloc_page() -> Option<NonNull<u8>> {
    kmalloc(PAGE_SIZE)
}

/// Code and stack regions for one process. The two allocations are
/// independent; if either fails the bundle reports both as missing.
pub struct ProcessMemory {
    pub code: Option<NonNull<u8>>,
    pub code_size: usize,
    pub stack: Option<NonNull<u8>>,
    pub stack_size: usize,
}

pub fn alloc_process_memory(code_size: usize, stack_size: usize) -> ProcessMemory {
    let code = kmalloc(code_size);
    let stack = kmalloc(stack_size);
    if code.is_none() || stack.is_none() {
        log::warn!("failed to allocate process memory");
        return ProcessMemory {
            code: None,
            code_size,
            stack: None,
            stack_size,
        };
    }
    ProcessMemory {
        code,
        code_size,
        stack,
        stack_size,
    }
}

/// Point the global heap at a leaked buffer so hosted tests can allocate.
#[cfg(test)]
pub fn init_test_heap() {
    use std::sync::Once;
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let region = Vec::leak(vec![0u8; 4 << 20]);
        let start = region.as_ptr() as usize;
        KERNEL_HEAP.lock().init(start, start + region.len());
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    // Backing storage aligned to the allocator's granularity, so `init`
    // does not shave bytes off the front.
    fn fresh(len: usize) -> BumpAllocator {
        assert_eq!(len % 16, 0);
        let region = Vec::leak(vec![0u128; len / 16]);
        let start = region.as_ptr() as usize;
        let mut bump = BumpAllocator::empty();
        bump.init(start, start + len);
        bump
    }

    #[test]
    fn zero_sized_request_fails() {
        let mut bump = fresh(256);
        assert!(bump.alloc(0).is_none());
    }

    #[test]
    fn allocations_are_aligned() {
        let mut bump = fresh(4096);
        for size in [1, 15, 16, 17, 100] {
            let ptr = bump.alloc(size).unwrap();
            assert_eq!(ptr.as_ptr() as usize % HEAP_ALIGN, 0);
        }
    }

    #[test]
    fn rounds_requests_up() {
        let mut bump = fresh(4096);
        let a = bump.alloc(1).unwrap().as_ptr() as usize;
        let b = bump.alloc(1).unwrap().as_ptr() as usize;
        assert_eq!(b - a, HEAP_ALIGN);
    }

    #[test]
    fn exhaustion_is_clean() {
        let mut bump = fresh(64);
        // An oversized request fails without consuming headroom.
        assert!(bump.alloc(128).is_none());
        assert_eq!(bump.remaining(), 64);
        assert!(bump.alloc(64).is_some());
        assert!(bump.alloc(1).is_none());
    }

    #[test]
    fn uninitialized_allocator_fails() {
        let mut bump = BumpAllocator::empty();
        assert!(bump.alloc(8).is_none());
    }

    #[test]
    fn page_allocation_is_plain_bump_allocation() {
        init_test_heap();
        let page = alloc_page().unwrap();
        assert_eq!(page.as_ptr() as usize % HEAP_ALIGN, 0);
    }

    #[test]
    fn overflowing_request_fails() {
        let mut bump = fresh(64);
        assert!(bump.alloc(usize::MAX).is_none());
        assert!(bump.alloc(usize::MAX - 8).is_none());
        assert_eq!(bump.remaining(), 64);
    }

    #[test]
    fn process_memory_is_all_or_nothing() {
        init_test_heap();
        let ok = alloc_process_memory(128, 4096);
        assert!(ok.code.is_some() && ok.stack.is_some());
        assert_eq!((ok.code_size, ok.stack_size), (128, 4096));
        // Impossible code size: both regions come back empty.
        let bad = alloc_process_memory(usize::MAX - 4, 4096);
        assert!(bad.code.is_none() && bad.stack.is_none());
    }
}
