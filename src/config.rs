//! Global tunables. Everything size-like in the kernel is fixed at build
//! time; nothing here is runtime-configurable.

/// Number of slots in the process table.
pub const MAX_PROCS: usize = 16;
/// Number of slots in the semaphore table.
pub const MAX_SEMS: usize = 32;
/// Stack handed to a process when the creator does not care.
pub const DEFAULT_STACK_SIZE: usize = 4096;
/// Granularity of `mm::alloc_page`.
pub const PAGE_SIZE: usize = 4096;
/// Every bump allocation is aligned to this, as is every stack top.
pub const HEAP_ALIGN: usize = 16;

/// Name capacity for processes, files and directories; usable length is
/// one byte less.
pub const MAX_NAME_LEN: usize = 16;
/// Directory pool size, which is also the child capacity of one directory.
pub const MAX_DIRS: usize = 16;
/// File pool size, which is also the file capacity of one directory.
pub const MAX_FILES: usize = 64;
/// Fixed data capacity of a file.
pub const MAX_FILE_SIZE: usize = 16 * 1024;

/// QEMU virt 16550 UART base address.
pub const UART_BASE: usize = 0x1000_0000;
