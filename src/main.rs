//! Kernel entry. The boot shim (`entry.asm`) installs the trap vector,
//! hands us a stack and calls [`kernel_main`], which brings the services
//! up in order and then never leaves the scheduler.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate bitflags;

#[macro_use]
mod console;
mod config;
mod demos;
mod fs;
#[cfg(target_os = "none")]
mod lang_items;
mod loader;
mod logging;
mod mm;
mod shell;
mod syscall;
mod task;
mod trap;
mod user_programs;

#[cfg(target_arch = "riscv64")]
core::arch::global_asm!(include_str!("entry.asm"));

type ServiceCheck = fn() -> bool;

static SERVICES: &[(&str, ServiceCheck)] = &[
    ("scheduler", task::scheduler_init),
    ("memory", service_memory),
    ("traps", trap::vector_installed),
    ("filesystem", fs::init),
    ("user programs", loader::init),
];

#[cfg(target_os = "none")]
fn service_memory() -> bool {
    mm::init();
    mm::sanity_check()
}

#[cfg(not(target_os = "none"))]
fn service_memory() -> bool {
    true
}

fn print_current_mode() {
    #[cfg(target_arch = "riscv64")]
    {
        use riscv::register::mstatus::{self, MPP};
        let mode = match mstatus::read().mpp() {
            MPP::Machine => "Machine Mode",
            MPP::Supervisor => "Supervisor Mode",
            MPP::User => "User Mode",
        };
        print!("(kernel) {}", mode);
    }
    #[cfg(not(target_arch = "riscv64"))]
    print!("(kernel) Hosted");
}

#[no_mangle]
pub extern "C" fn kernel_main() -> ! {
    clear_bss();
    logging::init();
    print_current_mode();
    println!(" active. Starting RISC-V OS...");
    println!("(kernel) Initializing services:");
    println!("  * console........ OK");
    for (name, check) in SERVICES {
        println!("  * {}........ {}", name, if check() { "OK" } else { "FAIL" });
    }
    println!("");
    println!("(kernel) System ready. Starting scheduler...");
    println!("================================");
    println!("");
    task::run_tasks()
}

fn clear_bss() {
    #[cfg(target_os = "none")]
    {
        extern "C" {
            fn sbss();
            fn ebss();
        }
        unsafe {
            core::slice::from_raw_parts_mut(sbss as usize as *mut u8, ebss as usize - sbss as usize)
                .fill(0);
        }
    }
}

#[cfg(all(not(target_os = "none"), not(test)))]
fn main() {
    std::println!("This is a bare-metal kernel: build it for riscv64gc-unknown-none-elf");
    std::println!("and boot the image under QEMU. `cargo test` runs the hosted unit tests.");
}
