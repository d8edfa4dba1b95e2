//! The panic handler. A kernel panic is unrecoverable: report it on the
//! console and park the hart.

use core::panic::PanicInfo;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    println!("[kernel] {}", info);
    loop {
        unsafe { riscv::asm::wfi() };
    }
}
