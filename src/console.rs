//! Polled driver for the memory-mapped 16550 UART on the QEMU virt board,
//! plus the kernel's `print!`/`println!` macros. Offset 0 transmits a byte
//! (or yields the received byte on read); offset 5 is the line status
//! register.

use core::fmt::{self, Write};

#[cfg(target_os = "none")]
mod mmio {
    use crate::config::UART_BASE;

    pub const THR: usize = 0;
    pub const RBR: usize = 0;
    pub const LSR: usize = 5;

    bitflags! {
        pub struct LineStatus: u8 {
            const DATA_READY = 1 << 0;
            const THR_EMPTY  = 1 << 5;
        }
    }

    pub fn read_reg(offset: usize) -> u8 {
        unsafe { ((UART_BASE + offset) as *const u8).read_volatile() }
    }

    pub fn write_reg(offset: usize, byte: u8) {
        unsafe { ((UART_BASE + offset) as *mut u8).write_volatile(byte) }
    }

    pub fn line_status() -> LineStatus {
        LineStatus::from_bits_truncate(read_reg(LSR))
    }
}

/// Transmit one byte, waiting for the holding register to drain first.
#[cfg(target_os = "none")]
pub fn putchar(c: u8) {
    use mmio::*;
    while !line_status().contains(LineStatus::THR_EMPTY) {}
    write_reg(THR, c);
}

/// Block until a byte arrives on the UART.
#[cfg(target_os = "none")]
pub fn getchar() -> u8 {
    use mmio::*;
    while !line_status().contains(LineStatus::DATA_READY) {}
    read_reg(RBR)
}

// Hosted builds (unit tests) have no UART; console output is discarded and
// nothing on the host ever reads input.
#[cfg(not(target_os = "none"))]
pub fn putchar(_c: u8) {}

#[cfg(not(target_os = "none"))]
pub fn getchar() -> u8 {
    unreachable!("console input is only available on the target")
}

struct Stdout;

impl Write for Stdout {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.bytes() {
            putchar(c);
        }
        Ok(())
    }
}

pub fn print(args: fmt::Arguments) {
    Stdout.write_fmt(args).unwrap();
}

macro_rules! print {
    ($fmt: literal $(, $($arg: tt)+)?) => {
        $crate::console::print(format_args!($fmt $(, $($arg)+)?))
    };
}

macro_rules! println {
    ($fmt: literal $(, $($arg: tt)+)?) => {
        $crate::console::print(format_args!(concat!($fmt, "\n") $(, $($arg)+)?))
    };
}
