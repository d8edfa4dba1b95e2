//! Output of the embedded-program packaging step, checked in so the tree
//! builds without rerunning it. Each entry pairs a flat RV64 binary with
//! the assembly listing it was assembled from; the kernel copies the
//! listings into the filesystem at boot and `run` jumps to the binaries.

use crate::loader::EmbeddedFile;

pub static EMBEDDED_FILES: &[EmbeddedFile] = &[
    EmbeddedFile {
        name: "counter",
        // Prints the digits 0..9 and a newline straight to the UART,
        // then exits.
        binary: &[
            0xb7, 0x02, 0x00, 0x10, // lui   t0, 0x10000
            0x13, 0x03, 0x00, 0x03, // li    t1, 48
            0x93, 0x03, 0xa0, 0x03, // li    t2, 58
            0x23, 0x80, 0x62, 0x00, // sb    t1, 0(t0)
            0x13, 0x03, 0x13, 0x00, // addi  t1, t1, 1
            0xe3, 0x4c, 0x73, 0xfe, // blt   t1, t2, -8
            0x13, 0x05, 0xa0, 0x00, // li    a0, 10
            0x23, 0x80, 0xa2, 0x00, // sb    a0, 0(t0)
            0x93, 0x08, 0xd0, 0x05, // li    a7, 93
            0x73, 0x00, 0x00, 0x00, // ecall
        ],
        source: b"# counter.S - print the digits 0..9 on the UART, then exit
    .globl _start
_start:
    lui  t0, 0x10000        # UART transmit register
    li   t1, '0'
    li   t2, '9' + 1
1:
    sb   t1, 0(t0)
    addi t1, t1, 1
    blt  t1, t2, 1b
    li   a0, '\\n'
    sb   a0, 0(t0)
    li   a7, 93             # SYSCALL_EXIT
    ecall
",
    },
    EmbeddedFile {
        name: "noop",
        // Exits immediately.
        binary: &[
            0x93, 0x08, 0xd0, 0x05, // li    a7, 93
            0x73, 0x00, 0x00, 0x00, // ecall
        ],
        source: b"# noop.S - request termination and nothing else
    .globl _start
_start:
    li   a7, 93             # SYSCALL_EXIT
    ecall
",
    },
];
