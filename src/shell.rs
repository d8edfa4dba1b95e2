//! The interactive shell. It runs as an ordinary cooperative process (the
//! scheduler creates it when the table is empty) and is the kernel's only
//! console client: a small line editor in front of a command table.

use crate::config::DEFAULT_STACK_SIZE;
use crate::console::{getchar, putchar};
use crate::demos;
use crate::fs::{self, DirId, Fat, ROOT};
use crate::loader;
use crate::syscall::user;
use crate::task::{self, ProcState};

const LINE_LEN: usize = 128;

const CTRL_D: u8 = 0x04;
const BS: u8 = 0x08;
const LF: u8 = 0x0a;
const CR: u8 = 0x0d;
const ESC: u8 = 0x1b;
const DEL: u8 = 0x7f;

pub fn shell_main() {
    let mut shell = Shell { cwd: ROOT };
    let mut line = [0u8; LINE_LEN];
    loop {
        shell.print_prompt();
        let len = read_line(&mut line);
        if let Ok(cmdline) = core::str::from_utf8(&line[..len]) {
            shell.handle_command(cmdline);
        }
    }
}

/// Read one line, echoing as we go. Backspace rubs out, CR and LF both
/// finish the line, and arrow-key escape sequences are swallowed.
fn read_line(buf: &mut [u8; LINE_LEN]) -> usize {
    let mut pos = 0;
    loop {
        let c = getchar();
        match c {
            ESC => {
                // ESC [ A..D; read and drop both bytes
                getchar();
                getchar();
            }
            CR | LF => {
                putchar(b'\n');
                return pos;
            }
            BS | DEL => {
                if pos > 0 {
                    pos -= 1;
                    putchar(BS);
                    putchar(b' ');
                    putchar(BS);
                }
            }
            _ => {
                if pos < LINE_LEN - 1 {
                    buf[pos] = c;
                    pos += 1;
                    putchar(c);
                }
            }
        }
    }
}

struct Shell {
    cwd: DirId,
}

impl Shell {
    fn print_prompt(&self) {
        let fat = fs::fat();
        if self.cwd == ROOT {
            print!("(shell) user [/] > ");
        } else {
            print!("(shell) user [../{}] > ", fat.name(self.cwd));
        }
    }

    fn handle_command(&mut self, line: &str) {
        let line = line.trim_start_matches(' ');
        let (cmd, args) = match line.find(' ') {
            Some(i) => (&line[..i], line[i + 1..].trim_start_matches(' ')),
            None => (line, ""),
        };
        match cmd {
            "" => {}
            "help" => cmd_help(),
            "echo" => println!("{}", args),
            "clear" => print!("\x1b[2J\x1b[H"),
            "mkdir" => self.cmd_mkdir(args),
            "rmdir" => self.cmd_rmdir(args),
            "ls" => self.cmd_ls(args),
            "touch" => self.cmd_touch(args),
            "rm" => self.cmd_rm(args),
            "mv" => self.cmd_mv(args),
            "cd" => self.cmd_cd(args),
            "df" => cmd_df(),
            "pwd" => self.cmd_pwd(),
            "ps" => cmd_ps(),
            "cat" => self.cmd_cat(args),
            "edit" => self.cmd_edit(args, false),
            "append" => self.cmd_edit(args, true),
            "run" => self.cmd_run(args),
            "demo" => cmd_demo(args),
            "exit" => cmd_exit(),
            _ => println!("Unknown command: {}", cmd),
        }
    }

    fn cmd_mkdir(&self, args: &str) {
        if args.is_empty() {
            println!("Usage: mkdir <path>");
            return;
        }
        match fs::fat().mkdir_recursive(self.cwd, args) {
            Ok(_) => println!("Directory created."),
            Err(err) => println!("Failed to create directory ({}).", err),
        }
    }

    fn cmd_rmdir(&self, args: &str) {
        match fs::fat().rmdir(self.cwd, args) {
            Ok(()) => println!("Directory removed."),
            Err(err) => println!("Failed to remove directory ({}).", err),
        }
    }

    fn cmd_ls(&self, args: &str) {
        let fat = fs::fat();
        let dir = if args.is_empty() {
            self.cwd
        } else {
            match fat.resolve(self.cwd, args) {
                Ok(dir) => dir,
                Err(_) => {
                    println!("Error: invalid directory");
                    return;
                }
            }
        };
        println!("Directories:");
        if fat.subdirs(dir).next().is_none() {
            println!("  * (none)");
        }
        for sub in fat.subdirs(dir) {
            println!("  * {}", fat.name(sub));
        }
        println!("Files:");
        if fat.file_ids(dir).next().is_none() {
            println!("  * (none)");
        }
        for id in fat.file_ids(dir) {
            println!("  * {}", fat.file(id).name());
        }
    }

    fn cmd_touch(&self, args: &str) {
        if args.is_empty() {
            println!("Usage: touch <path>");
            return;
        }
        let mut fat = fs::fat();
        let (parent, name) = match fat.touch_recursive(self.cwd, args) {
            Ok(split) => split,
            Err(_) => {
                println!("Invalid path.");
                return;
            }
        };
        match fat.touch(parent, name) {
            Ok(_) => println!("File created."),
            Err(err) => println!("Failed to create file ({}).", err),
        }
    }

    fn cmd_rm(&self, args: &str) {
        match fs::fat().rm(self.cwd, args) {
            Ok(()) => println!("File removed."),
            Err(_) => println!("File not found."),
        }
    }

    fn cmd_mv(&self, args: &str) {
        let (src, dst) = match args.find(' ') {
            Some(i) => (&args[..i], args[i + 1..].trim_start_matches(' ')),
            None => {
                println!("Usage: mv <file> <dir>");
                return;
            }
        };
        // A "./" prefix on the source is just noise.
        let src = src.strip_prefix("./").unwrap_or(src);
        let mut fat = fs::fat();
        let dst_dir = match fat.resolve(self.cwd, dst) {
            Ok(dir) => dir,
            Err(_) => {
                println!("Move failed: invalid destination");
                return;
            }
        };
        match fat.mv(self.cwd, src, dst_dir) {
            Ok(()) => println!("Moved successfully."),
            Err(_) => println!("Move failed."),
        }
    }

    fn cmd_cd(&mut self, args: &str) {
        if args.is_empty() {
            return;
        }
        match fs::fat().resolve(self.cwd, args) {
            Ok(dir) => self.cwd = dir,
            Err(_) => println!("Error: directory not found"),
        }
    }

    fn cmd_pwd(&self) {
        let fat = fs::fat();
        let mut buf = [0u8; LINE_LEN];
        let len = abs_path(&fat, self.cwd, &mut buf);
        if let Ok(path) = core::str::from_utf8(&buf[..len]) {
            println!("{}", path);
        }
    }

    fn cmd_cat(&self, args: &str) {
        if args.is_empty() {
            println!("Usage: cat <filename>");
            return;
        }
        let fat = fs::fat();
        let id = match fat.find_file(self.cwd, args) {
            Some(id) => id,
            None => {
                println!("File not found");
                return;
            }
        };
        for &byte in fat.file(id).content() {
            putchar(byte);
        }
        putchar(b'\n');
    }

    fn cmd_edit(&self, args: &str, append: bool) {
        if args.is_empty() {
            println!("Usage: edit|append <filename>");
            return;
        }
        let mut fat = fs::fat();
        let id = match fat.find_file(self.cwd, args) {
            Some(id) => id,
            None => {
                println!("File not found");
                return;
            }
        };
        let file = fat.file_mut(id);
        if !append {
            file.clear();
        }
        if append {
            println!("Append mode (Ctrl+D to finish):");
        } else {
            println!("Enter new content (end with Ctrl+D):");
        }
        loop {
            let c = getchar();
            if c == CTRL_D {
                break;
            }
            let stored = if c == CR || c == LF { b'\n' } else { c };
            putchar(stored);
            if !file.push(stored) {
                break;
            }
        }
        println!("");
        println!("File updated.");
    }

    fn cmd_run(&self, args: &str) {
        if args.is_empty() {
            println!("Usage: run <program.S>");
            return;
        }
        {
            let fat = fs::fat();
            if fat.name(self.cwd) != "user_programs" {
                println!("Error: No user programs were found");
                return;
            }
        }
        let base = match args.strip_suffix(".S") {
            Some(base) if !base.is_empty() => base,
            _ => {
                println!("Error: You must specify an assembly (.S) file");
                return;
            }
        };
        let prog = match loader::find_program(base) {
            Some(prog) => prog,
            None => {
                println!("Error: Program has no binary or doesn't exist");
                return;
            }
        };
        match task::create_process_from_binary(prog.binary, base, DEFAULT_STACK_SIZE) {
            Ok(pid) => {
                // Cooperative wait: keep yielding until the program's slot
                // is reclaimed.
                while task::is_alive(pid) {
                    user::yield_();
                }
            }
            Err(_) => println!("Error: Failed to create process"),
        }
    }
}

/// Reconstruct the absolute path of `dir` by walking the parent links;
/// returns the number of bytes written.
fn abs_path(fat: &Fat, mut dir: DirId, out: &mut [u8; LINE_LEN]) -> usize {
    if fat.parent(dir).is_none() {
        out[0] = b'/';
        return 1;
    }
    let mut pos = out.len();
    while let Some(parent) = fat.parent(dir) {
        let name = fat.name(dir).as_bytes();
        if pos < name.len() + 1 {
            break;
        }
        pos -= name.len();
        out[pos..pos + name.len()].copy_from_slice(name);
        pos -= 1;
        out[pos] = b'/';
        dir = parent;
    }
    out.copy_within(pos.., 0);
    LINE_LEN - pos
}

fn cmd_ps() {
    println!("PID\tName\t\tState");
    println!("-------------------------------");
    task::for_each_proc(|proc| {
        let state = match proc.state {
            ProcState::Ready => "READY",
            ProcState::Running => "RUNNING",
            ProcState::BlockedSem => "BLOCKED",
            ProcState::Sleep => "SLEEP",
            ProcState::Zombie => "ZOMBIE",
            ProcState::Free => return,
        };
        let pad = if proc.name().len() < 8 { "\t\t" } else { "\t" };
        println!("{}\t{}{}{}", proc.pid, proc.name(), pad, state);
    });
}

fn cmd_df() {
    let fat = fs::fat();
    println!("Resource\tUsed\tFree\tMax");
    println!("-------------------------------------");
    println!(
        "Directories\t{}\t{}\t{}",
        fat.count_used_dirs(),
        fat.count_free_dirs(),
        crate::config::MAX_DIRS
    );
    println!(
        "Files\t\t{}\t{}\t{}",
        fat.count_used_files(),
        fat.count_free_files(),
        crate::config::MAX_FILES
    );
    println!("");
    println!("Used Space: {} KB", fat.total_file_bytes() / 1024);
    println!(
        "Total Space: {} KB",
        crate::config::MAX_FILES * crate::config::MAX_FILE_SIZE / 1024
    );
}

fn cmd_demo(args: &str) {
    match args {
        "yield" => demos::demo_yield(),
        "mutex" => demos::demo_mutex(),
        "prodcons" => demos::demo_prodcons(),
        _ => println!("Usage: demo yield|mutex|prodcons"),
    }
}

fn cmd_exit() {
    println!("To perform a clean exit, use 'Ctrl+A X'.");
    println!("Otherwise, use 'Ctrl+A C' to enter the QEMU monitor, then type 'quit'.");
}

fn cmd_help() {
    println!("Available Commands:");
    println!("  * 'help'\t\tShow this help message.");
    println!("  * 'echo <args>'\tEcho arguments.");
    println!("  * 'clear'\t\tClear the screen.");
    println!("  * 'mkdir <path>'\tCreate a new directory.");
    println!("  * 'rmdir <name>'\tRemove a directory.");
    println!("  * 'ls [path]'\t\tList files and directories.");
    println!("  * 'touch <path>'\tCreate a new file.");
    println!("  * 'rm <name>'\t\tDelete a file.");
    println!("  * 'mv <src> <dest>'\tMove a file to another directory.");
    println!("  * 'cd <dir>'\t\tChange current directory.");
    println!("  * 'df'\t\tDisplay current storage and resources.");
    println!("  * 'pwd'\t\tPrint current working directory.");
    println!("  * 'ps'\t\tDisplay all current processes.");
    println!("  * 'cat <name>'\tDump a file's contents to the console.");
    println!("  * 'edit <name>'\tOverwrite a file's contents.");
    println!("  * 'append <name>'\tAppend to a file's contents.");
    println!("  * 'run <name.S>'\tRun a user program.");
    println!("  * 'demo <name>'\tRun a scheduling demo.");
    println!("  * 'exit'\t\tHow to leave the emulator.");
}
