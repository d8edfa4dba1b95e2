//! Embedded user programs. The packaging step bakes a table of flat RV64
//! binaries plus the assembly listings they came from into
//! `user_programs.rs`; at boot the kernel mirrors each listing into the
//! filesystem as `/user_programs/<name>.S` so the shell can `cat` them.

use crate::config::MAX_NAME_LEN;
use crate::fs::{self, Fat, FsError, ROOT};

pub struct EmbeddedFile {
    pub name: &'static str,
    pub binary: &'static [u8],
    pub source: &'static [u8],
}

pub fn embedded_files() -> &'static [EmbeddedFile] {
    crate::user_programs::EMBEDDED_FILES
}

pub fn find_program(name: &str) -> Option<&'static EmbeddedFile> {
    embedded_files().iter().find(|prog| prog.name == name)
}

/// Mirror every embedded listing into `/user_programs`. Sources larger
/// than a file's capacity are truncated.
pub fn install_user_programs(fat: &mut Fat) -> Result<(), FsError> {
    let dir = fat.mkdir_recursive(ROOT, "user_programs")?;
    for prog in embedded_files() {
        let mut buf = [0u8; MAX_NAME_LEN];
        let stem = prog.name.len().min(MAX_NAME_LEN - 3);
        buf[..stem].copy_from_slice(&prog.name.as_bytes()[..stem]);
        buf[stem] = b'.';
        buf[stem + 1] = b'S';
        let filename = core::str::from_utf8(&buf[..stem + 2]).unwrap_or("prog.S");
        let id = fat.touch(dir, filename)?;
        fat.file_mut(id).set_content(prog.source);
    }
    Ok(())
}

/// Boot service: there are programs and they all made it into the FAT.
pub fn init() -> bool {
    if embedded_files().is_empty() {
        return false;
    }
    install_user_programs(&mut fs::fat()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_are_mirrored_into_the_fat() {
        let mut fat = fs::fat();
        fat.init();
        install_user_programs(&mut fat).unwrap();
        let dir = fat.find_subdir(ROOT, "user_programs").unwrap();
        for prog in embedded_files() {
            let filename = format!("{}.S", prog.name);
            let id = fat.find_file(dir, &filename).unwrap();
            assert_eq!(fat.file(id).content(), prog.source);
        }
        assert_eq!(fat.file_ids(dir).count(), embedded_files().len());
    }

    #[test]
    fn programs_are_found_by_stem() {
        assert!(!embedded_files().is_empty());
        for prog in embedded_files() {
            let found = find_program(prog.name).unwrap();
            assert!(!found.binary.is_empty());
            // Flat RV64 code is a whole number of 32-bit instructions.
            assert_eq!(found.binary.len() % 4, 0);
        }
        assert!(find_program("no-such-program").is_none());
    }
}
