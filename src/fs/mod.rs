//! Pool-backed in-memory filesystem. One directory pool and one file pool
//! own all storage; directories reference their children by pool index.
//! Slot 0 of the directory array is the root and is never allocated or
//! freed. No operation mutates anything until every precondition has been
//! checked, so a failed call leaves the tree exactly as it was.

use crate::config::{MAX_DIRS, MAX_FILES, MAX_FILE_SIZE, MAX_NAME_LEN};
use core::fmt;
use spin::Mutex;

/// Index of a directory in the pool. The root is `ROOT`; everyone besides
/// the pool borrows.
pub type DirId = usize;
/// Index of a file in the pool.
pub type FileId = usize;

pub const ROOT: DirId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Empty, too long, all spaces, or containing '/'.
    InvalidName,
    /// An entry of that name already exists in the directory.
    AlreadyExists,
    NotFound,
    /// The directory's child or file list is at capacity.
    DirFull,
    /// No free slot left in the pool.
    PoolExhausted,
    /// rmdir target still has entries.
    NotEmpty,
    /// Malformed path (empty or oversized segment, trailing slash).
    BadPath,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            FsError::InvalidName => "invalid name",
            FsError::AlreadyExists => "already exists",
            FsError::NotFound => "not found",
            FsError::DirFull => "directory full",
            FsError::PoolExhausted => "no free slots",
            FsError::NotEmpty => "directory not empty",
            FsError::BadPath => "invalid path",
        };
        f.write_str(msg)
    }
}

#[derive(Clone, Copy)]
struct Name {
    bytes: [u8; MAX_NAME_LEN],
    len: usize,
}

impl Name {
    const EMPTY: Name = Name {
        bytes: [0; MAX_NAME_LEN],
        len: 0,
    };

    /// Caller has validated `s` fits.
    fn set(&mut self, s: &str) {
        self.bytes[..s.len()].copy_from_slice(s.as_bytes());
        self.len = s.len();
    }

    fn as_str(&self) -> &str {
        core::str::from_utf8(&self.bytes[..self.len]).unwrap_or("")
    }
}

pub struct File {
    name: Name,
    data: [u8; MAX_FILE_SIZE],
    size: usize,
    used: bool,
}

impl File {
    const FREE: File = File {
        name: Name::EMPTY,
        data: [0; MAX_FILE_SIZE],
        size: 0,
        used: false,
    };

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// The live bytes; `size` is exclusive.
    pub fn content(&self) -> &[u8] {
        &self.data[..self.size]
    }

    pub fn clear(&mut self) {
        self.size = 0;
    }

    /// Append one byte; reports false once the buffer is full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.size == MAX_FILE_SIZE {
            return false;
        }
        self.data[self.size] = byte;
        self.size += 1;
        true
    }

    /// Replace the contents, truncating at the buffer capacity.
    pub fn set_content(&mut self, bytes: &[u8]) {
        let n = bytes.len().min(MAX_FILE_SIZE);
        self.data[..n].copy_from_slice(&bytes[..n]);
        self.size = n;
    }
}

struct Directory {
    name: Name,
    parent: Option<DirId>,
    subdirs: [DirId; MAX_DIRS],
    subdir_count: usize,
    files: [FileId; MAX_FILES],
    file_count: usize,
    used: bool,
}

impl Directory {
    const FREE: Directory = Directory {
        name: Name::EMPTY,
        parent: None,
        subdirs: [0; MAX_DIRS],
        subdir_count: 0,
        files: [0; MAX_FILES],
        file_count: 0,
        used: false,
    };
}

pub struct Fat {
    // Slot 0 is the root, so the pool proper is slots 1..=MAX_DIRS.
    dirs: [Directory; MAX_DIRS + 1],
    files: [File; MAX_FILES],
}

fn validate_name(name: &str) -> Result<(), FsError> {
    if name.is_empty() || name.len() >= MAX_NAME_LEN {
        return Err(FsError::InvalidName);
    }
    if name.contains('/') || name.bytes().all(|b| b == b' ') {
        return Err(FsError::InvalidName);
    }
    Ok(())
}

impl Fat {
    pub const fn new() -> Self {
        Fat {
            dirs: [Directory::FREE; MAX_DIRS + 1],
            files: [File::FREE; MAX_FILES],
        }
    }

    /// (Re)initialize: free both pools and set up the root. Idempotent.
    pub fn init(&mut self) {
        for dir in self.dirs.iter_mut() {
            *dir = Directory::FREE;
        }
        for file in self.files.iter_mut() {
            file.name = Name::EMPTY;
            file.size = 0;
            file.used = false;
        }
        let root = &mut self.dirs[ROOT];
        root.name.set("/");
        root.used = true;
    }

    pub fn root_ok(&self) -> bool {
        self.dirs[ROOT].used
    }

    pub fn name(&self, dir: DirId) -> &str {
        self.dirs[dir].name.as_str()
    }

    pub fn parent(&self, dir: DirId) -> Option<DirId> {
        self.dirs[dir].parent
    }

    pub fn subdirs(&self, dir: DirId) -> impl Iterator<Item = DirId> + '_ {
        let d = &self.dirs[dir];
        d.subdirs[..d.subdir_count].iter().copied()
    }

    pub fn file_ids(&self, dir: DirId) -> impl Iterator<Item = FileId> + '_ {
        let d = &self.dirs[dir];
        d.files[..d.file_count].iter().copied()
    }

    pub fn file(&self, id: FileId) -> &File {
        &self.files[id]
    }

    pub fn file_mut(&mut self, id: FileId) -> &mut File {
        &mut self.files[id]
    }

    pub fn find_subdir(&self, dir: DirId, name: &str) -> Option<DirId> {
        self.subdirs(dir).find(|&d| self.dirs[d].name.as_str() == name)
    }

    pub fn find_file(&self, dir: DirId, name: &str) -> Option<FileId> {
        self.file_ids(dir)
            .find(|&f| self.files[f].name.as_str() == name)
    }

    pub fn mkdir(&mut self, parent: DirId, name: &str) -> Result<DirId, FsError> {
        validate_name(name)?;
        if self.find_subdir(parent, name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        if self.dirs[parent].subdir_count == MAX_DIRS {
            return Err(FsError::DirFull);
        }
        let id = (1..=MAX_DIRS)
            .find(|&i| !self.dirs[i].used)
            .ok_or(FsError::PoolExhausted)?;
        let dir = &mut self.dirs[id];
        dir.used = true;
        dir.name.set(name);
        dir.parent = Some(parent);
        dir.subdir_count = 0;
        dir.file_count = 0;
        let p = &mut self.dirs[parent];
        p.subdirs[p.subdir_count] = id;
        p.subdir_count += 1;
        Ok(id)
    }

    /// Walk `path` from `start`, creating every missing segment. Empty and
    /// oversized segments are hard errors; a single trailing slash is
    /// tolerated.
    pub fn mkdir_recursive(&mut self, start: DirId, path: &str) -> Result<DirId, FsError> {
        if path.is_empty() {
            return Err(FsError::BadPath);
        }
        let mut cur = start;
        let mut rest = path;
        while !rest.is_empty() {
            let (seg, tail) = match rest.find('/') {
                Some(i) => (&rest[..i], &rest[i + 1..]),
                None => (rest, ""),
            };
            if seg.is_empty() || seg.len() >= MAX_NAME_LEN {
                return Err(FsError::BadPath);
            }
            cur = match self.find_subdir(cur, seg) {
                Some(next) => next,
                None => self.mkdir(cur, seg)?,
            };
            rest = tail;
        }
        Ok(cur)
    }

    pub fn rmdir(&mut self, parent: DirId, name: &str) -> Result<(), FsError> {
        let p = &self.dirs[parent];
        let pos = p.subdirs[..p.subdir_count]
            .iter()
            .position(|&d| self.dirs[d].name.as_str() == name)
            .ok_or(FsError::NotFound)?;
        let target = self.dirs[parent].subdirs[pos];
        let t = &self.dirs[target];
        if t.subdir_count > 0 || t.file_count > 0 {
            return Err(FsError::NotEmpty);
        }
        self.dirs[target] = Directory::FREE;
        let p = &mut self.dirs[parent];
        p.subdirs.copy_within(pos + 1..p.subdir_count, pos);
        p.subdir_count -= 1;
        Ok(())
    }

    pub fn touch(&mut self, parent: DirId, name: &str) -> Result<FileId, FsError> {
        validate_name(name)?;
        if self.find_file(parent, name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        if self.dirs[parent].file_count == MAX_FILES {
            return Err(FsError::DirFull);
        }
        let id = (0..MAX_FILES)
            .find(|&i| !self.files[i].used)
            .ok_or(FsError::PoolExhausted)?;
        let file = &mut self.files[id];
        file.used = true;
        file.name.set(name);
        file.size = 0;
        let p = &mut self.dirs[parent];
        p.files[p.file_count] = id;
        p.file_count += 1;
        Ok(id)
    }

    /// Split `path` into a parent directory and a final file name. The
    /// final segment is required, so a trailing slash is an error; the
    /// parent part goes through the ordinary path walk.
    pub fn touch_recursive<'p>(
        &self,
        start: DirId,
        path: &'p str,
    ) -> Result<(DirId, &'p str), FsError> {
        match path.rfind('/') {
            None => Ok((start, path)),
            Some(i) => {
                let name = &path[i + 1..];
                if name.is_empty() {
                    return Err(FsError::BadPath);
                }
                validate_name(name)?;
                let dir_path = if i == 0 { "/" } else { &path[..i] };
                let parent = self.resolve(start, dir_path)?;
                Ok((parent, name))
            }
        }
    }

    pub fn rm(&mut self, parent: DirId, name: &str) -> Result<(), FsError> {
        let p = &self.dirs[parent];
        let pos = p.files[..p.file_count]
            .iter()
            .position(|&f| self.files[f].name.as_str() == name)
            .ok_or(FsError::NotFound)?;
        let target = self.dirs[parent].files[pos];
        let f = &mut self.files[target];
        f.name = Name::EMPTY;
        f.size = 0;
        f.used = false;
        let p = &mut self.dirs[parent];
        p.files.copy_within(pos + 1..p.file_count, pos);
        p.file_count -= 1;
        Ok(())
    }

    /// Move a file reference between directories. The destination is
    /// checked before the source list is touched, so either both lists
    /// change or neither does.
    pub fn mv(&mut self, src: DirId, name: &str, dst: DirId) -> Result<(), FsError> {
        let s = &self.dirs[src];
        let pos = s.files[..s.file_count]
            .iter()
            .position(|&f| self.files[f].name.as_str() == name)
            .ok_or(FsError::NotFound)?;
        if self.dirs[dst].file_count == MAX_FILES {
            return Err(FsError::DirFull);
        }
        let target = self.dirs[src].files[pos];
        let s = &mut self.dirs[src];
        s.files.copy_within(pos + 1..s.file_count, pos);
        s.file_count -= 1;
        let d = &mut self.dirs[dst];
        d.files[d.file_count] = target;
        d.file_count += 1;
        Ok(())
    }

    /// Walk a path. A leading '/' restarts at the root; '.' is a no-op and
    /// '..' steps to the parent (a no-op at the root). Empty segments are
    /// skipped, so `resolve(d, "")` is `d` itself.
    pub fn resolve(&self, start: DirId, path: &str) -> Result<DirId, FsError> {
        let mut cur = if path.starts_with('/') { ROOT } else { start };
        for seg in path.split('/') {
            cur = match seg {
                "" | "." => cur,
                ".." => self.dirs[cur].parent.unwrap_or(cur),
                name => self.find_subdir(cur, name).ok_or(FsError::NotFound)?,
            };
        }
        Ok(cur)
    }

    pub fn count_used_dirs(&self) -> usize {
        (1..=MAX_DIRS).filter(|&i| self.dirs[i].used).count()
    }

    pub fn count_free_dirs(&self) -> usize {
        MAX_DIRS - self.count_used_dirs()
    }

    pub fn count_used_files(&self) -> usize {
        self.files.iter().filter(|f| f.used).count()
    }

    pub fn count_free_files(&self) -> usize {
        MAX_FILES - self.count_used_files()
    }

    pub fn total_file_bytes(&self) -> usize {
        self.files.iter().filter(|f| f.used).map(|f| f.size).sum()
    }
}

static FAT: Mutex<Fat> = Mutex::new(Fat::new());

/// Lock the global filesystem.
pub fn fat() -> spin::MutexGuard<'static, Fat> {
    FAT.lock()
}

/// Set up the root directory; returns whether the filesystem is usable.
pub fn init() -> bool {
    let mut fat = FAT.lock();
    fat.init();
    fat.root_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests share the global pools; serialize them.
    static TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn with_fat<R>(f: impl FnOnce(&mut Fat) -> R) -> R {
        let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let mut fat = super::fat();
        fat.init();
        f(&mut fat)
    }

    #[test]
    fn rejects_bad_names() {
        with_fat(|fat| {
            for name in ["", "   ", "a/b", "/", "0123456789abcdef"] {
                assert_eq!(fat.mkdir(ROOT, name), Err(FsError::InvalidName), "{name:?}");
                assert_eq!(fat.touch(ROOT, name), Err(FsError::InvalidName), "{name:?}");
            }
            // 15 bytes is the longest legal name; a leading space is fine.
            assert!(fat.mkdir(ROOT, "0123456789abcde").is_ok());
            assert!(fat.touch(ROOT, " a").is_ok());
        });
    }

    #[test]
    fn rejects_duplicates() {
        with_fat(|fat| {
            fat.mkdir(ROOT, "a").unwrap();
            assert_eq!(fat.mkdir(ROOT, "a"), Err(FsError::AlreadyExists));
            fat.touch(ROOT, "f").unwrap();
            assert_eq!(fat.touch(ROOT, "f"), Err(FsError::AlreadyExists));
        });
    }

    #[test]
    fn mkdir_sets_parent_links() {
        with_fat(|fat| {
            let a = fat.mkdir(ROOT, "a").unwrap();
            let b = fat.mkdir(a, "b").unwrap();
            assert_eq!(fat.parent(a), Some(ROOT));
            assert_eq!(fat.parent(b), Some(a));
            assert_ne!(a, ROOT);
            for child in fat.subdirs(a).collect::<Vec<_>>() {
                assert_eq!(fat.parent(child), Some(a));
            }
        });
    }

    #[test]
    fn mkdir_recursive_walks_and_creates() {
        with_fat(|fat| {
            let c = fat.mkdir_recursive(ROOT, "a/b/c").unwrap();
            assert_eq!(fat.name(c), "c");
            let b = fat.parent(c).unwrap();
            assert_eq!(fat.name(b), "b");
            // Walking the same path again creates nothing new.
            let used = fat.count_used_dirs();
            assert_eq!(fat.mkdir_recursive(ROOT, "a/b/c").unwrap(), c);
            assert_eq!(fat.count_used_dirs(), used);
            // Empty segments and absolute paths are hard errors.
            assert_eq!(fat.mkdir_recursive(ROOT, "a//b"), Err(FsError::BadPath));
            assert_eq!(fat.mkdir_recursive(ROOT, "/a"), Err(FsError::BadPath));
            assert_eq!(fat.mkdir_recursive(ROOT, ""), Err(FsError::BadPath));
        });
    }

    #[test]
    fn rmdir_requires_empty_target() {
        with_fat(|fat| {
            let b = fat.mkdir_recursive(ROOT, "a/b").unwrap();
            let a = fat.parent(b).unwrap();
            assert_eq!(fat.rmdir(ROOT, "a"), Err(FsError::NotEmpty));
            fat.touch(b, "f").unwrap();
            assert_eq!(fat.rmdir(a, "b"), Err(FsError::NotEmpty));
            fat.rm(b, "f").unwrap();
            fat.rmdir(a, "b").unwrap();
            fat.rmdir(ROOT, "a").unwrap();
            assert_eq!(fat.count_used_dirs(), 0);
        });
    }

    #[test]
    fn mkdir_then_rmdir_restores_free_count() {
        with_fat(|fat| {
            let free = fat.count_free_dirs();
            fat.mkdir(ROOT, "tmp").unwrap();
            assert_eq!(fat.count_free_dirs(), free - 1);
            fat.rmdir(ROOT, "tmp").unwrap();
            assert_eq!(fat.count_free_dirs(), free);
        });
    }

    #[test]
    fn removal_compacts_preserving_order() {
        with_fat(|fat| {
            for name in ["a", "b", "c", "d"] {
                fat.touch(ROOT, name).unwrap();
            }
            fat.rm(ROOT, "b").unwrap();
            let names: Vec<&str> = fat
                .file_ids(ROOT)
                .map(|f| fat.file(f).name())
                .collect();
            assert_eq!(names, ["a", "c", "d"]);
        });
    }

    #[test]
    fn file_pool_exhaustion_and_recovery() {
        with_fat(|fat| {
            let sub = fat.mkdir(ROOT, "sub").unwrap();
            // MAX_FILES fit (spread over two directories, the pool is
            // global); one more does not.
            for i in 0..MAX_FILES - 1 {
                fat.touch(ROOT, &format!("f{i}")).unwrap();
            }
            fat.touch(sub, "last").unwrap();
            assert_eq!(fat.touch(sub, "extra"), Err(FsError::PoolExhausted));
            // Freeing any slot makes the next create succeed.
            fat.rm(ROOT, "f7").unwrap();
            assert!(fat.touch(sub, "extra").is_ok());
        });
    }

    #[test]
    fn dir_pool_exhaustion() {
        with_fat(|fat| {
            let nest = fat.mkdir(ROOT, "n").unwrap();
            for i in 0..MAX_DIRS - 1 {
                fat.mkdir(nest, &format!("d{i}")).unwrap();
            }
            assert_eq!(fat.mkdir(nest, "over"), Err(FsError::PoolExhausted));
            fat.rmdir(nest, "d0").unwrap();
            assert!(fat.mkdir(nest, "over").is_ok());
        });
    }

    #[test]
    fn file_content_round_trip() {
        with_fat(|fat| {
            let id = fat.touch(ROOT, "f").unwrap();
            let file = fat.file_mut(id);
            file.set_content(b"hi");
            assert_eq!(fat.file(id).content(), b"hi");
            let file = fat.file_mut(id);
            file.clear();
            assert!(file.push(b'x'));
            assert_eq!(fat.file(id).content(), b"x");
        });
    }

    #[test]
    fn file_capacity_is_enforced() {
        with_fat(|fat| {
            let id = fat.touch(ROOT, "big").unwrap();
            let file = fat.file_mut(id);
            file.set_content(&vec![7u8; MAX_FILE_SIZE + 100]);
            assert_eq!(file.content().len(), MAX_FILE_SIZE);
            assert!(!file.push(0));
        });
    }

    #[test]
    fn mv_moves_reference_between_lists() {
        with_fat(|fat| {
            let dst = fat.mkdir(ROOT, "dst").unwrap();
            let id = fat.touch(ROOT, "f").unwrap();
            fat.file_mut(id).set_content(b"payload");
            fat.mv(ROOT, "f", dst).unwrap();
            assert!(fat.find_file(ROOT, "f").is_none());
            let moved = fat.find_file(dst, "f").unwrap();
            assert_eq!(moved, id);
            assert_eq!(fat.file(moved).content(), b"payload");
        });
    }

    #[test]
    fn mv_full_destination_leaves_source_intact() {
        with_fat(|fat| {
            for i in 0..MAX_FILES {
                fat.touch(ROOT, &format!("f{i}")).unwrap();
            }
            // The destination list has no room, so the move fails before
            // the source list is touched.
            assert_eq!(fat.mv(ROOT, "f0", ROOT), Err(FsError::DirFull));
            assert!(fat.find_file(ROOT, "f0").is_some());
            assert_eq!(fat.file_ids(ROOT).count(), MAX_FILES);
            assert_eq!(fat.mv(ROOT, "ghost", ROOT), Err(FsError::NotFound));
        });
    }

    #[test]
    fn resolve_handles_dot_dotdot_and_absolute() {
        with_fat(|fat| {
            let c = fat.mkdir_recursive(ROOT, "a/b/c").unwrap();
            let b = fat.parent(c).unwrap();
            let a = fat.parent(b).unwrap();
            assert_eq!(fat.resolve(ROOT, "a/b/c").unwrap(), c);
            assert_eq!(fat.resolve(c, "..").unwrap(), b);
            assert_eq!(fat.resolve(c, "../..").unwrap(), a);
            assert_eq!(fat.resolve(c, ".").unwrap(), c);
            assert_eq!(fat.resolve(c, "/").unwrap(), ROOT);
            assert_eq!(fat.resolve(c, "/a/b").unwrap(), b);
            // '..' at the root stays at the root.
            assert_eq!(fat.resolve(ROOT, "..").unwrap(), ROOT);
            assert_eq!(fat.resolve(ROOT, "missing"), Err(FsError::NotFound));
        });
    }

    #[test]
    fn touch_recursive_splits_parent_and_name() {
        with_fat(|fat| {
            let b = fat.mkdir_recursive(ROOT, "a/b").unwrap();
            assert_eq!(fat.touch_recursive(ROOT, "a/b/f").unwrap(), (b, "f"));
            assert_eq!(fat.touch_recursive(b, "plain").unwrap(), (b, "plain"));
            assert_eq!(fat.touch_recursive(b, "/f").unwrap(), (ROOT, "f"));
            assert_eq!(fat.touch_recursive(ROOT, "a/b/"), Err(FsError::BadPath));
            assert_eq!(fat.touch_recursive(ROOT, "a/missing/f"), Err(FsError::NotFound));
        });
    }

    #[test]
    fn failed_operations_leave_pools_untouched() {
        with_fat(|fat| {
            fat.mkdir(ROOT, "a").unwrap();
            fat.touch(ROOT, "f").unwrap();
            let (dirs, files) = (fat.count_used_dirs(), fat.count_used_files());
            let _ = fat.mkdir(ROOT, "a");
            let _ = fat.touch(ROOT, "f");
            let _ = fat.mkdir(ROOT, "");
            let _ = fat.rmdir(ROOT, "nope");
            let _ = fat.rm(ROOT, "nope");
            assert_eq!(fat.count_used_dirs(), dirs);
            assert_eq!(fat.count_used_files(), files);
        });
    }
}
