use std::path::{Path, PathBuf};

/// Hands out indexed file names under a prefix: `{prefix}_{index}.{extension}`.
///
/// A returned path never exists on disk at the time it is returned, and indices strictly
/// increase for the lifetime of the allocator, even when a returned path is never written.
#[derive(Debug, Clone)]
pub struct TraceFileAllocator {
    prefix: PathBuf,
    extension: String,
    next_index: u64,
}

impl TraceFileAllocator {
    pub fn new(prefix: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        TraceFileAllocator {
            prefix: prefix.into(),
            extension: extension.into(),
            next_index: 0,
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    fn path_for(&self, index: u64) -> PathBuf {
        let mut name = self.prefix.clone().into_os_string();
        name.push(format!("_{index}.{}", self.extension));
        PathBuf::from(name)
    }

    /// Next unused path under the prefix.
    pub fn next_path(&mut self) -> PathBuf {
        loop {
            let path = self.path_for(self.next_index);
            self.next_index += 1;
            if !path.exists() {
                return path;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_existing_files_and_never_repeats() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("match");
        std::fs::write(dir.path().join("match_0.json"), "{}").unwrap();
        std::fs::write(dir.path().join("match_2.json"), "{}").unwrap();

        let mut allocator = TraceFileAllocator::new(&prefix, "json");
        let first = allocator.next_path();
        assert_eq!(first, dir.path().join("match_1.json"));
        // not written: the index is still consumed
        let second = allocator.next_path();
        assert_eq!(second, dir.path().join("match_3.json"));
        for _ in 0..5 {
            assert!(!allocator.next_path().exists());
        }
    }
}
