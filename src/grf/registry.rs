use std::ops::{Index, IndexMut};

use indexmap::IndexMap;

use crate::grf::file::GrfFile;

/// Every file context of the current content set, in first-seen order.
#[derive(Debug, Default)]
pub struct Registry {
    files: IndexMap<String, GrfFile>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Index of the context for `filename`, creating one if needed. A file
    /// whose identifier matches an existing context shares that context.
    pub fn init_file(&mut self, filename: &str, grfid: u32) -> usize {
        if let Some(index) = self.files.get_index_of(filename) {
            return index;
        }
        if grfid != 0 {
            if let Some(index) = self.index_of_grfid(grfid) {
                return index;
            }
        }
        let (index, _) = self.files.insert_full(filename.to_string(), GrfFile::new(filename));
        index
    }

    pub fn get(&self, index: usize) -> Option<&GrfFile> {
        self.files.get_index(index).map(|(_, f)| f)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut GrfFile> {
        self.files.get_index_mut(index).map(|(_, f)| f)
    }

    pub fn get_by_filename(&self, filename: &str) -> Option<&GrfFile> {
        self.files.get(filename)
    }

    pub fn index_of_grfid(&self, grfid: u32) -> Option<usize> {
        self.files.values().position(|f| f.grfid == grfid)
    }

    pub fn get_by_grfid(&self, grfid: u32) -> Option<&GrfFile> {
        self.files.values().find(|f| f.grfid == grfid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GrfFile> {
        self.files.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut GrfFile> {
        self.files.values_mut()
    }

    /// Drop per-session data of every file, keeping specs.
    pub fn begin_session(&mut self) {
        for file in self.files.values_mut() {
            file.begin_session();
        }
    }

    /// Forget every file, including persistent specs.
    pub fn reset_all(&mut self) {
        self.files.clear();
    }
}

impl Index<usize> for Registry {
    type Output = GrfFile;

    fn index(&self, index: usize) -> &GrfFile {
        &self.files[index]
    }
}

impl IndexMut<usize> for Registry {
    fn index_mut(&mut self, index: usize) -> &mut GrfFile {
        &mut self.files[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_file_reuses_context() {
        let mut reg = Registry::new();
        let a = reg.init_file("a.grf", 0);
        let b = reg.init_file("b.grf", 0);
        assert_ne!(a, b);
        assert_eq!(reg.init_file("a.grf", 0), a);

        reg.get_mut(b).unwrap().grfid = 0xDEADBEEF;
        assert_eq!(reg.init_file("renamed.grf", 0xDEADBEEF), b);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get_by_grfid(0xDEADBEEF).unwrap().filename, "b.grf");
    }

    #[test]
    fn test_reset_all() {
        let mut reg = Registry::new();
        reg.init_file("a.grf", 0);
        reg.begin_session();
        assert_eq!(reg.len(), 1);
        reg.reset_all();
        assert!(reg.is_empty());
    }
}
