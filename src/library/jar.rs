//! Library over a jar (zip) archive.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use zip::ZipArchive;

use super::{Library, NameSet, class_name_of_path};
use crate::class::{ClassNode, classfile};
use crate::error::SessionError;

pub struct JarLibrary {
    path: PathBuf,
    label: String,
    archive: Mutex<ZipArchive<File>>,
    content: OnceLock<NameSet>,
}

impl JarLibrary {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| SessionError::io(&path, e))?;
        let archive = ZipArchive::new(file).map_err(|e| SessionError::Archive {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let label = format!("jar:{}", path.display());
        Ok(Self {
            path,
            label,
            archive: Mutex::new(archive),
            content: OnceLock::new(),
        })
    }

    fn read_entry(&self, entry: &str) -> Result<Vec<u8>, String> {
        let mut archive = self.archive.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = archive.by_name(entry).map_err(|e| e.to_string())?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;
        Ok(bytes)
    }
}

impl Library for JarLibrary {
    fn name(&self) -> &str {
        &self.label
    }

    fn content(&self) -> &NameSet {
        self.content.get_or_init(|| {
            let archive = self.archive.lock().unwrap_or_else(PoisonError::into_inner);
            let names: NameSet = archive.file_names().filter_map(class_name_of_path).collect();
            tracing::debug!(jar = %self.path.display(), classes = names.len(), "indexed archive");
            names
        })
    }

    fn get(&self, name: &str) -> Option<Arc<ClassNode>> {
        if !self.content().contains(name) {
            return None;
        }
        let entry = format!("{name}.class");
        let bytes = match self.read_entry(&entry) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(jar = %self.path.display(), entry = %entry, error = %err, "cannot read archive entry");
                return None;
            }
        };
        match classfile::parse(&bytes) {
            Ok(node) => Some(Arc::new(node)),
            Err(err) => {
                tracing::warn!(jar = %self.path.display(), entry = %entry, error = %err, "malformed class file");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassBuilder;
    use crate::class::classfile::test_support::write_class;
    use lava_core::access::ACC_PUBLIC;
    use std::io::Write;

    #[test]
    fn test_reads_classes_from_archive() {
        let dir = tempfile::tempdir().unwrap();
        let jar_path = dir.path().join("lib.jar");
        let node = ClassBuilder::new("p/A", ACC_PUBLIC).interfaces(&["java/io/Serializable"]).build().unwrap();
        {
            let mut zip = zip::ZipWriter::new(File::create(&jar_path).unwrap());
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("p/A.class", options).unwrap();
            zip.write_all(&write_class(&node)).unwrap();
            zip.start_file("META-INF/MANIFEST.MF", options).unwrap();
            zip.write_all(b"Manifest-Version: 1.0\n").unwrap();
            zip.finish().unwrap();
        }

        let lib = JarLibrary::open(&jar_path).unwrap();
        assert_eq!(lib.content().len(), 1);
        assert_eq!(lib.get("p/A").unwrap().interfaces, vec!["java/io/Serializable".to_string()]);
        assert!(lib.get("p/B").is_none());
    }

    #[test]
    fn test_not_an_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jar");
        std::fs::write(&path, b"not a zip").unwrap();
        assert!(matches!(JarLibrary::open(&path), Err(SessionError::Archive { .. })));
    }
}
