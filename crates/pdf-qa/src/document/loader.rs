use crate::utils::error::PipelineError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct DocumentLoader;

impl DocumentLoader {
    /// List documents directly inside `dir` (no recursion), sorted by file name.
    ///
    /// Only files whose extension is in `extensions` are returned. An
    /// unreadable directory is a configuration error.
    pub fn discover(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, PipelineError> {
        let entries = fs::read_dir(dir).map_err(|e| {
            PipelineError::Config(format!("Cannot read source directory {:?}: {}", dir, e))
        })?;

        let documents = Self::select(entries.map(|entry| entry.map(|e| e.path())), extensions);

        debug!("Discovered {} documents in {:?}", documents.len(), dir);

        Ok(documents)
    }

    /// Keep supported regular files, sorted by file name. Unreadable entries
    /// are logged and skipped.
    fn select(
        entries: impl Iterator<Item = io::Result<PathBuf>>,
        extensions: &[String],
    ) -> Vec<PathBuf> {
        let mut documents = Vec::new();

        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };

            if !path.is_file() {
                continue;
            }

            if Self::is_supported(&path, extensions) {
                documents.push(path);
            } else {
                debug!("Ignoring unsupported file: {:?}", path);
            }
        }

        documents.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        documents
    }

    /// Check the file extension (case-insensitive) against the allowed list
    pub fn is_supported(path: &Path, extensions: &[String]) -> bool {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match extension {
            Some(ext) => extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&ext)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_only() -> Vec<String> {
        vec!["pdf".to_string()]
    }

    #[test]
    fn discovers_only_recognized_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "A.PDF", "notes.txt", "README", "c.pdf"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.pdf")).unwrap();
        fs::write(dir.path().join("nested.pdf").join("inner.pdf"), b"x").unwrap();

        let found = DocumentLoader::discover(dir.path(), &pdf_only()).unwrap();
        let names: Vec<String> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();

        assert_eq!(names, vec!["A.PDF", "b.pdf", "c.pdf"]);
    }

    #[test]
    fn unreadable_entry_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("report.pdf");
        fs::write(&good, b"x").unwrap();

        let entries = vec![
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
            Ok(good.clone()),
        ];

        let found = DocumentLoader::select(entries.into_iter(), &pdf_only());
        assert_eq!(found, vec![good]);
    }

    #[test]
    fn empty_directory_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DocumentLoader::discover(dir.path(), &pdf_only()).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_a_config_error() {
        let result = DocumentLoader::discover(Path::new("/no/such/dir"), &pdf_only());
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn extension_check_honours_configured_list() {
        let both = vec!["pdf".to_string(), "txt".to_string()];
        assert!(DocumentLoader::is_supported(Path::new("x.txt"), &both));
        assert!(!DocumentLoader::is_supported(Path::new("x.txt"), &pdf_only()));
        assert!(!DocumentLoader::is_supported(Path::new("pdf"), &pdf_only()));
    }
}
