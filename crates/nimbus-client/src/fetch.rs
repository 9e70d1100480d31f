use crate::error::Result;
use async_trait::async_trait;
use nimbus_core::model::AuthToken;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// A local file owned by a single task invocation. The file is removed when
/// the value is dropped, whichever way the invocation ends.
#[derive(Debug)]
pub struct ScopedFile {
    file: NamedTempFile,
}

impl ScopedFile {
    pub fn with_contents(prefix: &str, contents: &[u8]) -> Result<Self> {
        let mut file = tempfile::Builder::new().prefix(prefix).tempfile()?;
        file.write_all(contents)?;
        file.flush()?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn file_name(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Fetched cluster configuration, materialised as a scoped file.
pub type ConfigDocument = ScopedFile;

#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch(&self, url: &str, token: &AuthToken) -> Result<ConfigDocument>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_file_holds_contents() {
        let file = ScopedFile::with_contents("nimbus-test-", b"[global]\n").unwrap();
        assert_eq!(fs_err::read_to_string(file.path()).unwrap(), "[global]\n");
        assert!(file.file_name().starts_with("nimbus-test-"));
    }

    #[test]
    fn test_scoped_file_removed_on_drop() {
        let file = ScopedFile::with_contents("nimbus-test-", b"x").unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists());
        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn test_scoped_file_removed_on_early_return() {
        fn fails(path_out: &mut Option<std::path::PathBuf>) -> Result<()> {
            let file = ScopedFile::with_contents("nimbus-test-", b"x")?;
            *path_out = Some(file.path().to_path_buf());
            Err(crate::ClientError::Provider("boom".to_string()))
        }

        let mut seen = None;
        assert!(fails(&mut seen).is_err());
        assert!(!seen.unwrap().exists());
    }
}
