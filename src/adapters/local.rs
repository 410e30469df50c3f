use crate::domain::ports::{CorpusDocument, RuleSource};
use crate::utils::error::{ReliefError, Result};
use std::path::{Path, PathBuf};

pub const DEFAULT_RULE_FILE_SUFFIX: &str = "_rules.json";

/// Rule corpus stored as one JSON array per category, e.g.
/// `data/tax_rules/hospitality_rules.json`. Files are read in name order.
#[derive(Debug, Clone)]
pub struct LocalRuleDirectory {
    directory: PathBuf,
    suffix: String,
}

impl LocalRuleDirectory {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self::with_suffix(directory, DEFAULT_RULE_FILE_SUFFIX)
    }

    pub fn with_suffix(directory: impl Into<PathBuf>, suffix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            suffix: suffix.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn unreadable(&self, source: std::io::Error) -> ReliefError {
        ReliefError::CorpusUnreadable {
            location: self.directory.display().to_string(),
            source,
        }
    }

    async fn rule_files(&self) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.directory)
            .await
            .map_err(|e| self.unreadable(e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| self.unreadable(e))? {
            let path = entry.path();
            let matches_suffix = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(&self.suffix));
            if matches_suffix && path.is_file() {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}

impl RuleSource for LocalRuleDirectory {
    fn location(&self) -> String {
        self.directory.display().to_string()
    }

    async fn read_documents(&self) -> Result<Vec<CorpusDocument>> {
        let files = self.rule_files().await?;
        if files.is_empty() {
            tracing::warn!(
                "No '*{}' files found in {}",
                self.suffix,
                self.directory.display()
            );
        }

        let mut documents = Vec::with_capacity(files.len());
        for path in files {
            let data = tokio::fs::read(&path).await.map_err(|e| ReliefError::CorpusUnreadable {
                location: path.display().to_string(),
                source: e,
            })?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            documents.push(CorpusDocument { name, data });
        }

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_matching_files_in_name_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("medical_rules.json"), "[]").unwrap();
        std::fs::write(dir.path().join("construction_rules.json"), "[]").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::create_dir(dir.path().join("nested_rules.json")).unwrap();

        let source = LocalRuleDirectory::new(dir.path());
        let documents = source.read_documents().await.unwrap();

        let names: Vec<&str> = documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["construction_rules.json", "medical_rules.json"]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_unreadable() {
        let source = LocalRuleDirectory::new("/definitely/not/here");
        let err = source.read_documents().await.unwrap_err();
        assert!(matches!(err, ReliefError::CorpusUnreadable { .. }));
    }

    #[tokio::test]
    async fn test_custom_suffix() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rules"), "[]").unwrap();
        std::fs::write(dir.path().join("b_rules.json"), "[]").unwrap();

        let source = LocalRuleDirectory::with_suffix(dir.path(), ".rules");
        let documents = source.read_documents().await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].name, "a.rules");
    }
}
