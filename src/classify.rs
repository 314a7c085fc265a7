// urraca is a disk intelligence and cleanup tool
// Copyright (C) 2025  Javier Lancha Vázquez <javier.lancha@gmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
    str::FromStr,
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Broad file categories used for type distribution and risk assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Media,
    Code,
    Archives,
    Documents,
    Logs,
    System,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Media => "media",
            Category::Code => "code",
            Category::Archives => "archives",
            Category::Documents => "documents",
            Category::Logs => "logs",
            Category::System => "system",
            Category::Other => "other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "media" => Ok(Category::Media),
            "code" => Ok(Category::Code),
            "archives" => Ok(Category::Archives),
            "documents" => Ok(Category::Documents),
            "logs" => Ok(Category::Logs),
            "system" => Ok(Category::System),
            "other" => Ok(Category::Other),
            other => bail!("Unknown category '{other}'"),
        }
    }
}

const CACHE_MARKERS: [&str; 3] = ["/cache/", "/tmp/", "/var/tmp/"];
const SYSTEM_PREFIXES: [&str; 5] = ["/etc/", "/usr/", "/var/lib/", "/bin/", "/sbin/"];

/// Classifies files into broad categories from their extension and path,
/// with user-extendable extension rules.
#[derive(Debug, Clone)]
pub struct FileClassifier {
    rules: BTreeMap<Category, BTreeSet<String>>,
}

impl FileClassifier {
    pub fn new() -> Self {
        let mut rules: BTreeMap<Category, BTreeSet<String>> = BTreeMap::new();

        let table: [(Category, &[&str]); 6] = [
            (
                Category::Media,
                &[
                    ".mp3", ".wav", ".flac", ".aac", ".mp4", ".mkv", ".avi", ".mov", ".jpg",
                    ".jpeg", ".png", ".gif", ".webp", ".svg",
                ],
            ),
            (
                Category::Code,
                &[
                    ".py", ".js", ".ts", ".tsx", ".jsx", ".java", ".kt", ".c", ".cpp", ".h",
                    ".hpp", ".go", ".rs", ".rb", ".php", ".swift", ".sh", ".sql",
                ],
            ),
            (
                Category::Archives,
                &[".zip", ".tar", ".gz", ".bz2", ".xz", ".7z", ".rar", ".iso"],
            ),
            (
                Category::Documents,
                &[
                    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".txt", ".md",
                    ".rtf", ".odt",
                ],
            ),
            (Category::Logs, &[".log", ".trace", ".out", ".err"]),
            (
                Category::System,
                &[".so", ".dll", ".sys", ".ko", ".conf", ".service"],
            ),
        ];

        for (category, extensions) in table {
            rules.insert(
                category,
                extensions.iter().map(|e| e.to_string()).collect(),
            );
        }

        Self { rules }
    }

    /// Build a classifier with a user rule file merged over the defaults.
    /// The file is a JSON object `{category: [extensions]}`.
    pub fn with_rule_file(rule_file: &Path) -> Result<Self> {
        let mut classifier = Self::new();

        let text = std::fs::read_to_string(rule_file)
            .with_context(|| format!("Could not read rule file '{}'", rule_file.display()))?;
        let custom: BTreeMap<String, Vec<String>> = serde_json::from_str(&text)
            .with_context(|| format!("Invalid classification rules in '{}'", rule_file.display()))?;

        for (name, extensions) in custom {
            let category = Category::from_str(&name)
                .with_context(|| format!("Invalid category in '{}'", rule_file.display()))?;
            classifier
                .rules
                .entry(category)
                .or_default()
                .extend(extensions.into_iter().map(|e| e.to_lowercase()));
        }

        Ok(classifier)
    }

    /// Classify a file. Cache/temp path markers override the extension
    /// table; system path prefixes catch what the table missed.
    pub fn classify(&self, path: &Path, extension: &str) -> Category {
        let path_lower = path.to_string_lossy().to_lowercase();
        let ext = extension.to_lowercase();

        if CACHE_MARKERS.iter().any(|m| path_lower.contains(m)) {
            let is_log = self
                .rules
                .get(&Category::Logs)
                .is_some_and(|exts| exts.contains(&ext));
            return if is_log { Category::Logs } else { Category::Other };
        }

        for (category, extensions) in &self.rules {
            if extensions.contains(&ext) {
                return *category;
            }
        }

        if SYSTEM_PREFIXES.iter().any(|p| path_lower.starts_with(p)) {
            return Category::System;
        }

        Category::Other
    }
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_extension() {
        let classifier = FileClassifier::new();
        assert_eq!(
            classifier.classify(Path::new("/home/u/song.mp3"), ".mp3"),
            Category::Media
        );
        assert_eq!(
            classifier.classify(Path::new("/home/u/main.rs"), ".rs"),
            Category::Code
        );
        assert_eq!(
            classifier.classify(Path::new("/home/u/app.log"), ".log"),
            Category::Logs
        );
        assert_eq!(
            classifier.classify(Path::new("/home/u/data.bin"), ".bin"),
            Category::Other
        );
    }

    #[test]
    fn test_cache_markers_override_extension() {
        let classifier = FileClassifier::new();
        assert_eq!(
            classifier.classify(Path::new("/tmp/build/song.mp3"), ".mp3"),
            Category::Other
        );
        assert_eq!(
            classifier.classify(Path::new("/home/u/.config/cache/x.log"), ".log"),
            Category::Logs
        );
    }

    #[test]
    fn test_system_prefix_fallback() {
        let classifier = FileClassifier::new();
        assert_eq!(
            classifier.classify(Path::new("/etc/hosts"), ""),
            Category::System
        );
        assert_eq!(
            classifier.classify(Path::new("/usr/share/misc/magic"), ""),
            Category::System
        );
    }

    #[test]
    fn test_custom_rules_merge() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let rule_file = dir.path().join("rules.json");
        std::fs::write(&rule_file, r#"{"media": [".heic"], "archives": [".PKG"]}"#)?;

        let classifier = FileClassifier::with_rule_file(&rule_file)?;
        assert_eq!(
            classifier.classify(Path::new("/home/u/img.heic"), ".heic"),
            Category::Media
        );
        assert_eq!(
            classifier.classify(Path::new("/home/u/tool.pkg"), ".pkg"),
            Category::Archives
        );
        Ok(())
    }

    #[test]
    fn test_unknown_rule_category_is_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let rule_file = dir.path().join("rules.json");
        std::fs::write(&rule_file, r#"{"warez": [".nfo"]}"#)?;

        assert!(FileClassifier::with_rule_file(&rule_file).is_err());
        Ok(())
    }
}
