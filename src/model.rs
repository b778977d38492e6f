//! Core data types shared by the batcher, the completion pipeline and the report.
//!
//! Everything here is an immutable snapshot once constructed. Project
//! descriptors and file records come from outside this crate (project
//! discovery and file classification); findings are produced only by the
//! result parser.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Build system detected for a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystem {
    Cmake,
    Meson,
    Bazel,
    Makefile,
    Vcxproj,
    #[default]
    Unknown,
}

impl BuildSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildSystem::Cmake => "cmake",
            BuildSystem::Meson => "meson",
            BuildSystem::Bazel => "bazel",
            BuildSystem::Makefile => "makefile",
            BuildSystem::Vcxproj => "vcxproj",
            BuildSystem::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BuildSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A third-party dependency referenced by the build files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl DependencyRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Snapshot of the project being audited, as produced by project discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDescriptor {
    pub name: String,
    pub root: PathBuf,
    /// Free-form language standard label, e.g. "C++17" or "unknown"
    pub standard: String,
    pub build_system: BuildSystem,
    #[serde(default)]
    pub dependencies: Vec<DependencyRef>,
}

impl ProjectDescriptor {
    pub fn dependency_names(&self) -> Vec<&str> {
        self.dependencies.iter().map(|d| d.name.as_str()).collect()
    }
}

/// Classification tag attached to every source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Header,
    Implementation,
    /// Translation unit containing `main`
    #[serde(rename = "main")]
    EntryPoint,
    Test,
    Concurrency,
    Allocator,
    Template,
    Utility,
    Other,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Header => "header",
            FileCategory::Implementation => "implementation",
            FileCategory::EntryPoint => "main",
            FileCategory::Test => "test",
            FileCategory::Concurrency => "concurrency",
            FileCategory::Allocator => "allocator",
            FileCategory::Template => "template",
            FileCategory::Utility => "utility",
            FileCategory::Other => "other",
        }
    }

    /// Analysis priority; lower values are analyzed first.
    ///
    /// Concurrency and allocator code carries the most risk, so it lands in
    /// the earliest batches.
    pub fn priority(&self) -> u8 {
        match self {
            FileCategory::Concurrency => 0,
            FileCategory::Allocator => 1,
            FileCategory::Implementation => 2,
            FileCategory::Header => 3,
            FileCategory::EntryPoint => 4,
            FileCategory::Template => 5,
            FileCategory::Utility => 6,
            FileCategory::Test => 7,
            FileCategory::Other => 8,
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified source file with its full content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub path: PathBuf,
    pub relative_path: String,
    pub category: FileCategory,
    pub content: String,
    pub line_count: usize,
}

impl SourceFile {
    pub fn new(
        path: impl Into<PathBuf>,
        relative_path: impl Into<String>,
        category: FileCategory,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        let line_count = content.split('\n').count();
        Self {
            path: path.into(),
            relative_path: relative_path.into(),
            category,
            content,
            line_count,
        }
    }

    /// Size counted against the batch budget
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Stable sort by category priority, preserving discovery order within a category.
pub fn sort_by_priority(files: &mut [SourceFile]) {
    files.sort_by_key(|f| f.category.priority());
}

/// Severity of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    #[default]
    Suggestion,
    /// A positive pattern worth keeping
    Good,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::Warning,
        Severity::Suggestion,
        Severity::Good,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Suggestion => "suggestion",
            Severity::Good => "good",
        }
    }

    /// Exact tag match; anything else is `None`.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "critical" => Some(Severity::Critical),
            "warning" => Some(Severity::Warning),
            "suggestion" => Some(Severity::Suggestion),
            "good" => Some(Severity::Good),
            _ => None,
        }
    }

    /// Ordering used by severity filters: critical is 0, good is 3.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::Warning => 1,
            Severity::Suggestion => 2,
            Severity::Good => 3,
        }
    }

    /// Points subtracted from the health score per finding
    pub fn penalty(&self) -> i64 {
        match self {
            Severity::Critical => 15,
            Severity::Warning => 5,
            Severity::Suggestion => 1,
            Severity::Good => 0,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single audit finding decoded from model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub severity: Severity,
    pub category: String,
    pub title: String,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
    /// Attribution such as "C++ Core Guidelines R.11"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_file_counts_lines() {
        let file = SourceFile::new("/p/a.cpp", "a.cpp", FileCategory::Implementation, "a\nb\nc");
        assert_eq!(file.line_count, 3);
        assert_eq!(file.size(), 5);

        let empty = SourceFile::new("/p/e.h", "e.h", FileCategory::Header, "");
        assert_eq!(empty.line_count, 1);
    }

    #[test]
    fn test_sort_by_priority_is_stable() {
        let mut files = vec![
            SourceFile::new("/p/t.cpp", "t.cpp", FileCategory::Test, ""),
            SourceFile::new("/p/a.cpp", "a.cpp", FileCategory::Implementation, ""),
            SourceFile::new("/p/pool.cpp", "pool.cpp", FileCategory::Allocator, ""),
            SourceFile::new("/p/b.cpp", "b.cpp", FileCategory::Implementation, ""),
            SourceFile::new("/p/th.cpp", "th.cpp", FileCategory::Concurrency, ""),
        ];
        sort_by_priority(&mut files);
        let order: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(order, vec!["th.cpp", "pool.cpp", "a.cpp", "b.cpp", "t.cpp"]);
    }

    #[test]
    fn test_severity_parse_is_exact() {
        assert_eq!(Severity::parse("critical"), Some(Severity::Critical));
        assert_eq!(Severity::parse("good"), Some(Severity::Good));
        assert_eq!(Severity::parse("Critical"), None);
        assert_eq!(Severity::parse("bogus"), None);
    }

    #[test]
    fn test_finding_serializes_camel_case_and_skips_absent_fields() {
        let finding = Finding {
            severity: Severity::Warning,
            category: "performance".to_string(),
            title: "Copy in range-for".to_string(),
            file: "src/a.cpp".to_string(),
            line: None,
            description: String::new(),
            code_snippet: Some("for (auto x : v)".to_string()),
            fix: None,
            source: None,
        };
        let value = serde_json::to_value(&finding).unwrap();
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["codeSnippet"], "for (auto x : v)");
        assert!(value.get("line").is_none());
        assert!(value.get("fix").is_none());
    }

    #[test]
    fn test_category_serializes_entry_point_as_main() {
        let json = serde_json::to_string(&FileCategory::EntryPoint).unwrap();
        assert_eq!(json, "\"main\"");
        assert_eq!(FileCategory::EntryPoint.to_string(), "main");
    }
}
