//! Expansion of the `--input` specification into concrete file paths.
//!
//! - no `*`: the literal path, untouched by the filesystem
//! - `root/**/pattern`: every file under `root` (recursively) matching
//!   `pattern`; a pattern with directory parts (`src/*.csproj`) matches the
//!   trailing components of the path below `root`
//! - `root/*suffix`: immediate children of `root` whose name ends in `suffix`
//!
//! An empty file-name part falls back to the configured default pattern, and
//! an empty root to the working directory. Symlinks are followed.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf, MAIN_SEPARATOR, MAIN_SEPARATOR_STR};

use colored::Colorize;
use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;

use crate::error::{ScanError, ScanResult};

/// Ordered, duplicate-free set of input paths.
///
/// Paths are ordered and deduplicated case-insensitively.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolvedInputs {
    paths: BTreeMap<String, PathBuf>,
}

impl ResolvedInputs {
    fn insert(&mut self, path: PathBuf) {
        let key = path.to_string_lossy().to_lowercase();
        self.paths.entry(key).or_insert(path);
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.values().map(PathBuf::as_path)
    }
}

/// Wildcard pattern supporting `*` and `?`, matched case-insensitively.
#[derive(Debug)]
pub struct FilePattern {
    matcher: GlobMatcher,
    /// Pattern has directory parts and is matched against a relative path.
    nested: bool,
}

impl FilePattern {
    pub fn new(pattern: &str) -> ScanResult<Self> {
        let mut glob = String::with_capacity(pattern.len());
        for c in pattern.chars() {
            match c {
                '\\' | '/' => glob.push('/'),
                // Only `*` and `?` are wildcards; bracket the rest of the glob syntax.
                '[' | ']' | '{' | '}' => {
                    glob.push('[');
                    glob.push(c);
                    glob.push(']');
                }
                _ => glob.push(c),
            }
        }
        let nested = glob.contains('/');
        if nested {
            glob.insert_str(0, "**/");
        }

        let matcher = GlobBuilder::new(&glob)
            .case_insensitive(true)
            .literal_separator(true)
            .build()
            .map_err(|source| ScanError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?
            .compile_matcher();

        Ok(Self { matcher, nested })
    }

    /// Match a path relative to the search root.
    pub fn matches(&self, relative: &Path) -> bool {
        if self.nested {
            return self.matcher.is_match(relative);
        }
        relative
            .file_name()
            .is_some_and(|name| self.matcher.is_match(name))
    }
}

#[derive(Debug, PartialEq, Eq)]
struct SearchPlan {
    root: PathBuf,
    pattern: String,
    recursive: bool,
}

impl fmt::Display for SearchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}   '{}'", "folder:".dimmed(), self.root.display())?;
        write!(f, "{} '{}'", "fileSpec:".dimmed(), self.pattern)
    }
}

fn plan_search(spec: &str, default_pattern: &str, working_dir: &Path) -> SearchPlan {
    let (root, pattern, recursive) = if let Some((left, right)) = spec.split_once("**") {
        let pattern = right.trim_matches(MAIN_SEPARATOR);
        let pattern = if pattern.trim().is_empty() {
            default_pattern.to_string()
        } else {
            pattern.to_string()
        };
        (left, pattern, true)
    } else {
        let first = spec.find('*').unwrap_or(spec.len());
        let last = spec.rfind('*').map_or(spec.len(), |i| i + 1);
        let suffix = spec[last..].trim_matches(MAIN_SEPARATOR);
        let pattern = if suffix.trim().is_empty() {
            default_pattern.to_string()
        } else {
            format!("*{}", suffix)
        };
        (&spec[..first], pattern, false)
    };

    let root = root.trim_end_matches(MAIN_SEPARATOR);
    let root = if root.trim().is_empty() {
        working_dir.to_path_buf()
    } else {
        PathBuf::from(root)
    };

    SearchPlan {
        root,
        pattern,
        recursive,
    }
}

/// Expand an input specification into the set of files to process.
pub fn resolve_inputs(
    spec: &str,
    default_pattern: &str,
    working_dir: &Path,
) -> ScanResult<ResolvedInputs> {
    let spec = spec.replace(['/', '\\'], MAIN_SEPARATOR_STR);
    let mut inputs = ResolvedInputs::default();

    if !spec.contains('*') {
        inputs.insert(PathBuf::from(spec));
        return Ok(inputs);
    }

    let plan = plan_search(&spec, default_pattern, working_dir);
    println!("{}", plan);
    tracing::info!(
        root = %plan.root.display(),
        pattern = %plan.pattern,
        recursive = plan.recursive,
        "expanding input pattern"
    );

    let pattern = FilePattern::new(&plan.pattern)?;
    std::fs::read_dir(&plan.root).map_err(|source| ScanError::InvalidSearchRoot {
        root: plan.root.clone(),
        source,
    })?;

    let walker = WalkDir::new(&plan.root)
        .follow_links(true)
        .sort_by_file_name()
        .max_depth(if plan.recursive { usize::MAX } else { 1 });

    for entry in walker {
        let entry = entry.map_err(|e| ScanError::InvalidSearchRoot {
            root: e.path().map_or_else(|| plan.root.clone(), Path::to_path_buf),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(&plan.root).unwrap_or(entry.path());
        if pattern.matches(relative) {
            inputs.insert(entry.into_path());
        }
    }

    tracing::debug!(count = inputs.len(), "input pattern expanded");
    Ok(inputs)
}
