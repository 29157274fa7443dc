use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;

use crate::models::{Dependency, Project};

/// Analyzer for pip `requirements.txt` files.
///
/// Only pinned `name==version` lines are reported; ranges, options (`-r`,
/// `-e`, ...) and comments are skipped.
pub struct PypiAnalyzer;

impl PypiAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for PypiAnalyzer {
    fn analyze(&self, path: &Path) -> Result<Vec<Project>> {
        let dependencies = parse_requirements_txt(path)?;
        Ok(vec![Project {
            name: None,
            dependencies,
        }])
    }
}

/// Parse `requirements.txt`: `name==version` lines, environment markers ignored.
fn parse_requirements_txt(path: &Path) -> Result<Vec<Dependency>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let re = Regex::new(r"^([A-Za-z0-9_\-\.]+)(?:\[[^\]]*\])?\s*==\s*([^\s;#]+)")?;
    let mut deps = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
            continue;
        }
        if let Some(caps) = re.captures(line) {
            deps.push(Dependency::new(&caps[1], &caps[2]));
        }
    }

    Ok(deps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_requirements_txt() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "# comment").unwrap();
        writeln!(f, "-r base.txt").unwrap();
        writeln!(f, "requests==2.28.1").unwrap();
        writeln!(f, "flask>=2.0.0").unwrap();
        writeln!(f, "numpy==1.24.0 ; python_version >= '3.8'").unwrap();
        writeln!(f, "uvicorn[standard]==0.23.2  # server").unwrap();

        let deps = parse_requirements_txt(f.path()).unwrap();
        assert_eq!(
            deps,
            vec![
                Dependency::new("requests", "2.28.1"),
                Dependency::new("numpy", "1.24.0"),
                Dependency::new("uvicorn", "0.23.2"),
            ]
        );
    }

    #[test]
    fn test_single_unnamed_project() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "requests==2.28.1").unwrap();

        let projects = PypiAnalyzer::new().analyze(f.path()).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, None);
    }
}
