//! File-based dependency resolution, one analyzer per ecosystem.
//!
//! The batch core only depends on [`Resolver`]; [`ManifestResolver`] is the
//! implementation the binary uses.

use std::path::Path;

use anyhow::Result;

use crate::models::{Ecosystem, Project};

pub mod npm;
pub mod nuget;
pub mod pypi;

/// Resolve the projects (and their dependencies) described by a source file.
pub trait Resolver {
    fn resolve(&self, path: &Path, ecosystem: Ecosystem) -> Result<Vec<Project>>;
}

pub trait Analyzer {
    fn analyze(&self, path: &Path) -> Result<Vec<Project>>;
}

/// Dispatches to the analyzer for the requested ecosystem.
#[derive(Debug, Default)]
pub struct ManifestResolver;

impl Resolver for ManifestResolver {
    fn resolve(&self, path: &Path, ecosystem: Ecosystem) -> Result<Vec<Project>> {
        tracing::debug!(path = %path.display(), %ecosystem, "resolving dependencies");
        match ecosystem {
            Ecosystem::NuGet => nuget::NuGetAnalyzer::new().analyze(path),
            Ecosystem::Npm => npm::NpmAnalyzer::new().analyze(path),
            Ecosystem::PyPi => pypi::PypiAnalyzer::new().analyze(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let resolver = ManifestResolver;
        for (name, eco) in [
            ("App.csproj", Ecosystem::NuGet),
            ("package.json", Ecosystem::Npm),
            ("requirements.txt", Ecosystem::PyPi),
        ] {
            assert!(resolver.resolve(&dir.path().join(name), eco).is_err(), "{name}");
        }
    }

    #[test]
    fn test_dispatches_by_ecosystem() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("requirements.txt");
        std::fs::write(&path, "requests==2.28.1\n").unwrap();

        let projects = ManifestResolver.resolve(&path, Ecosystem::PyPi).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].dependencies[0].name, "requests");
    }
}
