use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::models::{Dependency, Project};

/// Analyzer for npm projects.
///
/// Accepts either `package.json` or `package-lock.json`. Pinned versions from
/// the lock file are preferred; when there is no lock file next to a
/// `package.json`, its declared ranges are reduced to their base version.
pub struct NpmAnalyzer;

impl NpmAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for NpmAnalyzer {
    fn analyze(&self, path: &Path) -> Result<Vec<Project>> {
        let json = read_json(path)?;
        let name = json.get("name").and_then(|v| v.as_str()).map(str::to_string);

        let is_lock = path
            .file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|n| n.eq_ignore_ascii_case("package-lock.json"));

        let dependencies = if is_lock {
            parse_package_lock(&json)
        } else {
            let lock = path.with_file_name("package-lock.json");
            if lock.exists() {
                parse_package_lock(&read_json(&lock)?)
            } else {
                parse_package_json(&json)
            }
        };

        Ok(vec![Project { name, dependencies }])
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Parse a lock file: the v2/v3 `packages` map, or the v1 `dependencies` map.
fn parse_package_lock(json: &Value) -> Vec<Dependency> {
    let mut deps = Vec::new();

    if let Some(packages) = json.get("packages").and_then(|v| v.as_object()) {
        for (pkg_path, info) in packages {
            // Skip the root entry (empty string key)
            if pkg_path.is_empty() {
                continue;
            }
            let Some(version) = info.get("version").and_then(|v| v.as_str()) else {
                continue;
            };

            // "node_modules/a/node_modules/@scope/b" → "@scope/b"
            let name = pkg_path
                .rsplit_once("node_modules/")
                .map_or(pkg_path.as_str(), |(_, name)| name);

            deps.push(Dependency::new(name, version));
        }
    } else if let Some(dependencies) = json.get("dependencies").and_then(|v| v.as_object()) {
        for (name, info) in dependencies {
            if let Some(version) = info.get("version").and_then(|v| v.as_str()) {
                deps.push(Dependency::new(name.as_str(), version));
            }
        }
    }

    deps
}

/// Parse `package.json`: `dependencies` only, range operators stripped.
fn parse_package_json(json: &Value) -> Vec<Dependency> {
    let mut deps = Vec::new();

    if let Some(pkgs) = json.get("dependencies").and_then(|v| v.as_object()) {
        for (name, version_range) in pkgs {
            let version = version_range
                .as_str()
                .unwrap_or("*")
                .trim_start_matches(|c: char| !c.is_ascii_digit() && c != '*');
            deps.push(Dependency::new(name.as_str(), version));
        }
    }

    deps
}
