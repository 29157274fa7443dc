use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use serde::Deserialize;

use crate::models::{Dependency, Project};

/// Analyzer for .NET projects using NuGet.
///
/// Accepts a solution (`.sln`) or a single project file (`.csproj`,
/// `.vbproj`, `.fsproj`). For each project, dependencies come from
/// `<PackageReference>` items and from a legacy `packages.config` next to
/// the project file.
pub struct NuGetAnalyzer;

impl NuGetAnalyzer {
    /// Create a new `NuGetAnalyzer`.
    pub fn new() -> Self {
        Self
    }
}

impl super::Analyzer for NuGetAnalyzer {
    fn analyze(&self, path: &Path) -> Result<Vec<Project>> {
        let is_solution = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("sln"));

        if !is_solution {
            return Ok(vec![read_project(path)?]);
        }

        let mut projects = Vec::new();
        for project_path in parse_solution(path)? {
            if !project_path.exists() {
                tracing::warn!(
                    solution = %path.display(),
                    project = %project_path.display(),
                    "project listed in solution not found"
                );
                continue;
            }
            projects.push(read_project(&project_path)?);
        }
        Ok(projects)
    }
}

fn read_project(path: &Path) -> Result<Project> {
    let mut dependencies = parse_project_file(path)?;

    let packages_config = path.with_file_name("packages.config");
    if packages_config.exists() {
        for dep in parse_packages_config(&packages_config)? {
            if !dependencies
                .iter()
                .any(|d| d.name.eq_ignore_ascii_case(&dep.name) && d.version == dep.version)
            {
                dependencies.push(dep);
            }
        }
    }

    Ok(Project {
        name: path
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string),
        dependencies,
    })
}

/// List the project files referenced by a solution.
///
/// Lines look like
/// `Project("{FAE04EC0-...}") = "App", "src\App\App.csproj", "{GUID}"`;
/// solution folders (whose path is not a project file) are skipped.
fn parse_solution(path: &Path) -> Result<Vec<PathBuf>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let re = Regex::new(r#"^Project\("\{[^}]*\}"\)\s*=\s*"[^"]*"\s*,\s*"([^"]+)""#)?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));

    let projects = content
        .lines()
        .filter_map(|line| re.captures(line.trim_start()))
        .map(|caps| caps[1].replace(['\\', '/'], MAIN_SEPARATOR_STR))
        .filter(|rel| rel.to_ascii_lowercase().ends_with("proj"))
        .map(|rel| base.join(rel))
        .collect();

    Ok(projects)
}

/// Parse `<PackageReference Include="..." Version="..." />` from a project file.
///
/// The version may also be given as a child `<Version>` element. References
/// without a version (centrally managed) are skipped.
fn parse_project_file(path: &Path) -> Result<Vec<Dependency>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    let mut deps = Vec::new();
    // Reference whose closing tag has not been seen yet: (name, version)
    let mut open: Option<(String, String)> = None;
    let mut in_version = false;

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"PackageReference" => {
                let (name, version) = reference_attributes(e);
                push_reference(&mut deps, name, version);
            }
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"PackageReference" => {
                open = Some(reference_attributes(e));
            }
            Ok(Event::Start(ref e)) if open.is_some() && e.local_name().as_ref() == b"Version" => {
                in_version = true;
            }
            Ok(Event::Text(ref t)) if in_version => {
                if let (Some((_, version)), Ok(text)) = (open.as_mut(), t.unescape()) {
                    *version = text.trim().to_string();
                }
            }
            Ok(Event::End(ref e)) => match e.name().local_name().as_ref() {
                b"Version" => in_version = false,
                b"PackageReference" => {
                    if let Some((name, version)) = open.take() {
                        push_reference(&mut deps, name, version);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(e).with_context(|| format!("parsing {}", path.display()));
            }
            _ => {}
        }
    }

    Ok(deps)
}

fn reference_attributes(e: &BytesStart) -> (String, String) {
    let mut name = String::new();
    let mut version = String::new();
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let val = attr.unescape_value().unwrap_or_default().into_owned();
        match key.as_str() {
            "Include" => name = val,
            "Version" => version = val,
            _ => {}
        }
    }
    (name, version)
}

fn push_reference(deps: &mut Vec<Dependency>, name: String, version: String) {
    if name.is_empty() {
        return;
    }
    if version.is_empty() {
        tracing::debug!(package = %name, "skipping package reference without a version");
        return;
    }
    deps.push(Dependency::new(name, version));
}

#[derive(Debug, Deserialize)]
struct PackagesConfig {
    #[serde(rename = "package", default)]
    packages: Vec<PackageEntry>,
}

#[derive(Debug, Deserialize)]
struct PackageEntry {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@version")]
    version: String,
}

/// Parse `<package id="..." version="..." />` from `packages.config`.
fn parse_packages_config(path: &Path) -> Result<Vec<Dependency>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: PackagesConfig = quick_xml::de::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;

    Ok(config
        .packages
        .into_iter()
        .map(|p| Dependency::new(p.id, p.version))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_parse_csproj() {
        let xml = r#"<Project Sdk="Microsoft.NET.Sdk">
  <ItemGroup>
    <PackageReference Include="Newtonsoft.Json" Version="13.0.1" />
    <PackageReference Include="Serilog">
      <Version>2.12.0</Version>
    </PackageReference>
    <PackageReference Include="Central.Managed" />
  </ItemGroup>
</Project>"#;
        let mut f = NamedTempFile::with_suffix(".csproj").unwrap();
        write!(f, "{}", xml).unwrap();
        let deps = parse_project_file(f.path()).unwrap();
        assert_eq!(
            deps,
            vec![
                Dependency::new("Newtonsoft.Json", "13.0.1"),
                Dependency::new("Serilog", "2.12.0"),
            ]
        );
    }

    #[test]
    fn test_parse_packages_config() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<packages>
  <package id="Newtonsoft.Json" version="13.0.1" targetFramework="net452" />
  <package id="NUnit" version="3.13.3" targetFramework="net452" />
</packages>"#;
        let mut f = NamedTempFile::new().unwrap();
        write!(f, "{}", xml).unwrap();
        let deps = parse_packages_config(f.path()).unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0], Dependency::new("Newtonsoft.Json", "13.0.1"));
        assert_eq!(deps[1], Dependency::new("NUnit", "3.13.3"));
    }

    #[test]
    fn test_project_named_after_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Billing.Api.csproj");
        std::fs::write(
            &path,
            r#"<Project><ItemGroup><PackageReference Include="Dapper" Version="2.1.0" /></ItemGroup></Project>"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("packages.config"),
            r#"<packages><package id="dapper" version="2.1.0" /><package id="Polly" version="7.2.4" /></packages>"#,
        )
        .unwrap();

        let projects = NuGetAnalyzer::new().analyze(&path).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name.as_deref(), Some("Billing.Api"));
        assert_eq!(
            projects[0].dependencies,
            vec![
                Dependency::new("Dapper", "2.1.0"),
                Dependency::new("Polly", "7.2.4"),
            ]
        );
    }

    #[test]
    fn test_solution_lists_projects() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src").join("App")).unwrap();
        std::fs::write(
            dir.path().join("src").join("App").join("App.csproj"),
            r#"<Project><ItemGroup><PackageReference Include="Serilog" Version="2.12.0" /></ItemGroup></Project>"#,
        )
        .unwrap();
        let sln = dir.path().join("All.sln");
        std::fs::write(
            &sln,
            r#"
Microsoft Visual Studio Solution File, Format Version 12.00
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "App", "src\App\App.csproj", "{11111111-1111-1111-1111-111111111111}"
EndProject
Project("{2150E333-8FDC-42A3-9474-1A3956D46DE8}") = "docs", "docs", "{22222222-2222-2222-2222-222222222222}"
EndProject
Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "Gone", "src\Gone\Gone.csproj", "{33333333-3333-3333-3333-333333333333}"
EndProject
"#,
        )
        .unwrap();

        let projects = NuGetAnalyzer::new().analyze(&sln).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name.as_deref(), Some("App"));
        assert_eq!(
            projects[0].dependencies,
            vec![Dependency::new("Serilog", "2.12.0")]
        );
    }
}
