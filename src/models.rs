use std::path::Path;
use std::str::FromStr;

use crate::error::ScanError;

/// A package reference discovered in a source manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub version: String,
}

impl Dependency {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// A project found in a source manifest, with its direct dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Project {
    pub name: Option<String>,
    pub dependencies: Vec<Dependency>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Report,
    Publish,
}

impl FromStr for Command {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "report" => Ok(Command::Report),
            "publish" => Ok(Command::Publish),
            _ => Err(ScanError::InvalidCommand(s.to_string())),
        }
    }
}

/// Package-manager family a source manifest belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ecosystem {
    NuGet,
    Npm,
    PyPi,
}

impl Ecosystem {
    /// Infer the ecosystem from a source file name.
    pub fn infer(path: &Path) -> Option<Self> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("sln" | "csproj" | "vbproj") => Some(Ecosystem::NuGet),
            Some("json") => Some(Ecosystem::Npm),
            _ => path
                .file_name()
                .and_then(|s| s.to_str())
                .filter(|name| name.eq_ignore_ascii_case("requirements.txt"))
                .map(|_| Ecosystem::PyPi),
        }
    }

    /// Resolve the ecosystem from an explicit `--type` value, falling back to
    /// inference from the input file name only when `--type` is absent.
    pub fn resolve(explicit: Option<&str>, input: &Path) -> Result<Self, ScanError> {
        match explicit {
            Some(name) if name.trim().is_empty() => Err(ScanError::UnknownType),
            Some(name) => name.parse(),
            None => Self::infer(input).ok_or(ScanError::UnknownType),
        }
    }
}

impl FromStr for Ecosystem {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nuget" => Ok(Ecosystem::NuGet),
            "npm" => Ok(Ecosystem::Npm),
            "pypi" => Ok(Ecosystem::PyPi),
            _ => Err(ScanError::InvalidType(s.to_string())),
        }
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ecosystem::NuGet => write!(f, "nuget"),
            Ecosystem::Npm => write!(f, "npm"),
            Ecosystem::PyPi => write!(f, "pypi"),
        }
    }
}

/// Where the consuming package is published: a registry feed or a plain URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerSource {
    Feed(String),
    Url(String),
}

impl ConsumerSource {
    pub fn classify(source: &str) -> Self {
        let lower = source.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            ConsumerSource::Url(source.to_string())
        } else {
            ConsumerSource::Feed(source.to_string())
        }
    }

    pub fn feed(&self) -> Option<&str> {
        match self {
            ConsumerSource::Feed(feed) => Some(feed),
            ConsumerSource::Url(_) => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ConsumerSource::Url(url) => Some(url),
            ConsumerSource::Feed(_) => None,
        }
    }
}

/// The downstream package that consumes a dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageConsumer {
    pub name: Option<String>,
    pub version: String,
    pub group: Option<String>,
    pub source: ConsumerSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_ecosystem() {
        assert_eq!(Ecosystem::infer(Path::new("project.csproj")), Some(Ecosystem::NuGet));
        assert_eq!(Ecosystem::infer(Path::new("App.SLN")), Some(Ecosystem::NuGet));
        assert_eq!(Ecosystem::infer(Path::new("lib.vbproj")), Some(Ecosystem::NuGet));
        assert_eq!(Ecosystem::infer(Path::new("web/package.json")), Some(Ecosystem::Npm));
        assert_eq!(
            Ecosystem::infer(Path::new("svc/Requirements.txt")),
            Some(Ecosystem::PyPi)
        );
        assert_eq!(Ecosystem::infer(Path::new("dev-requirements.txt")), None);
        assert_eq!(Ecosystem::infer(Path::new("Cargo.toml")), None);
    }

    #[test]
    fn test_explicit_type_wins() {
        let eco = Ecosystem::resolve(Some("PyPI"), Path::new("project.csproj")).unwrap();
        assert_eq!(eco, Ecosystem::PyPi);
    }

    #[test]
    fn test_unknown_type() {
        assert!(matches!(
            Ecosystem::resolve(None, Path::new("pom.xml")),
            Err(ScanError::UnknownType)
        ));
        assert!(matches!(
            Ecosystem::resolve(Some("maven"), Path::new("pom.xml")),
            Err(ScanError::InvalidType(_))
        ));
    }

    #[test]
    fn test_blank_type_does_not_fall_back_to_inference() {
        assert!(matches!(
            Ecosystem::resolve(Some(""), Path::new("project.csproj")),
            Err(ScanError::UnknownType)
        ));
        assert!(matches!(
            Ecosystem::resolve(Some("  "), Path::new("project.csproj")),
            Err(ScanError::UnknownType)
        ));
    }

    #[test]
    fn test_command_parse() {
        assert_eq!("REPORT".parse::<Command>().unwrap(), Command::Report);
        assert_eq!("publish".parse::<Command>().unwrap(), Command::Publish);
        assert!(matches!(
            "scan".parse::<Command>(),
            Err(ScanError::InvalidCommand(c)) if c == "scan"
        ));
    }

    #[test]
    fn test_classify_consumer_source() {
        let url = ConsumerSource::classify("https://example/feed");
        assert_eq!(url.url(), Some("https://example/feed"));
        assert_eq!(url.feed(), None);

        let upper = ConsumerSource::classify("HTTP://example/feed");
        assert!(matches!(upper, ConsumerSource::Url(_)));

        let feed = ConsumerSource::classify("my-feed-name");
        assert_eq!(feed.feed(), Some("my-feed-name"));
        assert_eq!(feed.url(), None);
    }
}
