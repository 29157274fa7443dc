use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A dotted numeric version with two to four components
/// (`major.minor[.build[.revision]]`).
///
/// A missing component orders before any present one, so `1.2 < 1.2.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DottedVersion {
    major: u32,
    minor: u32,
    build: Option<u32>,
    revision: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVersionError(String);

impl fmt::Display for ParseVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a dotted numeric version", self.0)
    }
}

impl std::error::Error for ParseVersionError {}

impl FromStr for DottedVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseVersionError(s.to_string());

        let parts = s
            .trim()
            .split('.')
            .map(|p| {
                if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(err());
                }
                p.parse::<u32>().map_err(|_| err())
            })
            .collect::<Result<Vec<_>, _>>()?;

        match parts.as_slice() {
            [major, minor] => Ok(Self::new(*major, *minor, None, None)),
            [major, minor, build] => Ok(Self::new(*major, *minor, Some(*build), None)),
            [major, minor, build, revision] => {
                Ok(Self::new(*major, *minor, Some(*build), Some(*revision)))
            }
            _ => Err(err()),
        }
    }
}

impl DottedVersion {
    fn new(major: u32, minor: u32, build: Option<u32>, revision: Option<u32>) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }
}

impl Ord for DottedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.build.cmp(&other.build))
            .then(self.revision.cmp(&other.revision))
    }
}

impl PartialOrd for DottedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DottedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{}", build)?;
        }
        if let Some(revision) = self.revision {
            write!(f, ".{}", revision)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> DottedVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_numeric_not_lexical() {
        assert!(v("1.10.0") > v("1.3.0"));
        assert!(v("1.10.0") > v("1.2.0"));
        assert!(v("2.0") > v("1.99.99.99"));
    }

    #[test]
    fn test_missing_component_is_lower() {
        assert!(v("1.2") < v("1.2.0"));
        assert!(v("1.2.0") < v("1.2.0.0"));
        assert_eq!(v("1.2.3"), v(" 1.2.3 "));
    }

    #[test]
    fn test_malformed() {
        for bad in ["", "1", "1.2.3.4.5", "1.x", "1.2-beta", "1..2", "-1.0", "1.+2"] {
            assert!(bad.parse::<DottedVersion>().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(v("4.05.1").to_string(), "4.5.1");
    }
}
