/// Remain Kernel — Host Version
///
/// Versions are compared component-wise (major, minor, patch).
/// Build suffixes such as "-R0.1-SNAPSHOT" are ignored.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Version of the running host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HostVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl HostVersion {
    /// Oldest host this kernel will run on (first release shipping the sound API).
    pub const BASELINE: HostVersion = HostVersion::new(1, 3, 2);

    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self { major, minor, patch }
    }

    /// Parse a host version string like `"1.8.8-R0.1-SNAPSHOT"` or `"1.16"`.
    ///
    /// Returns `None` when the leading component is not numeric.
    pub fn parse(raw: &str) -> Option<Self> {
        let core = raw.trim().split('-').next().unwrap_or("");
        let mut parts = core.split('.');

        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            Some(p) => p.parse().ok()?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(p) => p.parse().ok()?,
            None => 0,
        };

        Some(Self::new(major, minor, patch))
    }

    /// True if this version is `other` or newer.
    pub fn at_least(&self, other: HostVersion) -> bool {
        *self >= other
    }

    /// True if the minor line is strictly newer than `1.<minor>`.
    pub fn newer_than(&self, minor: u16) -> bool {
        (self.major, self.minor) > (1, minor)
    }

    /// True if the minor line is strictly older than `1.<minor>`.
    pub fn older_than(&self, minor: u16) -> bool {
        (self.major, self.minor) < (1, minor)
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_snapshot_suffix() {
        assert_eq!(
            HostVersion::parse("1.8.8-R0.1-SNAPSHOT"),
            Some(HostVersion::new(1, 8, 8))
        );
    }

    #[test]
    fn missing_components_default_to_zero() {
        assert_eq!(HostVersion::parse("1.16"), Some(HostVersion::new(1, 16, 0)));
        assert_eq!(HostVersion::parse("2"), Some(HostVersion::new(2, 0, 0)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(HostVersion::parse("git-Bukkit"), None);
        assert_eq!(HostVersion::parse(""), None);
    }

    #[test]
    fn minor_line_comparisons() {
        let v = HostVersion::new(1, 8, 8);
        assert!(v.newer_than(7));
        assert!(!v.newer_than(8));
        assert!(v.older_than(9));
        assert!(v.at_least(HostVersion::BASELINE));
        assert!(!HostVersion::new(1, 2, 5).at_least(HostVersion::BASELINE));
    }
}
