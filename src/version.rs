//! # Version Model
//!
//! Every Atlas API contract is published under a version with one of three
//! stability levels: `stable` (`2024-08-05`), `upcoming`
//! (`2024-08-05.upcoming`) or `preview` (`preview`). Version strings are the
//! only production source of [`Version`] values; they appear inside
//! `application/vnd.atlas.<version>+<type>` content-type headers and inside
//! watcher extensions.
//!
//! The ordering implemented here is deliberate and must not be simplified:
//! preview sorts after everything else, and a stable version sorts strictly
//! before an upcoming version carrying the same date while never comparing
//! equal to it.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

static VERSION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^((?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})(?P<upcoming>\.upcoming)?|(?P<preview>preview))$",
    )
    .expect("version regex should be valid")
});

/// Stability level of a versioned API contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilityLevel {
    Preview,
    Upcoming,
    Stable,
}

impl fmt::Display for StabilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StabilityLevel::Preview => write!(f, "preview"),
            StabilityLevel::Upcoming => write!(f, "upcoming"),
            StabilityLevel::Stable => write!(f, "stable"),
        }
    }
}

/// Calendar date of a stable or upcoming version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl VersionDate {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// Year, then month, then day.
    pub fn less(&self, other: &VersionDate) -> bool {
        (self.year, self.month, self.day) < (other.year, other.month, other.day)
    }
}

impl fmt::Display for VersionDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// A parsed API version: exactly one of preview, upcoming or stable.
///
/// `Display` is the exact inverse of `FromStr` for all three variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Preview,
    Upcoming(VersionDate),
    Stable(VersionDate),
}

impl Version {
    pub fn stability_level(&self) -> StabilityLevel {
        match self {
            Version::Preview => StabilityLevel::Preview,
            Version::Upcoming(_) => StabilityLevel::Upcoming,
            Version::Stable(_) => StabilityLevel::Stable,
        }
    }

    /// Returns true if `self` sorts strictly before `other`.
    ///
    /// Preview is the unique maximum. Same-date stable/upcoming pairs order
    /// stable first; they are never `equal`.
    pub fn less(&self, other: &Version) -> bool {
        match (self, other) {
            // Preview is always last, never less than anything.
            (Version::Preview, _) => false,
            (Version::Upcoming(_), Version::Preview) => true,
            (Version::Upcoming(a), Version::Upcoming(b)) => a.less(b),
            // Same date: the stable version is older than the upcoming one.
            (Version::Upcoming(a), Version::Stable(b)) => {
                if a == b {
                    false
                } else {
                    a.less(b)
                }
            }
            (Version::Stable(_), Version::Preview) => true,
            (Version::Stable(a), Version::Upcoming(b)) => {
                if a == b {
                    true
                } else {
                    a.less(b)
                }
            }
            (Version::Stable(a), Version::Stable(b)) => a.less(b),
        }
    }

    /// Equality holds only within the same stability level.
    pub fn equal(&self, other: &Version) -> bool {
        match (self, other) {
            (Version::Preview, Version::Preview) => true,
            (Version::Upcoming(a), Version::Upcoming(b)) => a == b,
            (Version::Stable(a), Version::Stable(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Preview => write!(f, "preview"),
            Version::Upcoming(date) => write!(f, "{date}.upcoming"),
            Version::Stable(date) => write!(f, "{date}"),
        }
    }
}

impl FromStr for Version {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = VERSION_REGEX
            .captures(s)
            .ok_or_else(|| anyhow::anyhow!("invalid version: {s}"))?;

        if captures.name("preview").is_some() {
            return Ok(Version::Preview);
        }

        // The regex guarantees year/month/day are present and numeric for the
        // dated alternative.
        let year: i32 = captures["year"].parse()?;
        let month: u32 = captures["month"].parse()?;
        let day: u32 = captures["day"].parse()?;
        let date = VersionDate::new(year, month, day);

        if captures.name("upcoming").is_some() {
            Ok(Version::Upcoming(date))
        } else {
            Ok(Version::Stable(date))
        }
    }
}

/// [`Version::less`] as an [`Ordering`](std::cmp::Ordering), for sort calls.
pub fn compare(a: &Version, b: &Version) -> std::cmp::Ordering {
    if a.less(b) {
        std::cmp::Ordering::Less
    } else if b.less(a) {
        std::cmp::Ordering::Greater
    } else {
        std::cmp::Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stable(y: i32, m: u32, d: u32) -> Version {
        Version::Stable(VersionDate::new(y, m, d))
    }

    fn upcoming(y: i32, m: u32, d: u32) -> Version {
        Version::Upcoming(VersionDate::new(y, m, d))
    }

    #[test]
    fn test_parse_round_trip() {
        for s in ["preview", "2025-01-01", "2024-08-05.upcoming"] {
            let version: Version = s.parse().unwrap();
            assert_eq!(version.to_string(), s);
        }
    }

    #[test]
    fn test_parse_variants() {
        assert_eq!("preview".parse::<Version>().unwrap(), Version::Preview);
        assert_eq!("2025-01-01".parse::<Version>().unwrap(), stable(2025, 1, 1));
        assert_eq!(
            "2025-01-01.upcoming".parse::<Version>().unwrap(),
            upcoming(2025, 1, 1)
        );
    }

    #[test]
    fn test_parse_rejects_invalid() {
        for s in [
            "",
            "2025-1-1",
            "2025-01-01.preview",
            "preview.upcoming",
            "v2025-01-01",
            "2025-01-01+json",
        ] {
            assert!(s.parse::<Version>().is_err(), "expected error for {s:?}");
        }
    }

    #[test]
    fn test_stability_level() {
        assert_eq!(Version::Preview.stability_level(), StabilityLevel::Preview);
        assert_eq!(
            upcoming(2025, 1, 1).stability_level(),
            StabilityLevel::Upcoming
        );
        assert_eq!(stable(2025, 1, 1).stability_level(), StabilityLevel::Stable);
    }

    #[test]
    fn test_preview_is_maximum() {
        assert!(!Version::Preview.less(&stable(2099, 12, 31)));
        assert!(!Version::Preview.less(&upcoming(2099, 12, 31)));
        assert!(!Version::Preview.less(&Version::Preview));
        assert!(stable(2099, 12, 31).less(&Version::Preview));
        assert!(upcoming(2099, 12, 31).less(&Version::Preview));
    }

    #[test]
    fn test_date_ordering_within_kind() {
        assert!(stable(2024, 1, 1).less(&stable(2024, 1, 2)));
        assert!(stable(2024, 1, 31).less(&stable(2024, 2, 1)));
        assert!(stable(2024, 12, 31).less(&stable(2025, 1, 1)));
        assert!(!stable(2024, 1, 1).less(&stable(2024, 1, 1)));
        assert!(upcoming(2024, 1, 1).less(&upcoming(2025, 1, 1)));
    }

    #[test]
    fn test_same_date_stable_sorts_before_upcoming() {
        let s = stable(2025, 1, 1);
        let u = upcoming(2025, 1, 1);
        assert!(s.less(&u));
        assert!(!u.less(&s));
        assert!(!s.equal(&u));
        assert!(!u.equal(&s));
    }

    #[test]
    fn test_cross_kind_different_dates_compare_by_date() {
        assert!(upcoming(2024, 12, 31).less(&stable(2025, 1, 1)));
        assert!(!stable(2025, 1, 1).less(&upcoming(2024, 12, 31)));
        assert!(stable(2024, 12, 31).less(&upcoming(2025, 1, 1)));
    }

    #[test]
    fn test_equal_within_kind_only() {
        assert!(Version::Preview.equal(&Version::Preview));
        assert!(stable(2025, 1, 1).equal(&stable(2025, 1, 1)));
        assert!(upcoming(2025, 1, 1).equal(&upcoming(2025, 1, 1)));
        assert!(!stable(2025, 1, 1).equal(&stable(2025, 1, 2)));
        assert!(!stable(2025, 1, 1).equal(&Version::Preview));
    }

    #[test]
    fn test_trichotomy() {
        let versions = [
            Version::Preview,
            stable(2024, 1, 1),
            stable(2025, 1, 1),
            upcoming(2024, 1, 1),
            upcoming(2025, 1, 1),
        ];
        for a in &versions {
            assert!(!a.less(a));
            for b in &versions {
                let holds = [a.less(b), b.less(a), a.equal(b)];
                assert_eq!(
                    holds.iter().filter(|v| **v).count(),
                    1,
                    "exactly one relation must hold for {a} vs {b}"
                );
            }
        }
    }

    #[test]
    fn test_sort_versions_scenario() {
        let mut versions = vec![
            stable(2025, 1, 1),
            Version::Preview,
            upcoming(2025, 1, 1),
            stable(2024, 1, 1),
            upcoming(2024, 1, 1),
            stable(2024, 2, 1),
            stable(2024, 2, 3),
            stable(2024, 2, 3),
            upcoming(2024, 2, 1),
        ];
        versions.sort_by(compare);
        assert_eq!(
            versions,
            vec![
                stable(2024, 1, 1),
                upcoming(2024, 1, 1),
                stable(2024, 2, 1),
                upcoming(2024, 2, 1),
                stable(2024, 2, 3),
                stable(2024, 2, 3),
                stable(2025, 1, 1),
                upcoming(2025, 1, 1),
                Version::Preview,
            ]
        );
    }
}
