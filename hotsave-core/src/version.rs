//! Dot-separated `major.minor.patch` versions used in the handshake.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A three-component version, ordered lexicographically
/// (major, then minor, then patch).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for Version {
    type Err = CoreError;

    /// Missing trailing components count as zero, so `"1.2"` is `1.2.0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(CoreError::InvalidVersion(s.to_string()));
        }

        let mut parts = [0u32; 3];
        let mut count = 0;
        for piece in trimmed.split('.') {
            if count == 3 {
                return Err(CoreError::InvalidVersion(s.to_string()));
            }
            parts[count] = piece
                .parse()
                .map_err(|_| CoreError::InvalidVersion(s.to_string()))?;
            count += 1;
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// `true` when `current >= required`. Unparseable input on either side is
/// treated as incompatible.
pub fn is_compatible(current: &str, required: &str) -> bool {
    match (current.parse::<Version>(), required.parse::<Version>()) {
        (Ok(current), Ok(required)) => current >= required,
        (current, required) => {
            tracing::warn!(
                current_ok = current.is_ok(),
                required_ok = required.is_ok(),
                "version comparison with unparseable input",
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("1.2.0", "1.1.9", true)]
    #[case("1.0.0", "1.0.1", false)]
    #[case("2.0.0", "2.0.0", true)]
    #[case("1.10.0", "1.9.0", true)]
    #[case("0.9.9", "1.0.0", false)]
    #[case("1.2", "1.2.0", true)]
    fn compatibility_is_componentwise(
        #[case] current: &str,
        #[case] required: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(is_compatible(current, required), expected);
    }

    #[rstest]
    #[case("")]
    #[case("1.x.0")]
    #[case("1.2.3.4")]
    #[case("-1.0.0")]
    fn rejects_malformed_versions(#[case] input: &str) {
        assert!(input.parse::<Version>().is_err(), "{input} should not parse");
    }

    #[test]
    fn garbage_is_never_compatible() {
        assert!(!is_compatible("banana", "1.0.0"));
        assert!(!is_compatible("1.0.0", "banana"));
    }

    #[test]
    fn display_round_trips_padding() {
        let v: Version = "3".parse().expect("parse");
        assert_eq!(v.to_string(), "3.0.0");
    }
}
