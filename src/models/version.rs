//! Dotted version tags embedded in object keys (`app-v1.4.2.dmg`, `tool-2.0.1.7.zip`).

use regex::Regex;
use std::{fmt, sync::LazyLock};

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"v?(\d+)\.(\d+)\.(\d+)(?:\.(\d+))?").expect("version pattern is valid")
});

/// Suffixes that disqualify a tag: build metadata (`1.2.3+20240101`) or a
/// pre-release label (`2.0.0-beta`, `1.4.0.rc2`, `2.0.0-beta_1`). The label
/// must end at a non-alphanumeric character so `-devtools` is not `-dev`.
static PRE_RELEASE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:\+|[-._]?(?i:alpha|beta|rc|preview|pre|dev|snapshot|nightly|canary)\d*(?:[^A-Za-z0-9]|$))",
    )
    .expect("pre-release pattern is valid")
});

/// A parsed `major.minor.patch[.build]` tag.
///
/// Field order drives the derived ordering: components compare numerically
/// left to right, and a missing build sorts below any explicit build number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionTag {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub build: Option<u64>,
}

impl VersionTag {
    pub fn new(major: u64, minor: u64, patch: u64, build: Option<u64>) -> Self {
        Self {
            major,
            minor,
            patch,
            build,
        }
    }

    /// Extract the first version tag found anywhere in `key`.
    ///
    /// Returns `None` when there is no tag, when the tag is followed by a
    /// pre-release label (`2.0.0-beta`, `3.1.0rc1`) or by `+` build metadata,
    /// or when a component does not fit in a `u64`. Other suffixes such as
    /// `-x64` are ignored.
    pub fn parse_from_key(key: &str) -> Option<Self> {
        let caps = VERSION_PATTERN.captures(key)?;
        let whole = caps.get(0)?;

        if PRE_RELEASE_SUFFIX.is_match(&key[whole.end()..]) {
            return None;
        }

        let component = |idx: usize| caps.get(idx).map(|m| m.as_str().parse::<u64>());
        let major = component(1)?.ok()?;
        let minor = component(2)?.ok()?;
        let patch = component(3)?.ok()?;
        let build = match component(4) {
            Some(parsed) => Some(parsed.ok()?),
            None => None,
        };

        Some(Self::new(major, minor, patch, build))
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(build) = self.build {
            write!(f, ".{}", build)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_and_four_component_tags() {
        assert_eq!(
            VersionTag::parse_from_key("app-1.2.3.exe"),
            Some(VersionTag::new(1, 2, 3, None))
        );
        assert_eq!(
            VersionTag::parse_from_key("builds/app-v10.0.1.42-setup.msi"),
            Some(VersionTag::new(10, 0, 1, Some(42)))
        );
        assert_eq!(
            VersionTag::parse_from_key("app-1.2.3-x64.exe"),
            Some(VersionTag::new(1, 2, 3, None))
        );
    }

    #[test]
    fn leading_v_is_optional() {
        assert_eq!(
            VersionTag::parse_from_key("Installer v3.1.4.dmg"),
            Some(VersionTag::new(3, 1, 4, None))
        );
    }

    #[test]
    fn keys_without_a_full_triple_have_no_tag() {
        assert_eq!(VersionTag::parse_from_key("app-latest.exe"), None);
        assert_eq!(VersionTag::parse_from_key("app-1.2.exe"), None);
    }

    #[test]
    fn pre_release_suffixes_have_no_tag() {
        assert_eq!(VersionTag::parse_from_key("app-2.0.0-beta.exe"), None);
        assert_eq!(VersionTag::parse_from_key("app-2.0.0-RC1.exe"), None);
        assert_eq!(VersionTag::parse_from_key("app-2.0.0.rc2.exe"), None);
        assert_eq!(VersionTag::parse_from_key("app-3.1.0beta.zip"), None);
        assert_eq!(VersionTag::parse_from_key("app-2.0.0-beta_1.exe"), None);
        assert_eq!(VersionTag::parse_from_key("app-1.0.0-rc_final.exe"), None);
        assert_eq!(VersionTag::parse_from_key("app-1.0.0-preview"), None);
    }

    #[test]
    fn build_metadata_has_no_tag() {
        assert_eq!(VersionTag::parse_from_key("app-1.2.3+20240101.exe"), None);
        assert_eq!(VersionTag::parse_from_key("app-1.2.3+meta"), None);
    }

    #[test]
    fn labels_inside_longer_words_keep_the_tag() {
        assert_eq!(
            VersionTag::parse_from_key("app-1.2.3-devtools.zip"),
            Some(VersionTag::new(1, 2, 3, None))
        );
        assert_eq!(
            VersionTag::parse_from_key("app-1.2.3-release.zip"),
            Some(VersionTag::new(1, 2, 3, None))
        );
    }

    #[test]
    fn overflowing_components_have_no_tag() {
        assert_eq!(
            VersionTag::parse_from_key("app-99999999999999999999.0.0.exe"),
            None
        );
    }

    #[test]
    fn ordering_is_numeric_per_component() {
        let older = VersionTag::new(1, 2, 0, None);
        let newer = VersionTag::new(1, 10, 0, None);
        assert!(newer > older);
    }

    #[test]
    fn missing_build_sorts_below_any_build() {
        let plain = VersionTag::new(1, 0, 0, None);
        let zero_build = VersionTag::new(1, 0, 0, Some(0));
        assert!(zero_build > plain);
        assert!(VersionTag::new(1, 0, 1, None) > zero_build);
    }

    #[test]
    fn display_round_trips_the_dotted_form() {
        assert_eq!(VersionTag::new(4, 5, 6, Some(7)).to_string(), "4.5.6.7");
        assert_eq!(VersionTag::new(4, 5, 6, None).to_string(), "4.5.6");
    }
}
