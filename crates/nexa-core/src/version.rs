// ── Firmware version gate ──
//
// Dotted firmware versions are compared numerically, component by
// component. Pre-release (`-beta.2`) and build (`+abc`) suffixes are
// dropped before comparing, and the shorter version is padded with
// zeros, so `1.0` equals `1.0.0`.

use std::cmp::Ordering;

/// Oldest firmware that speaks the live socket protocol.
pub const MIN_FIRMWARE_VERSION: &str = "0.9.5";

/// Returns `true` if `version` is at least `min_version`.
///
/// A version that does not parse is never compatible; the failure is
/// logged and `false` is returned.
pub fn is_compatible(version: &str, min_version: &str) -> bool {
    match compare(version, min_version) {
        Ok(ordering) => ordering != Ordering::Less,
        Err(component) => {
            tracing::error!(
                version,
                min_version,
                component = %component,
                "cannot parse version strings"
            );
            false
        }
    }
}

/// Compare two versions after suffix stripping and zero padding.
///
/// On failure, returns the component that is not an integer.
fn compare(version: &str, min_version: &str) -> Result<Ordering, String> {
    let mut left = components(version)?;
    let mut right = components(min_version)?;

    let len = left.len().max(right.len());
    left.resize(len, 0);
    right.resize(len, 0);

    Ok(left.cmp(&right))
}

/// Returns `true` if `version` parses as a dotted version. Does not log.
pub fn is_valid(version: &str) -> bool {
    components(version).is_ok()
}

/// Split a version into integer components, ignoring any suffix after
/// the first `-` and then after the first `+`.
fn components(version: &str) -> Result<Vec<u64>, String> {
    let core = version.split('-').next().unwrap_or_default();
    let core = core.split('+').next().unwrap_or_default();

    core.split('.')
        .map(|part| part.trim().parse::<u64>().map_err(|_| part.to_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_versions_are_compatible() {
        assert!(is_compatible("0.9.5", "0.9.5"));
    }

    #[test]
    fn older_patch_is_incompatible() {
        assert!(!is_compatible("0.9.4", "0.9.5"));
    }

    #[test]
    fn newer_major_with_fewer_components_is_compatible() {
        assert!(is_compatible("1.0", "0.9.5"));
    }

    #[test]
    fn prerelease_suffix_is_ignored() {
        assert!(is_compatible("0.9.5-beta.2", "0.9.5"));
        assert!(!is_compatible("0.9.4-rc.1", "0.9.5"));
    }

    #[test]
    fn build_metadata_is_ignored() {
        assert!(is_compatible("0.9.5+20240101", "0.9.5"));
        assert!(is_compatible("0.10.0+build-7", "0.9.5"));
    }

    #[test]
    fn garbage_is_incompatible() {
        assert!(!is_compatible("abc", "0.9.5"));
        assert!(!is_compatible("", "0.9.5"));
        assert!(!is_compatible("0.9.x", "0.9.5"));
    }

    #[test]
    fn padding_makes_trailing_zeros_equal() {
        assert!(is_compatible("1", "1.0.0"));
        assert!(is_compatible("1.0.0", "1"));
        assert!(!is_compatible("0.9", "0.9.5"));
    }

    #[test]
    fn components_compare_numerically() {
        assert!(is_compatible("0.10.0", "0.9.5"));
        assert!(!is_compatible("0.9.10", "0.10"));
    }

    #[test]
    fn validity_follows_parsing() {
        assert!(is_valid("0.9.5"));
        assert!(is_valid("1.0-beta"));
        assert!(is_valid("2+build.7"));
        assert!(!is_valid("latest"));
        assert!(!is_valid(""));
        assert!(!is_valid("1..2"));
    }

    #[test]
    fn unparsable_minimum_rejects() {
        assert!(!is_compatible("1.0.0", "latest"));
    }
}
