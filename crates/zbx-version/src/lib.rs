//! Zabbix server version handling.
//!
//! This crate provides two things:
//! - [`ApiVersion`]: the version reported by `apiinfo.version`, parsed with
//!   release-only comparison semantics (`7.0` == `7.0.0`, `7.0.0rc1` < `7.0.0`,
//!   build metadata ignored).
//! - [`VersionTraits`]: the correct spelling of every version-sensitive API
//!   parameter, computed once per server and threaded through all requests.
//!
//! # Example
//!
//! ```
//! use zbx_version::{ApiVersion, VersionTraits};
//!
//! let version: ApiVersion = "7.0.0rc1".parse().unwrap();
//! assert!(version < "7.0.0".parse().unwrap());
//!
//! let traits = VersionTraits::for_version(&version);
//! assert!(traits.auth_in_header);
//! assert_eq!(traits.proxy_name_field, "name");
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionParseError {
    #[error("empty version string")]
    Empty,
    #[error("invalid version component {0:?}")]
    InvalidComponent(String),
    #[error("invalid pre-release segment {0:?}")]
    InvalidPreRelease(String),
}

/// Pre-release stage. Orders alpha < beta < rc, and any pre-release sorts
/// below the corresponding final release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreReleaseKind {
    Alpha,
    Beta,
    Rc,
}

impl PreReleaseKind {
    fn as_str(self) -> &'static str {
        match self {
            PreReleaseKind::Alpha => "alpha",
            PreReleaseKind::Beta => "beta",
            PreReleaseKind::Rc => "rc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreRelease {
    pub kind: PreReleaseKind,
    pub number: u32,
}

impl fmt::Display for PreRelease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.as_str(), self.number)
    }
}

/// A Zabbix server version as reported by `apiinfo.version`.
///
/// Comparison is release-only: local/build segments (anything after `+`)
/// are dropped at parse time, a missing minor/patch means zero, and a
/// pre-release version orders below its final release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub pre: Option<PreRelease>,
}

impl ApiVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// The release triple, ignoring any pre-release segment.
    pub fn release(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch)
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.release().cmp(&other.release()).then_with(|| {
            match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                // A pre-release sorts below the release it precedes.
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            }
        })
    }
}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "{pre}")?;
        }
        Ok(())
    }
}

impl FromStr for ApiVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionParseError::Empty);
        }
        // Release-only comparison: drop build metadata outright.
        let s = s.split('+').next().unwrap_or(s);

        let mut numbers = [0u32; 3];
        let mut pre = None;
        for (idx, part) in s.splitn(3, '.').enumerate() {
            let (digits, rest) = split_leading_digits(part);
            if digits.is_empty() {
                return Err(VersionParseError::InvalidComponent(part.to_string()));
            }
            numbers[idx] = digits
                .parse()
                .map_err(|_| VersionParseError::InvalidComponent(part.to_string()))?;
            if !rest.is_empty() {
                pre = Some(parse_pre_release(rest)?);
                break;
            }
        }
        Ok(ApiVersion {
            major: numbers[0],
            minor: numbers[1],
            patch: numbers[2],
            pre,
        })
    }
}

fn split_leading_digits(s: &str) -> (&str, &str) {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(s.len(), |(i, _)| i);
    s.split_at(end)
}

fn parse_pre_release(s: &str) -> Result<PreRelease, VersionParseError> {
    let trimmed = s.trim_start_matches(['-', '.', '_']);
    let lower = trimmed.to_ascii_lowercase();
    let (kind, rest) = if let Some(rest) = lower.strip_prefix("alpha") {
        (PreReleaseKind::Alpha, rest)
    } else if let Some(rest) = lower.strip_prefix("beta") {
        (PreReleaseKind::Beta, rest)
    } else if let Some(rest) = lower.strip_prefix("rc") {
        (PreReleaseKind::Rc, rest)
    } else {
        return Err(VersionParseError::InvalidPreRelease(s.to_string()));
    };
    let number = if rest.is_empty() {
        0
    } else {
        rest.parse()
            .map_err(|_| VersionParseError::InvalidPreRelease(s.to_string()))?
    };
    Ok(PreRelease { kind, number })
}

/// Which `usergroup.get` parameters select permission rights.
///
/// Rights were split into host-group and template-group rights in 6.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RightsSelect {
    Unified(&'static str),
    Split {
        host: &'static str,
        template: &'static str,
    },
}

/// Version-dependent API parameter spellings, computed once at login.
///
/// Every entry is a straight lookup: there is no I/O and no fallback logic
/// here, just the table of renames the Zabbix API went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionTraits {
    /// `user.login` username parameter (`user` < 5.4, `username` after).
    pub login_user_param: &'static str,
    /// User object username property (`alias` < 6.0, `username` after).
    pub user_name_field: &'static str,
    /// Proxy name property (`host` < 7.0, `name` after).
    pub proxy_name_field: &'static str,
    /// Host proxy id property (`proxy_hostid` < 7.0, `proxyid` after).
    pub host_proxyid_field: &'static str,
    /// `host.get` group selector (`selectGroups` < 6.2, `selectHostGroups` after).
    pub host_groups_select: &'static str,
    /// Host availability property (`available` < 6.4, `active_available` after).
    pub host_available_field: &'static str,
    /// `usergroup.get` rights selector(s).
    pub usergroup_rights_select: RightsSelect,
    /// Auth token travels in the `Authorization: Bearer` header from 6.4;
    /// before that it goes in the request body under `auth`.
    pub auth_in_header: bool,
    /// Template groups are their own entity from 6.2; before that template
    /// group operations alias to `hostgroup.*`.
    pub split_template_groups: bool,
    /// `configuration.export` honours `prettyprint` from 5.4.
    pub pretty_export: bool,
    /// Proxy groups and `monitored_by` exist from 7.0.
    pub proxy_groups: bool,
}

impl VersionTraits {
    pub fn for_version(version: &ApiVersion) -> Self {
        let release = version.release();
        Self {
            login_user_param: if release < (5, 4, 0) { "user" } else { "username" },
            user_name_field: if release < (6, 0, 0) { "alias" } else { "username" },
            proxy_name_field: if release < (7, 0, 0) { "host" } else { "name" },
            host_proxyid_field: if release < (7, 0, 0) {
                "proxy_hostid"
            } else {
                "proxyid"
            },
            host_groups_select: if release < (6, 2, 0) {
                "selectGroups"
            } else {
                "selectHostGroups"
            },
            host_available_field: if release < (6, 4, 0) {
                "available"
            } else {
                "active_available"
            },
            usergroup_rights_select: if release < (6, 2, 0) {
                RightsSelect::Unified("selectRights")
            } else {
                RightsSelect::Split {
                    host: "selectHostGroupRights",
                    template: "selectTemplateGroupRights",
                }
            },
            auth_in_header: release >= (6, 4, 0),
            split_template_groups: release >= (6, 2, 0),
            pretty_export: release >= (5, 4, 0),
            proxy_groups: release >= (7, 0, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ApiVersion {
        s.parse().expect("version")
    }

    #[test]
    fn parses_full_triple() {
        assert_eq!(v("6.4.11"), ApiVersion::new(6, 4, 11));
    }

    #[test]
    fn missing_components_default_to_zero() {
        assert_eq!(v("7.0"), ApiVersion::new(7, 0, 0));
        assert_eq!(v("7"), ApiVersion::new(7, 0, 0));
        assert_eq!(v("7.0"), v("7.0.0"));
    }

    #[test]
    fn parses_pre_release() {
        let version = v("7.0.0rc1");
        assert_eq!(version.release(), (7, 0, 0));
        assert_eq!(
            version.pre,
            Some(PreRelease {
                kind: PreReleaseKind::Rc,
                number: 1
            })
        );
    }

    #[test]
    fn parses_separated_pre_release() {
        assert_eq!(v("7.0.0-rc1"), v("7.0.0rc1"));
        assert_eq!(v("6.0.0beta2").pre.map(|p| p.kind), Some(PreReleaseKind::Beta));
        assert_eq!(v("6.0.0alpha1").pre.map(|p| p.kind), Some(PreReleaseKind::Alpha));
    }

    #[test]
    fn build_metadata_is_ignored() {
        assert_eq!(v("6.0.0+build42"), v("6.0.0"));
    }

    #[test]
    fn pre_release_sorts_below_release() {
        assert!(v("7.0.0rc1") < v("7.0.0"));
        assert!(v("7.0.0alpha1") < v("7.0.0beta1"));
        assert!(v("7.0.0beta1") < v("7.0.0rc1"));
        assert!(v("7.0.0rc1") < v("7.0.0rc2"));
        assert!(v("6.4.99") < v("7.0.0alpha1"));
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<ApiVersion>().is_err());
        assert!("x.y.z".parse::<ApiVersion>().is_err());
        assert!("7.0.0snapshot".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for s in ["6.0.0", "7.0.3", "7.0.0rc1"] {
            assert_eq!(v(s).to_string(), s);
            assert_eq!(v(&v(s).to_string()), v(s));
        }
    }

    #[test]
    fn traits_legacy_server() {
        let traits = VersionTraits::for_version(&v("5.2.0"));
        assert_eq!(traits.login_user_param, "user");
        assert_eq!(traits.user_name_field, "alias");
        assert_eq!(traits.proxy_name_field, "host");
        assert_eq!(traits.host_proxyid_field, "proxy_hostid");
        assert_eq!(traits.host_groups_select, "selectGroups");
        assert_eq!(traits.host_available_field, "available");
        assert_eq!(
            traits.usergroup_rights_select,
            RightsSelect::Unified("selectRights")
        );
        assert!(!traits.auth_in_header);
        assert!(!traits.split_template_groups);
        assert!(!traits.pretty_export);
        assert!(!traits.proxy_groups);
    }

    #[test]
    fn traits_modern_server() {
        let traits = VersionTraits::for_version(&v("7.0.0"));
        assert_eq!(traits.login_user_param, "username");
        assert_eq!(traits.user_name_field, "username");
        assert_eq!(traits.proxy_name_field, "name");
        assert_eq!(traits.host_proxyid_field, "proxyid");
        assert_eq!(traits.host_groups_select, "selectHostGroups");
        assert_eq!(traits.host_available_field, "active_available");
        assert_eq!(
            traits.usergroup_rights_select,
            RightsSelect::Split {
                host: "selectHostGroupRights",
                template: "selectTemplateGroupRights",
            }
        );
        assert!(traits.auth_in_header);
        assert!(traits.split_template_groups);
        assert!(traits.pretty_export);
        assert!(traits.proxy_groups);
    }

    #[test]
    fn traits_thresholds() {
        // Each threshold flips exactly at its release.
        assert_eq!(VersionTraits::for_version(&v("5.4.0")).login_user_param, "username");
        assert_eq!(VersionTraits::for_version(&v("5.3.9")).login_user_param, "user");
        assert_eq!(VersionTraits::for_version(&v("6.0.0")).user_name_field, "username");
        assert_eq!(VersionTraits::for_version(&v("6.2.0")).host_groups_select, "selectHostGroups");
        assert_eq!(VersionTraits::for_version(&v("6.1.9")).host_groups_select, "selectGroups");
        assert!(VersionTraits::for_version(&v("6.4.0")).auth_in_header);
        assert!(!VersionTraits::for_version(&v("6.3.0")).auth_in_header);
        assert_eq!(VersionTraits::for_version(&v("7.0.0")).proxy_name_field, "name");
        assert_eq!(VersionTraits::for_version(&v("6.4.10")).proxy_name_field, "host");
    }

    #[test]
    fn auth_header_matches_release_comparison() {
        for s in ["5.0.0", "6.0.0", "6.2.0", "6.4.0", "6.4.1", "7.0.0", "7.0.0rc1"] {
            let version = v(s);
            assert_eq!(
                VersionTraits::for_version(&version).auth_in_header,
                version.release() >= (6, 4, 0),
                "mismatch for {s}"
            );
        }
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            #[test]
            fn parse_display_round_trip(major in 0u32..100, minor in 0u32..100, patch in 0u32..100) {
                let version = ApiVersion::new(major, minor, patch);
                prop_assert_eq!(version.to_string().parse::<ApiVersion>().unwrap(), version);
            }

            #[test]
            fn ordering_matches_release_tuple(
                a in (0u32..50, 0u32..50, 0u32..50),
                b in (0u32..50, 0u32..50, 0u32..50),
            ) {
                let va = ApiVersion::new(a.0, a.1, a.2);
                let vb = ApiVersion::new(b.0, b.1, b.2);
                prop_assert_eq!(va.cmp(&vb), a.cmp(&b));
            }

            #[test]
            fn pre_release_always_below_final(
                major in 0u32..50, minor in 0u32..50, patch in 0u32..50, number in 0u32..20,
            ) {
                let release = ApiVersion::new(major, minor, patch);
                for kind in [PreReleaseKind::Alpha, PreReleaseKind::Beta, PreReleaseKind::Rc] {
                    let pre = ApiVersion { pre: Some(PreRelease { kind, number }), ..release };
                    prop_assert!(pre < release);
                }
            }
        }
    }
}
