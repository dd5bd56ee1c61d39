//! CPU architecture values and the compatibility verdict

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use archfix_errors::{Error, PlatformError};
use serde::{Deserialize, Serialize};

/// CPU instruction-set family an executable is compiled for.
///
/// Values are derived from inspection (host identifier or binary header).
/// `Unknown` is a regular value meaning "could not be determined".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Architecture {
    #[serde(rename = "x86_64")]
    X86_64,
    #[serde(rename = "arm64")]
    Arm64,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Architecture {
    /// Architectures a prebuilt variant can exist for.
    pub const KNOWN: [Self; 2] = [Self::X86_64, Self::Arm64];

    /// Decode a host machine identifier (`uname -m` style).
    ///
    /// Unrecognized identifiers decode to `Unknown`; this never fails.
    #[must_use]
    pub fn from_machine(identifier: &str) -> Self {
        match identifier.trim() {
            "x86_64" | "amd64" | "AMD64" | "x64" | "i386" => Self::X86_64,
            "arm64" | "aarch64" | "arm64e" | "ARM64" => Self::Arm64,
            _ => Self::Unknown,
        }
    }

    /// Stable identifier used for on-disk variant directories and output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Arm64 => "arm64",
            Self::Unknown => "unknown",
        }
    }

    #[must_use]
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// The other supported architecture, if this one is known.
    #[must_use]
    pub fn opposite(self) -> Option<Self> {
        match self {
            Self::X86_64 => Some(Self::Arm64),
            Self::Arm64 => Some(Self::X86_64),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a caller-supplied target architecture.
///
/// Only `x86_64` and `arm64` are accepted; `unknown` is never a valid target.
impl FromStr for Architecture {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x86_64" | "x86-64" | "amd64" => Ok(Self::X86_64),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            _ => Err(PlatformError::UnsupportedArchitecture {
                value: s.to_string(),
            }
            .into()),
        }
    }
}

/// Every architecture embedded in one executable.
///
/// Thin binaries produce a single member, universal ("fat") binaries produce
/// one member per slice. An empty set, or a set holding only `Unknown`, means
/// the architecture could not be determined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchitectureSet(BTreeSet<Architecture>);

impl ArchitectureSet {
    #[must_use]
    pub fn single(arch: Architecture) -> Self {
        Self(BTreeSet::from([arch]))
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self::single(Architecture::Unknown)
    }

    pub fn insert(&mut self, arch: Architecture) {
        self.0.insert(arch);
    }

    #[must_use]
    pub fn contains(&self, arch: Architecture) -> bool {
        self.0.contains(&arch)
    }

    /// Known architectures in the set, in stable order.
    pub fn known(&self) -> impl Iterator<Item = Architecture> + '_ {
        self.0.iter().copied().filter(|arch| arch.is_known())
    }

    /// True when no known architecture was found.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.known().next().is_none()
    }

    /// True when the binary embeds code for more than one known architecture.
    #[must_use]
    pub fn is_universal(&self) -> bool {
        self.known().count() > 1
    }

    /// A host can run the binary iff the host architecture is a member.
    #[must_use]
    pub fn supports(&self, host: Architecture) -> bool {
        host.is_known() && self.contains(host)
    }

    pub fn iter(&self) -> impl Iterator<Item = Architecture> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Architecture> for ArchitectureSet {
    fn from_iter<I: IntoIterator<Item = Architecture>>(iter: I) -> Self {
        let set: BTreeSet<Architecture> = iter.into_iter().collect();
        if set.is_empty() {
            Self::unknown()
        } else {
            Self(set)
        }
    }
}

impl From<Architecture> for ArchitectureSet {
    fn from(arch: Architecture) -> Self {
        Self::single(arch)
    }
}

impl fmt::Display for ArchitectureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            return f.write_str("unknown");
        }
        let names: Vec<&str> = self.known().map(Architecture::as_str).collect();
        if self.is_universal() {
            write!(f, "universal ({})", names.join(", "))
        } else {
            f.write_str(names.join(", ").as_str())
        }
    }
}

/// Result of comparing the host with the bundle's transcoder.
///
/// Computed fresh on every check and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityVerdict {
    pub host_architecture: Architecture,
    pub binary_architecture: ArchitectureSet,
    pub is_compatible: bool,
}

impl CompatibilityVerdict {
    #[must_use]
    pub fn evaluate(host: Architecture, binary: ArchitectureSet) -> Self {
        let is_compatible = binary.supports(host);
        Self {
            host_architecture: host,
            binary_architecture: binary,
            is_compatible,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_machine_identifiers() {
        assert_eq!(Architecture::from_machine("x86_64"), Architecture::X86_64);
        assert_eq!(Architecture::from_machine("AMD64"), Architecture::X86_64);
        assert_eq!(Architecture::from_machine("i386"), Architecture::X86_64);
        assert_eq!(Architecture::from_machine("arm64"), Architecture::Arm64);
        assert_eq!(Architecture::from_machine("aarch64\n"), Architecture::Arm64);
        assert_eq!(Architecture::from_machine("ppc64le"), Architecture::Unknown);
        assert_eq!(Architecture::from_machine(""), Architecture::Unknown);
    }

    #[test]
    fn test_parse_target_rejects_unknown() {
        assert_eq!("arm64".parse::<Architecture>().unwrap(), Architecture::Arm64);
        assert_eq!("X86_64".parse::<Architecture>().unwrap(), Architecture::X86_64);
        assert!("unknown".parse::<Architecture>().is_err());
        assert!("riscv64".parse::<Architecture>().is_err());
    }

    #[test]
    fn test_universal_set_supports_both_hosts() {
        let set: ArchitectureSet = [Architecture::X86_64, Architecture::Arm64]
            .into_iter()
            .collect();
        assert!(set.is_universal());
        assert!(set.supports(Architecture::X86_64));
        assert!(set.supports(Architecture::Arm64));
        assert!(!set.supports(Architecture::Unknown));
        assert_eq!(set.to_string(), "universal (x86_64, arm64)");
    }

    #[test]
    fn test_verdict() {
        let verdict =
            CompatibilityVerdict::evaluate(Architecture::Arm64, Architecture::X86_64.into());
        assert!(!verdict.is_compatible);

        let verdict =
            CompatibilityVerdict::evaluate(Architecture::Arm64, Architecture::Arm64.into());
        assert!(verdict.is_compatible);

        let verdict = CompatibilityVerdict::evaluate(Architecture::Unknown, ArchitectureSet::unknown());
        assert!(!verdict.is_compatible);
    }

    #[test]
    fn test_empty_iterator_is_unknown() {
        let set: ArchitectureSet = std::iter::empty().collect();
        assert!(set.is_unknown());
        assert_eq!(set.to_string(), "unknown");
    }

    #[test]
    fn test_set_serializes_as_list() {
        let set: ArchitectureSet = [Architecture::Arm64, Architecture::X86_64]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["x86_64","arm64"]"#);
    }

    proptest! {
        #[test]
        fn machine_decoding_never_panics(s in ".*") {
            let arch = Architecture::from_machine(&s);
            prop_assert!(matches!(
                arch,
                Architecture::X86_64 | Architecture::Arm64 | Architecture::Unknown
            ));
        }

        #[test]
        fn decoded_known_values_round_trip_through_display(s in "(x86_64|amd64|arm64|aarch64)") {
            let arch = Architecture::from_machine(&s);
            prop_assert!(arch.is_known());
            prop_assert_eq!(Architecture::from_machine(arch.as_str()), arch);
        }
    }
}
