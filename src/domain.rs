use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SodarError;

fn uuid_regex() -> &'static Regex {
    static UUID_RE: OnceLock<Regex> = OnceLock::new();
    UUID_RE.get_or_init(|| {
        Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
    })
}

/// Returns `true` if `value` is a UUID in canonical (lowercase, hyphenated) form.
pub fn is_uuid(value: &str) -> bool {
    uuid_regex().is_match(value)
}

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = SodarError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                if !is_uuid(value) {
                    return Err(SodarError::InvalidUuid(value.to_string()));
                }
                Ok(Self(value.to_string()))
            }
        }

        impl TryFrom<String> for $name {
            type Error = SodarError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

uuid_newtype!(
    /// UUID of a SODAR project.
    ProjectUuid
);
uuid_newtype!(
    /// UUID of an assay within a project's sample sheet.
    AssayUuid
);
uuid_newtype!(LandingZoneUuid);

/// Human-readable size with binary prefixes, e.g. `1.5KiB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 8] = ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "Zi"];
    let mut value = bytes as f64;
    for unit in UNITS {
        if value.abs() < 1024.0 {
            return format!("{value:.1}{unit}B");
        }
        value /= 1024.0;
    }
    format!("{value:.1}YiB")
}
