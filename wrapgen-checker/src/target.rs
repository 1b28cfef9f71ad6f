//! Supported target languages and their native string bridges

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::UnknownTargetError;

/// Closed set of languages wrappers can be emitted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetLanguage {
    Swift,
    Kotlin,
    Cpp,
}

impl TargetLanguage {
    pub const ALL: [TargetLanguage; 3] = [
        TargetLanguage::Swift,
        TargetLanguage::Kotlin,
        TargetLanguage::Cpp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TargetLanguage::Swift => "swift",
            TargetLanguage::Kotlin => "kotlin",
            TargetLanguage::Cpp => "cpp",
        }
    }

    pub fn file_extension(self) -> &'static str {
        match self {
            TargetLanguage::Swift => "swift",
            TargetLanguage::Kotlin => "kt",
            TargetLanguage::Cpp => "hpp",
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetLanguage {
    type Err = UnknownTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "swift" => Ok(TargetLanguage::Swift),
            "kotlin" | "kt" => Ok(TargetLanguage::Kotlin),
            "cpp" | "c++" | "cxx" => Ok(TargetLanguage::Cpp),
            _ => Err(UnknownTargetError {
                target: s.to_string(),
            }),
        }
    }
}

/// Native functions used to move strings across the boundary for one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringBridge {
    /// Builds a native string from a host string
    pub create: String,
    /// Reads a native string back into a host string
    pub to_host: String,
    /// Releases a native string
    pub release: String,
    /// C type of the native string pointer
    pub native_type: String,
}

impl StringBridge {
    pub fn new(
        create: impl Into<String>,
        to_host: impl Into<String>,
        release: impl Into<String>,
        native_type: impl Into<String>,
    ) -> Self {
        Self {
            create: create.into(),
            to_host: to_host.into(),
            release: release.into(),
            native_type: native_type.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("swift".parse::<TargetLanguage>().unwrap(), TargetLanguage::Swift);
        assert_eq!("KT".parse::<TargetLanguage>().unwrap(), TargetLanguage::Kotlin);
        assert_eq!("c++".parse::<TargetLanguage>().unwrap(), TargetLanguage::Cpp);
        assert!("cobol".parse::<TargetLanguage>().is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&TargetLanguage::ALL).unwrap();
        assert_eq!(json, r#"["swift","kotlin","cpp"]"#);
    }
}
