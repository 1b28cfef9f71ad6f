//! Generator configuration and settings

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use wrapgen_checker::{StringBridge, TargetLanguage};
use wrapgen_model::NamingOverrides;

/// Main generator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Targets emitted by a run, in this order
    pub targets: Vec<TargetLanguage>,
    /// Banner template placed above the generated-file notice. `{entity}` and
    /// `{target}` are substituted per file.
    pub header_banner: String,
    /// String bridge per target name
    pub string_bridges: BTreeMap<String, StringBridge>,
    /// `(entity, member)` to native symbol, consulted before derived names
    pub naming_overrides: NamingOverrides,
    /// Options per target name
    pub target_options: BTreeMap<String, TargetConfig>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            targets: TargetLanguage::ALL.to_vec(),
            header_banner: String::new(),
            string_bridges: presets::tw_string_bridges(),
            naming_overrides: NamingOverrides::new(),
            target_options: BTreeMap::new(),
        }
    }
}

/// Partial configuration layered over a base by [`GeneratorConfig::merge`].
/// Unset fields keep the base value; tables are merged key by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverride {
    pub targets: Option<Vec<TargetLanguage>>,
    pub header_banner: Option<String>,
    pub string_bridges: BTreeMap<String, StringBridge>,
    pub naming_overrides: NamingOverrides,
    pub target_options: BTreeMap<String, TargetConfig>,
}

impl ConfigOverride {
    /// Parse an override from TOML text; absent keys stay unset
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e,
        })
    }
}

/// A complete configuration overrides every field
impl From<GeneratorConfig> for ConfigOverride {
    fn from(config: GeneratorConfig) -> Self {
        Self {
            targets: Some(config.targets),
            header_banner: Some(config.header_banner),
            string_bridges: config.string_bridges,
            naming_overrides: config.naming_overrides,
            target_options: config.target_options,
        }
    }
}

/// Target-specific options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetConfig {
    pub options: BTreeMap<String, ConfigValue>,
}

/// Configuration value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    String(String),
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::String(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::String(value.to_string())
    }
}

/// Option keys understood by the emitters
pub mod option_keys {
    /// Namespace enclosing the C++ wrappers
    pub const CPP_NAMESPACE: &str = "namespace";
    /// Header declaring the native C functions, included by every C++ wrapper
    pub const CPP_NATIVE_HEADER: &str = "native_header";
    /// `package` line of Kotlin wrappers
    pub const KOTLIN_PACKAGE: &str = "package";
    /// Package of the cinterop bindings, imported by every Kotlin wrapper
    pub const KOTLIN_NATIVE_PACKAGE: &str = "native_package";
    /// Emit the `@OptIn` annotation required by current Kotlin/Native compilers
    pub const KOTLIN_OPT_IN: &str = "opt_in";
}

impl GeneratorConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e,
        })?;
        Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e,
        })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize { error: e })
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                error: e,
            })?;
        }

        std::fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e,
        })
    }

    /// String bridge configured for `target`
    pub fn bridge(&self, target: TargetLanguage) -> Option<&StringBridge> {
        self.string_bridges.get(target.name())
    }

    /// Bridges keyed by target, in the shape the checker expects
    pub fn bridges(&self) -> BTreeMap<TargetLanguage, StringBridge> {
        self.string_bridges
            .iter()
            .filter_map(|(name, bridge)| Some((name.parse().ok()?, bridge.clone())))
            .collect()
    }

    pub fn set_bridge(&mut self, target: TargetLanguage, bridge: StringBridge) {
        self.string_bridges.insert(target.name().to_string(), bridge);
    }

    /// Get target-specific configuration
    pub fn target_config(&self, target: TargetLanguage) -> TargetConfig {
        self.target_options
            .get(target.name())
            .cloned()
            .unwrap_or_default()
    }

    /// Get target option
    pub fn get_target_option(&self, target: TargetLanguage, key: &str) -> Option<&ConfigValue> {
        self.target_options.get(target.name())?.options.get(key)
    }

    /// Set target option
    pub fn set_target_option(&mut self, target: TargetLanguage, key: &str, value: ConfigValue) {
        self.target_options
            .entry(target.name().to_string())
            .or_default()
            .options
            .insert(key.to_string(), value);
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::invalid("targets", "at least one target is required"));
        }

        let mut seen = BTreeSet::new();
        for target in &self.targets {
            if !seen.insert(*target) {
                return Err(ConfigError::invalid(
                    "targets",
                    format!("`{target}` is listed more than once"),
                ));
            }
        }

        for (name, bridge) in &self.string_bridges {
            if !is_target_name(name) {
                return Err(ConfigError::invalid(
                    "string_bridges",
                    format!("`{name}` is not a target language"),
                ));
            }
            let fields = [
                ("create", &bridge.create),
                ("to_host", &bridge.to_host),
                ("release", &bridge.release),
                ("native_type", &bridge.native_type),
            ];
            if let Some((field, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
                return Err(ConfigError::invalid(
                    format!("string_bridges.{name}.{field}"),
                    "must not be empty",
                ));
            }
        }

        for name in self.target_options.keys() {
            if !is_target_name(name) {
                return Err(ConfigError::invalid(
                    "target_options",
                    format!("`{name}` is not a target language"),
                ));
            }
        }

        if let Some(ConfigValue::String(namespace)) =
            self.get_target_option(TargetLanguage::Cpp, option_keys::CPP_NAMESPACE)
        {
            let valid = !namespace.is_empty()
                && namespace.split("::").all(|segment| {
                    segment
                        .chars()
                        .next()
                        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
                        && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                });
            if !valid {
                return Err(ConfigError::invalid(
                    "target_options.cpp.namespace",
                    format!("`{namespace}` is not a C++ namespace"),
                ));
            }
        }

        Ok(())
    }

    /// Layer `other` over this configuration; whatever `other` sets wins
    pub fn merge(&mut self, other: impl Into<ConfigOverride>) {
        let other = other.into();
        if let Some(targets) = other.targets {
            self.targets = targets;
        }
        if let Some(banner) = other.header_banner {
            self.header_banner = banner;
        }
        self.string_bridges.extend(other.string_bridges);
        self.naming_overrides.merge(other.naming_overrides);

        for (target, config) in other.target_options {
            self.target_options
                .entry(target)
                .or_default()
                .options
                .extend(config.options);
        }
    }
}

/// Tables are keyed by canonical target names only (`kotlin`, not `kt`)
fn is_target_name(name: &str) -> bool {
    name.parse::<TargetLanguage>()
        .map_or(false, |target| target.name() == name)
}

impl TargetConfig {
    /// Get boolean option
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.options.get(key) {
            Some(ConfigValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Get string option
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.options.get(key) {
            Some(ConfigValue::String(value)) => Some(value),
            _ => None,
        }
    }

    /// Set boolean option
    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.options.insert(key.to_string(), ConfigValue::Bool(value));
    }

    /// Set string option
    pub fn set_string(&mut self, key: &str, value: &str) {
        self.options
            .insert(key.to_string(), ConfigValue::String(value.to_string()));
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error for {path:?}: {error}")]
    Io { path: PathBuf, error: std::io::Error },

    #[error("Parse error for {path:?}: {error}")]
    Parse { path: PathBuf, error: toml::de::Error },

    #[error("Serialization error: {error}")]
    Serialize { error: toml::ser::Error },

    #[error("Invalid configuration for {field}: {message}")]
    Invalid { field: String, message: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Predefined configurations
pub mod presets {
    use super::*;

    /// Copyright banner of the Trust Wallet core library
    pub const TRUST_WALLET_BANNER: &str = "Copyright © 2017-2023 Trust Wallet.

This file is part of Trust. The full Trust copyright notice, including
terms governing use, modification, and redistribution, is contained in the
file LICENSE at the root of the source code distribution tree.";

    /// Swift bridge over `TWString`, converting through `NSString`
    pub fn swift_tw_string() -> StringBridge {
        StringBridge::new(
            "TWStringCreateWithNSString",
            "TWStringNSString",
            "TWStringDelete",
            "TWString *",
        )
    }

    /// Kotlin/Native and C++ bridge over `TWString`, converting through UTF-8 bytes
    pub fn utf8_tw_string() -> StringBridge {
        StringBridge::new(
            "TWStringCreateWithUTF8Bytes",
            "TWStringUTF8Bytes",
            "TWStringDelete",
            "TWString *",
        )
    }

    /// `TWString` bridges for every target
    pub fn tw_string_bridges() -> BTreeMap<String, StringBridge> {
        TargetLanguage::ALL
            .iter()
            .map(|&target| {
                let bridge = match target {
                    TargetLanguage::Swift => swift_tw_string(),
                    TargetLanguage::Kotlin | TargetLanguage::Cpp => utf8_tw_string(),
                };
                (target.name().to_string(), bridge)
            })
            .collect()
    }

    /// Configuration matching the Trust Wallet core bindings
    pub fn trust_wallet() -> GeneratorConfig {
        let mut config = GeneratorConfig {
            header_banner: TRUST_WALLET_BANNER.to_string(),
            ..GeneratorConfig::default()
        };
        config.set_target_option(
            TargetLanguage::Cpp,
            option_keys::CPP_NAMESPACE,
            ConfigValue::from("TW"),
        );
        config.set_target_option(
            TargetLanguage::Cpp,
            option_keys::CPP_NATIVE_HEADER,
            ConfigValue::from("TrustWalletCore/{entity}.h"),
        );
        config.set_target_option(
            TargetLanguage::Kotlin,
            option_keys::KOTLIN_PACKAGE,
            ConfigValue::from("com.trustwallet.core"),
        );
        config
    }

    /// Swift only, as used for the iOS bindings
    pub fn swift_only() -> GeneratorConfig {
        GeneratorConfig {
            targets: vec![TargetLanguage::Swift],
            ..trust_wallet()
        }
    }
}
