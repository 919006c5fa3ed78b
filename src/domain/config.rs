use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration for test-case extraction.
///
/// This struct holds the document conventions the extractor recognizes on
/// top of its built-in set, and the shape of the produced table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Extra guide phrases that mean "all of the following must hold".
    ///
    /// These are recognized in addition to the built-in phrases.
    and_phrases: Vec<String>,

    /// Extra guide phrases that mean "any one of the following holds".
    ///
    /// These are recognized in addition to the built-in phrases.
    or_phrases: Vec<String>,

    /// Extra line prefixes that end an IF or THEN block.
    ///
    /// Documents interleave platform and state-machine annotations with
    /// test conditions. For example `C平台` or `FSM_index`.
    sentinels: Vec<String>,

    /// The output field delimiter.
    pub delimiter: char,

    /// Column titles of the output table, in record field order.
    headers: [String; 5],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            and_phrases: Vec::new(),
            or_phrases: Vec::new(),
            sentinels: Vec::new(),
            delimiter: default_delimiter(),
            headers: default_headers(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Extra AND guide phrases.
    #[must_use]
    pub fn and_phrases(&self) -> &[String] {
        &self.and_phrases
    }

    /// Extra OR guide phrases.
    #[must_use]
    pub fn or_phrases(&self) -> &[String] {
        &self.or_phrases
    }

    /// Extra block-terminating line prefixes.
    #[must_use]
    pub fn sentinels(&self) -> &[String] {
        &self.sentinels
    }

    /// Output column titles.
    #[must_use]
    pub const fn headers(&self) -> &[String; 5] {
        &self.headers
    }
}

const fn default_delimiter() -> char {
    ','
}

fn default_headers() -> [String; 5] {
    ["需求ID", "测试点", "HIL初始条件", "HIL测试步骤", "HIL预期结果"].map(String::from)
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        and_phrases: Vec<String>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        or_phrases: Vec<String>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        sentinels: Vec<String>,

        #[serde(default = "default_delimiter")]
        delimiter: char,

        /// Column titles, in record field order.
        #[serde(default = "default_headers")]
        headers: [String; 5],
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                and_phrases,
                or_phrases,
                sentinels,
                delimiter,
                headers,
            } => Self {
                and_phrases,
                or_phrases,
                sentinels,
                delimiter,
                headers,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            and_phrases: config.and_phrases,
            or_phrases: config.or_phrases,
            sentinels: config.sentinels,
            delimiter: config.delimiter,
            headers: config.headers,
        }
    }
}
