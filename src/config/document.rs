//! Serde model of the JSON build request.
//!
//! Unknown fields are ignored: the controller sends whole database rows
//! (`id`, `builder_id`, `cores`, ...) of which only a few are consumed here.

use serde::Deserialize;

/// Top-level JSON document accepted by `--json`.
///
/// Section presence is checked before deserializing, so the sections
/// themselves are not optional here.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildRequest {
    pub git_config: GitSection,
    pub build_options: BuildOptionsSection,
    pub cachix_config: CachixSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GitSection {
    pub repository: Option<String>,
    pub branch: Option<String>,
    pub gitusername: Option<String>,
    pub gitkey: Option<String>,
    pub noclone: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BuildOptionsSection {
    pub command: Option<String>,
    pub substituters: Vec<SubstituterEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubstituterEntry {
    pub url: String,
    #[serde(default)]
    pub public_signing_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CachixSection {
    /// `None` when the key is absent, `Some(None)` for an explicit `null`.
    #[serde(deserialize_with = "present")]
    pub push: Option<Option<bool>>,
    pub target: Option<String>,
    pub apikey: Option<String>,
    pub signingkey: Option<String>,
}

impl CachixSection {
    /// Pushing is enabled when `push` is absent or `true`. An explicit
    /// `null` disables it like `false`.
    pub fn push_enabled(&self) -> bool {
        match self.push {
            None => true,
            Some(value) => value.unwrap_or(false),
        }
    }
}

/// Marks a key as present, keeping `null` distinguishable from absence.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<bool>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<bool>::deserialize(deserializer).map(Some)
}

/// Names of the sections every request must carry.
pub const REQUIRED_SECTIONS: [&str; 3] = ["git_config", "build_options", "cachix_config"];
