//! Resolution of flag or JSON input into a `BuildConfig`.

use super::document::{BuildRequest, REQUIRED_SECTIONS};
use super::model::{BuildConfig, CloneSpec, PushSpec, Substituter};
use super::schema::Validator;
use crate::cli::FlagInputs;
use crate::error::ConfigError;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// How required fields are named in error messages for one input source.
struct FieldNames {
    repository: &'static str,
    command: &'static str,
    target: &'static str,
    api_key: &'static str,
    signing_key: &'static str,
    unless_no_clone: &'static str,
    unless_no_push: &'static str,
}

const FLAG_FIELDS: FieldNames = FieldNames {
    repository: "--repository",
    command: "--command",
    target: "--target",
    api_key: "--api-key",
    signing_key: "--signing-key",
    unless_no_clone: "unless --no-clone is set",
    unless_no_push: "unless --no-push is set",
};

const JSON_FIELDS: FieldNames = FieldNames {
    repository: "git_config.repository",
    command: "build_options.command",
    target: "cachix_config.target",
    api_key: "cachix_config.apikey",
    signing_key: "cachix_config.signingkey",
    unless_no_clone: "unless git_config.noclone is true",
    unless_no_push: "unless cachix_config.push is false",
};

/// Source-independent view of the inputs, before invariants are enforced.
struct RawSettings {
    no_clone: bool,
    repository: Option<String>,
    branch: Option<String>,
    username: Option<String>,
    key: Option<String>,
    command: Option<String>,
    no_push: bool,
    target: Option<String>,
    api_key: Option<String>,
    signing_key: Option<String>,
    substituters: Vec<Substituter>,
}

/// Resolve the flag inputs (and the optional `--json` document they carry)
/// into a validated `BuildConfig`.
///
/// Performs no I/O apart from making the working directory path absolute.
pub fn resolve(flags: &FlagInputs, validator: &dyn Validator) -> Result<BuildConfig, ConfigError> {
    let (raw, names) = match &flags.json {
        Some(json) => {
            let extra = flags.explicit_flags();
            if !extra.is_empty() {
                return Err(ConfigError::MutuallyExclusive { flags: extra });
            }
            debug!("resolving configuration from JSON document");
            (settings_from_json(json, validator)?, &JSON_FIELDS)
        }
        None => {
            debug!("resolving configuration from flags");
            (settings_from_flags(flags)?, &FLAG_FIELDS)
        }
    };

    finish(&flags.dir, raw, names)
}

fn settings_from_flags(flags: &FlagInputs) -> Result<RawSettings, ConfigError> {
    let substituters = pair_substituters(&flags.substituter, &flags.trusted_key)?;

    Ok(RawSettings {
        no_clone: flags.no_clone,
        repository: non_empty(&flags.repository),
        branch: non_empty(&flags.branch),
        username: non_empty(&flags.git_user),
        key: non_empty(&flags.git_key),
        command: flags.command.clone(),
        no_push: flags.no_push,
        target: non_empty(&flags.target),
        api_key: non_empty(&flags.api_key),
        signing_key: non_empty(&flags.signing_key),
        substituters,
    })
}

/// Pair the i-th `--substituter` with the i-th `--trusted-key`.
fn pair_substituters(urls: &[String], keys: &[String]) -> Result<Vec<Substituter>, ConfigError> {
    if urls.len() != keys.len() {
        return Err(ConfigError::SubstituterMismatch {
            substituters: urls.len(),
            trusted_keys: keys.len(),
        });
    }

    urls.iter()
        .zip(keys)
        .map(|(url, key)| checked_substituter(url, std::slice::from_ref(key)))
        .collect()
}

fn settings_from_json(json: &str, validator: &dyn Validator) -> Result<RawSettings, ConfigError> {
    let document: Value =
        serde_json::from_str(json).map_err(|e| ConfigError::InvalidJson(e.to_string()))?;

    validator
        .validate(&document)
        .map_err(ConfigError::SchemaValidation)?;

    for section in REQUIRED_SECTIONS {
        if document.get(section).is_none_or(Value::is_null) {
            return Err(ConfigError::MissingSection(section));
        }
    }

    let request: BuildRequest =
        serde_json::from_value(document).map_err(|e| ConfigError::InvalidJson(e.to_string()))?;

    let substituters = request
        .build_options
        .substituters
        .iter()
        .map(|entry| checked_substituter(&entry.url, &entry.public_signing_keys))
        .collect::<Result<Vec<_>, _>>()?;

    let git = request.git_config;
    let cachix = request.cachix_config;
    Ok(RawSettings {
        no_clone: git.noclone.unwrap_or(false),
        repository: non_empty(&git.repository),
        branch: non_empty(&git.branch),
        username: non_empty(&git.gitusername),
        key: non_empty(&git.gitkey),
        command: request.build_options.command,
        no_push: !cachix.push_enabled(),
        target: non_empty(&cachix.target),
        api_key: non_empty(&cachix.apikey),
        signing_key: non_empty(&cachix.signingkey),
        substituters,
    })
}

fn checked_substituter(url: &str, keys: &[String]) -> Result<Substituter, ConfigError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ConfigError::InvalidSubstituter(
            "substituter URL must not be empty".to_string(),
        ));
    }

    let keys: Vec<String> = keys
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();
    if keys.is_empty() {
        return Err(ConfigError::InvalidSubstituter(format!(
            "substituter '{}' needs at least one trusted key",
            url
        )));
    }

    Ok(Substituter::new(url, keys))
}

/// Enforce the completeness invariants and build the final config.
fn finish(dir: &Path, raw: RawSettings, names: &FieldNames) -> Result<BuildConfig, ConfigError> {
    let work_dir = std::path::absolute(dir).map_err(|e| ConfigError::InvalidWorkDir {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let clone = if raw.no_clone {
        None
    } else {
        let repository = require(raw.repository, names.repository, names.unless_no_clone)?;
        Some(CloneSpec {
            repository,
            branch: raw.branch,
            username: raw.username,
            key: raw.key,
        })
    };

    let build_command = match raw.command {
        Some(command) if command.trim().is_empty() => return Err(ConfigError::EmptyCommand),
        Some(command) => command.trim().to_string(),
        None => {
            return Err(ConfigError::MissingField {
                field: names.command.to_string(),
                reason: "to run a build".to_string(),
            });
        }
    };

    let push = if raw.no_push {
        None
    } else {
        let spec = PushSpec {
            target: require(raw.target, names.target, names.unless_no_push)?,
            api_key: require(raw.api_key, names.api_key, names.unless_no_push)?,
            signing_key: require(raw.signing_key, names.signing_key, names.unless_no_push)?,
        };
        if spec.hostname().len() <= 1 || spec.cache_name().is_empty() {
            return Err(ConfigError::InvalidTarget(spec.target));
        }
        Some(spec)
    };

    Ok(BuildConfig {
        work_dir,
        clone,
        build_command,
        push,
        substituters: raw.substituters,
    })
}

fn require(value: Option<String>, field: &str, reason: &str) -> Result<String, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingField {
        field: field.to_string(),
        reason: reason.to_string(),
    })
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
