//! Canonical build configuration.
//!
//! A `BuildConfig` is produced once by [`super::resolve`] and only read
//! afterwards; none of its fields are mutated by the pipeline.

use std::path::{Path, PathBuf};

/// Where and how to fetch the source repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneSpec {
    /// Repository URL as configured (without embedded credentials).
    pub repository: String,
    /// Branch to check out; the remote default branch when `None`.
    pub branch: Option<String>,
    /// Username embedded into the URL together with `key`.
    pub username: Option<String>,
    /// Key or token embedded into the URL together with `username`.
    pub key: Option<String>,
}

/// Binary cache the build results are pushed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushSpec {
    /// Cache URL including the cache name as last path segment.
    pub target: String,
    pub api_key: String,
    pub signing_key: String,
}

impl PushSpec {
    /// Host prefix of the target: every `/`-segment but the last, with a trailing `/`.
    ///
    /// `https://caches.example/mycache` yields `https://caches.example/`.
    pub fn hostname(&self) -> String {
        match self.target.rsplit_once('/') {
            Some((prefix, _)) => format!("{}/", prefix),
            None => String::new(),
        }
    }

    /// Cache name: the last `/`-segment of the target.
    pub fn cache_name(&self) -> &str {
        self.target
            .rsplit_once('/')
            .map_or(self.target.as_str(), |(_, name)| name)
    }
}

/// An extra substituter and the public keys trusted for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substituter {
    pub url: String,
    /// Trusted keys, in first-seen order without duplicates.
    pub trusted_keys: Vec<String>,
}

impl Substituter {
    pub fn new(url: impl Into<String>, keys: impl IntoIterator<Item = String>) -> Self {
        let mut trusted_keys: Vec<String> = Vec::new();
        for key in keys {
            if !trusted_keys.contains(&key) {
                trusted_keys.push(key);
            }
        }
        Self {
            url: url.into(),
            trusted_keys,
        }
    }
}

/// Fully validated configuration for one build invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub(super) work_dir: PathBuf,
    pub(super) clone: Option<CloneSpec>,
    pub(super) build_command: String,
    pub(super) push: Option<PushSpec>,
    pub(super) substituters: Vec<Substituter>,
}

impl BuildConfig {
    /// Local working copy the build runs in.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Repository to synchronize, `None` when cloning is disabled.
    pub fn clone_spec(&self) -> Option<&CloneSpec> {
        self.clone.as_ref()
    }

    pub fn no_clone(&self) -> bool {
        self.clone.is_none()
    }

    /// The build command exactly as configured.
    pub fn build_command(&self) -> &str {
        &self.build_command
    }

    /// Push target, `None` when pushing is disabled.
    pub fn push_spec(&self) -> Option<&PushSpec> {
        self.push.as_ref()
    }

    pub fn no_push(&self) -> bool {
        self.push.is_none()
    }

    pub fn substituters(&self) -> &[Substituter] {
        &self.substituters
    }
}

#[cfg(test)]
impl BuildConfig {
    /// Assemble a config directly, bypassing resolution.
    pub(crate) fn for_tests(
        work_dir: impl Into<PathBuf>,
        clone: Option<CloneSpec>,
        build_command: &str,
        push: Option<PushSpec>,
        substituters: Vec<Substituter>,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            clone,
            build_command: build_command.to_string(),
            push,
            substituters,
        }
    }
}
