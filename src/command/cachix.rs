//! Cachix client configuration and the `watch-exec` push wrapper.

use super::template::{Renderer, vars};
use crate::config::PushSpec;
use crate::error::{BuilderError, Result};
use crate::fs::atomic_write_private;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the rendered client config inside the working directory.
pub const CACHIX_CONFIG_FILE: &str = "cachix.dhall";

const CACHIX_TEMPLATE: &str = include_str!("../../templates/cachix.dhall.tmpl");

/// Template variables for a push target, unescaped.
///
/// `hostname` is every `/`-segment of the target but the last (with a
/// trailing `/`) and `binaryCache` is the last segment.
pub fn template_vars(push: &PushSpec) -> HashMap<String, String> {
    vars([
        ("authToken", push.api_key.clone()),
        ("hostname", push.hostname()),
        ("binaryCache", push.cache_name().to_string()),
        ("secretKey", push.signing_key.clone()),
    ])
}

/// Render the client configuration for `push`.
pub fn render_config(push: &PushSpec, renderer: &dyn Renderer) -> Result<String> {
    renderer
        .render(CACHIX_TEMPLATE, &template_vars(push))
        .map_err(|e| BuilderError::Io(format!("failed to render {}: {}", CACHIX_CONFIG_FILE, e)))
}

/// Render and write the client configuration into `work_dir`.
///
/// Returns the path of the written file.
pub fn write_config(work_dir: &Path, push: &PushSpec, renderer: &dyn Renderer) -> Result<PathBuf> {
    let path = work_dir.join(CACHIX_CONFIG_FILE);
    let content = render_config(push, renderer)?;
    atomic_write_private(&path, content.as_bytes())?;
    debug!("wrote {}", path.display());
    Ok(path)
}

/// Arguments that run the remaining argv under `cachix watch-exec`.
///
/// Everything after the trailing `--` is the wrapped command.
pub fn wrapper_args(push: &PushSpec) -> Vec<String> {
    vec![
        "cachix".to_string(),
        "-c".to_string(),
        format!("./{}", CACHIX_CONFIG_FILE),
        "watch-exec".to_string(),
        push.cache_name().to_string(),
        "--".to_string(),
    ]
}
