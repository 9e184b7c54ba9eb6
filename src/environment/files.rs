//! On-disk layout for layer environment scopes

use crate::environment::scope::{EnvEntry, ModifyOp, Scope};
use crate::environment::LayerEnv;
use crate::error::{PackError, PackResult};
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

const DELIM_SUFFIX: &str = "delim";

/// Write every non-empty scope of `env` under `layer_dir`
pub async fn write_layer_env(layer_dir: &Path, env: &LayerEnv) -> PackResult<()> {
    for scope in Scope::all() {
        let entries = env.scope(scope);
        if entries.is_empty() {
            continue;
        }

        let dir = layer_dir.join(scope.dir_name());
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| PackError::io(format!("creating {}", dir.display()), e))?;

        for (key, entry) in entries.iter() {
            let path = dir.join(format!("{}.{}", key, entry.op.suffix()));
            fs::write(&path, &entry.value)
                .await
                .map_err(|e| PackError::io(format!("writing {}", path.display()), e))?;

            if let Some(delimiter) = &entry.delimiter {
                let path = dir.join(format!("{}.{}", key, DELIM_SUFFIX));
                fs::write(&path, delimiter)
                    .await
                    .map_err(|e| PackError::io(format!("writing {}", path.display()), e))?;
            }
        }

        debug!(
            "Wrote {} {} entries to {}",
            entries.len(),
            scope,
            dir.display()
        );
    }

    Ok(())
}

/// Read the scopes a previous build left under `layer_dir`.
///
/// Missing scope directories are empty scopes. Files with an unknown
/// suffix are skipped.
pub async fn read_layer_env(layer_dir: &Path) -> PackResult<LayerEnv> {
    let mut env = LayerEnv::new();

    for scope in Scope::all() {
        let dir = layer_dir.join(scope.dir_name());
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        let mut delimiters = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PackError::io(format!("reading {}", dir.display()), e))?
        {
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some((key, suffix)) = file_name.rsplit_once('.') else {
                continue;
            };

            let value = fs::read_to_string(&path)
                .await
                .map_err(|e| PackError::io(format!("reading {}", path.display()), e))?;

            if suffix == DELIM_SUFFIX {
                delimiters.push((key.to_string(), value));
                continue;
            }

            match ModifyOp::from_suffix(suffix) {
                Some(op) => env.scope_mut(scope).insert_entry(
                    key.to_string(),
                    EnvEntry {
                        value,
                        op,
                        delimiter: None,
                    },
                ),
                None => warn!("Skipping unknown env file {}", path.display()),
            }
        }

        for (key, delimiter) in delimiters {
            if let Some(entry) = env.scope(scope).entry(&key).cloned() {
                env.scope_mut(scope).insert_entry(
                    key,
                    EnvEntry {
                        delimiter: Some(delimiter),
                        ..entry
                    },
                );
            }
        }
    }

    Ok(env)
}
