//! Locating and loading the daemon configuration.

use std::path::{Path, PathBuf};

use crate::controller::Popd;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "POPD_CONFIG";

/// Files tried, in order, when neither `--config` nor [`CONFIG_ENV`] is set
pub const DEFAULT_PATHS: [&str; 2] = ["./popd.config.ron", "/etc/popd/popd.config.ron"];

///
/// Find the configuration file using the following precedence:
/// 1. `explicit`, from the command line
/// 2. `from_env`, the value of [`CONFIG_ENV`]
/// 3. each of `defaults` that exists
///
/// An explicit or environment path that does not exist is an error, while
/// finding none of the defaults gives `Ok(None)`.
///
/// # Errors
/// If an explicitly named file does not exist
///
pub fn find_config_file(
    explicit: Option<&Path>,
    from_env: Option<PathBuf>,
    defaults: &[PathBuf],
) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(Some(path.to_path_buf()));
        }
        anyhow::bail!("Config file does not exist: {}", path.display());
    }

    if let Some(path) = from_env {
        if path.exists() {
            return Ok(Some(path));
        }
        anyhow::bail!(
            "{CONFIG_ENV} points to non-existent file: {}",
            path.display()
        );
    }

    Ok(defaults.iter().find(|path| path.exists()).cloned())
}

///
/// Read and parse a RON configuration file
///
/// # Errors
/// If the file cannot be read or is not a valid configuration
///
pub fn load(path: &Path) -> anyhow::Result<Popd> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        anyhow::anyhow!("Failed to read config from {}: {}", path.display(), e)
    })?;

    ron::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid config in {}: {}", path.display(), e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("explicit.ron");
        let env = dir.path().join("env.ron");
        std::fs::write(&explicit, "()").unwrap();
        std::fs::write(&env, "()").unwrap();

        let found = find_config_file(Some(&explicit), Some(env), &[]).unwrap();
        assert_eq!(found, Some(explicit));
    }

    #[test]
    fn test_missing_named_paths_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.ron");

        assert!(find_config_file(Some(&missing), None, &[]).is_err());
        assert!(find_config_file(None, Some(missing), &[]).is_err());
    }

    #[test]
    fn test_defaults_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.ron");
        let second = dir.path().join("second.ron");
        std::fs::write(&second, "()").unwrap();

        let defaults = vec![first.clone(), second.clone()];
        assert_eq!(find_config_file(None, None, &defaults).unwrap(), Some(second));

        std::fs::write(&first, "()").unwrap();
        assert_eq!(find_config_file(None, None, &defaults).unwrap(), Some(first));

        assert_eq!(
            find_config_file(None, None, &[dir.path().join("none.ron")]).unwrap(),
            None
        );
    }

    #[test]
    fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("popd.config.ron");
        std::fs::write(
            &path,
            r#"Popd (
                pop3: (
                    listeners: [
                        (
                            socket: "127.0.0.1:1110",
                            args: (banner: "mail.example.com"),
                        ),
                    ],
                ),
                store: Memory(users: [(name: "alice", secret: "wonderland")]),
            )"#,
        )
        .unwrap();

        let popd = load(&path).unwrap();
        let listeners = popd.listeners();
        assert_eq!(listeners.len(), 1);
        assert_eq!(listeners[0].socket().port(), 1110);
        assert_eq!(listeners[0].args().banner(), "mail.example.com");

        std::fs::write(&path, "Popd (pop3: oops)").unwrap();
        assert!(load(&path).is_err());
        assert!(load(&dir.path().join("missing.ron")).is_err());
    }
}
