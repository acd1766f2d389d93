// src/orchestrator/server.rs

//! Resolving which command starts the server.

use std::path::{Path, PathBuf};

use crate::errors::{LhpciError, Result};
use crate::exec::LaunchSpec;
use crate::fs::FileSystem;

/// Directories searched, in order, for a static build to serve.
pub const BUILD_DIRS: [&str; 3] = ["dist", "build", "lib"];

/// Replaced by the port in an explicit start command.
pub const PORT_PLACEHOLDER: &str = "{port}";

/// First directory of [`BUILD_DIRS`] under `root` that contains an `.html`
/// file.
pub fn find_build_dir(fs: &dyn FileSystem, root: &Path) -> Result<PathBuf> {
    for dir in BUILD_DIRS {
        let candidate = root.join(dir);
        if !fs.is_dir(&candidate) {
            continue;
        }
        let has_html = fs.read_dir(&candidate)?.iter().any(|entry| {
            entry
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("html"))
        });
        if has_html {
            return Ok(PathBuf::from(dir));
        }
    }

    Err(LhpciError::ConfigError(
        "Unable to determine `staticDistDir`; set --start-server-command explicitly".to_string(),
    ))
}

/// Build the launch spec for the server.
///
/// An explicit command runs as given, with `{port}` substituted and `PORT`
/// exported. Without one, the static build directory found under `root` is
/// served by `http-server-spa` on `port`.
pub fn resolve_start_command(
    explicit: Option<&str>,
    port: u16,
    fs: &dyn FileSystem,
    root: &Path,
) -> Result<LaunchSpec> {
    let command = match explicit {
        Some(cmd) => cmd.replace(PORT_PLACEHOLDER, &port.to_string()),
        None => {
            let dir = find_build_dir(fs, root)?;
            println!("Automatically determined ./{} as `staticDistDir`.", dir.display());
            format!("http-server-spa ./{}/ index.html {port}", dir.display())
        }
    };

    Ok(LaunchSpec::new(command)
        .current_dir(root)
        .env("PORT", port.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn explicit_command_gets_port() {
        let fs = MockFileSystem::new();
        let spec =
            resolve_start_command(Some("npm run serve -- --port {port}"), 8080, &fs, Path::new("."))
                .unwrap();
        assert_eq!(spec.command(), "npm run serve -- --port 8080");
        assert!(
            spec.env_overrides()
                .contains(&("PORT".to_string(), "8080".to_string()))
        );
    }

    #[test]
    fn default_serves_first_build_dir_with_html() {
        let fs = MockFileSystem::new();
        fs.add_file("./dist/main.js", "");
        fs.add_file("./build/index.html", "<html/>");
        fs.add_file("./lib/index.html", "<html/>");

        let spec = resolve_start_command(None, 12306, &fs, Path::new(".")).unwrap();
        assert_eq!(spec.command(), "http-server-spa ./build/ index.html 12306");
    }

    #[test]
    fn no_build_dir_is_config_error() {
        let fs = MockFileSystem::new();
        fs.add_file("./dist/app.js", "");
        let err = find_build_dir(&fs, Path::new(".")).unwrap_err();
        assert!(matches!(err, LhpciError::ConfigError(_)));
        assert!(err.to_string().contains("staticDistDir"));
    }
}
