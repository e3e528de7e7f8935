use std::{
    env, io,
    path::{Path, PathBuf},
};

use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod format;
pub mod program;
pub mod worker;

/// Logging goes to stderr so it never mixes with match output. `-v` raises
/// the default level to debug; `RUST_LOG` still wins when set.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .init();
}

pub fn absolute_path(path: impl AsRef<Path>) -> io::Result<PathBuf> {
    let path = path.as_ref();
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}
