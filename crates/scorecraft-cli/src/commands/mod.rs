//! CLI subcommand implementations.

pub mod check;
pub mod info;
pub mod render;

/// Reads a script file, mapping the I/O error into the same
/// `anyhow::Result` every command returns.
pub(crate) fn read_script(path: &str) -> anyhow::Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read script '{path}': {e}"))
}
