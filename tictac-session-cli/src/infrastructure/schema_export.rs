use crate::infrastructure::error::{CliError, Result};
use schemars::JsonSchema;
use std::fs;
use std::path::{Path, PathBuf};
use tictac_session_core::GameState;
use tictac_session_p2p::{HandshakeBlob, ProtocolMessage};

/// Write JSON Schemas for every wire and state type into `out`.
/// Returns the files written.
pub fn export_schemas(out: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out)?;
    if !out.is_dir() {
        return Err(CliError::invalid_directory(out.to_path_buf()));
    }

    Ok(vec![
        write_schema::<ProtocolMessage>(out, "protocol_message")?,
        write_schema::<HandshakeBlob>(out, "handshake_blob")?,
        write_schema::<GameState>(out, "game_state")?,
    ])
}

fn write_schema<T: JsonSchema>(out: &Path, name: &str) -> Result<PathBuf> {
    let schema = schemars::schema_for!(T);
    let path = out.join(format!("{}.schema.json", name));

    fs::write(&path, serde_json::to_string_pretty(&schema)?)?;
    tracing::info!("📄 Wrote {}", path.display());
    Ok(path)
}
