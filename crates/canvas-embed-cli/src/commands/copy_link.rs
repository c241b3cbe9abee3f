use anyhow::{Context, Result};
use tracing::warn;

use canvas_embed_core::export::node_link;
use canvas_embed_core::store::file_name;

use super::CliContext;
use crate::host::TerminalClipboard;

/// Copies the node link and prints it. A missing terminal clipboard is not
/// fatal: the printed link is the fallback.
pub async fn execute(ctx: CliContext, canvas: String, node_id: String) -> Result<()> {
    let canvas_path = ctx.kiln_path(&canvas)?;
    ctx.workspace.set_active(canvas_path.clone());

    let node = ctx
        .loader()
        .find_node(&canvas_path, &node_id)
        .await
        .with_context(|| format!("Failed to look up node '{node_id}'"))?;

    let link = match ctx
        .exporter()
        .copy_node_link(&node, &TerminalClipboard::detect())
        .await
    {
        Ok(link) => link,
        Err(e) => {
            warn!(error = %e, "Clipboard unavailable");
            node_link(&node, file_name(&canvas_path))
        }
    };

    println!("{link}");
    Ok(())
}
