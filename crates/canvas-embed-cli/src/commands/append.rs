use anyhow::{bail, Context, Result};

use canvas_embed_core::DocumentKind;

use super::CliContext;

pub async fn execute(
    ctx: CliContext,
    canvas: String,
    target: String,
    nodes: Vec<String>,
) -> Result<()> {
    let canvas_path = ctx.kiln_path(&canvas)?;
    let target_path = ctx.kiln_path(&target)?;
    if DocumentKind::from_path(&target_path) != DocumentKind::Markdown {
        bail!("'{target_path}' is not a markdown document");
    }
    ctx.workspace.set_active(canvas_path.clone());

    let selected = ctx.select_nodes(&canvas_path, &nodes).await?;
    ctx.exporter()
        .append_to(&selected, &canvas_path, &target_path)
        .await
        .with_context(|| format!("Failed to append '{canvas_path}' to '{target_path}'"))?;

    println!("{target_path}");
    Ok(())
}
