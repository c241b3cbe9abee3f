use anyhow::{Context, Result};

use super::CliContext;

pub async fn execute(ctx: CliContext, canvas: String, nodes: Vec<String>) -> Result<()> {
    let canvas_path = ctx.kiln_path(&canvas)?;
    ctx.workspace.set_active(canvas_path.clone());

    let selected = ctx.select_nodes(&canvas_path, &nodes).await?;
    let created = ctx
        .exporter()
        .export_to_new(&selected, &canvas_path)
        .await
        .with_context(|| format!("Failed to export '{canvas_path}'"))?;

    println!("{created}");
    Ok(())
}
