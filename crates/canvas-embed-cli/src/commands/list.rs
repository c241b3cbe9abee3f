use anyhow::Result;

use canvas_embed_core::{CommandContext, EmbedCommand};

pub async fn execute(active: Option<String>, selected: usize) -> Result<()> {
    let ctx = CommandContext::new(active).with_selection(selected);
    let commands = EmbedCommand::applicable(&ctx);

    if commands.is_empty() {
        eprintln!("No commands available");
        return Ok(());
    }
    for command in commands {
        println!("{}\t{}", command.id(), command.name());
    }
    Ok(())
}
