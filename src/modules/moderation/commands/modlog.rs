use crate::services::guilds;
use crate::{Context, Error};
use anyhow::anyhow;
use poise::serenity_prelude as serenity;
use tracing::info;

/// Set or clear the channel that receives moderation log entries
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn modlog(
    ctx: Context<'_>,
    #[description = "Log channel (leave empty to disable)"] channel: Option<serenity::Channel>,
) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or_else(|| anyhow!("Mod log configuration is only available in guilds"))?;
    let channel_id = channel.map(|c| c.id());

    guilds::set_log_channel(&ctx.data().db, guild_id, channel_id).await?;
    info!("Mod log channel for guild {} set to {:?}", guild_id, channel_id);

    match channel_id {
        Some(id) => ctx.say(format!("Moderation log will be posted in <#{}>.", id.get())).await?,
        None => ctx.say("Moderation log disabled.").await?,
    };

    Ok(())
}
