use crate::{Context, Error};
use anyhow::anyhow;
use poise::serenity_prelude as serenity;

const HISTORY_LIMIT: u64 = 10;

/// Show a user's most recent infractions in this server
#[poise::command(slash_command, guild_only, required_permissions = "MODERATE_MEMBERS")]
pub async fn infractions(
    ctx: Context<'_>,
    #[description = "User to look up"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or_else(|| anyhow!("Infractions are only available in guilds"))?;

    let history = ctx
        .data()
        .ledger
        .history(guild_id, user.id, HISTORY_LIMIT)
        .await?;

    if history.is_empty() {
        ctx.say(format!("<@{}> has no infractions.", user.id.get()))
            .await?;
        return Ok(());
    }

    let mut lines = vec![format!("Recent infractions for <@{}>:", user.id.get())];
    for infraction in history {
        let actor = infraction
            .actor_id
            .map(|id| format!("<@{}>", id))
            .unwrap_or_else(|| "unknown".to_owned());
        let mut line = format!(
            "`#{}` **{}** by {} on {}: {}",
            infraction.id,
            infraction.kind,
            actor,
            infraction.created_at.format("%Y-%m-%d %H:%M"),
            infraction.reason.as_deref().unwrap_or("no reason"),
        );
        if let Some(expires_at) = infraction.expires_at {
            line.push_str(&format!(" (expires {} UTC)", expires_at.format("%Y-%m-%d %H:%M")));
        }
        lines.push(line);
    }

    ctx.send(
        poise::CreateReply::default()
            .content(lines.join("\n"))
            .allowed_mentions(serenity::CreateAllowedMentions::new())
            .ephemeral(true),
    )
    .await?;

    Ok(())
}
