use super::{action_context, reply};
use crate::services::directory::ObservedUser;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;

/// Kick a user from the server
#[poise::command(slash_command, guild_only, required_permissions = "KICK_MEMBERS")]
pub async fn kick(
    ctx: Context<'_>,
    #[description = "User to kick"] user: serenity::User,
    #[description = "Reason for the kick"] reason: Option<String>,
) -> Result<(), Error> {
    let action = action_context(&ctx)?;
    let target = ObservedUser::from(&user);

    let result = ctx.data().ledger.kick(&action, &target, reason).await;
    reply(ctx, result, format!("Kicked <@{}>", user.id.get())).await
}
