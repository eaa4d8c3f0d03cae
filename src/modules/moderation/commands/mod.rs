pub mod ban;
pub mod history;
pub mod kick;
pub mod modlog;

pub use ban::*;
pub use history::*;
pub use kick::*;
pub use modlog::*;

use crate::error::LedgerError;
use crate::services::directory::ObservedUser;
use crate::services::infractions::ActionContext;
use crate::{Context, Error};
use anyhow::anyhow;
use tracing::warn;

pub(crate) fn action_context(ctx: &Context<'_>) -> Result<ActionContext, Error> {
    let guild_id = ctx
        .guild_id()
        .ok_or_else(|| anyhow!("Moderation commands are only available in guilds"))?;

    Ok(ActionContext {
        guild_id,
        actor: ObservedUser::from(ctx.author()),
    })
}

/// Replies with the outcome of a ledger action. Platform refusals are shown to
/// the moderator; storage failures bubble up to the framework error handler.
pub(crate) async fn reply(
    ctx: Context<'_>,
    result: Result<crate::db::entities::infractions::Model, LedgerError>,
    success: String,
) -> Result<(), Error> {
    match result {
        Ok(infraction) => {
            ctx.say(format!("{} (case #{})", success, infraction.id)).await?;
            Ok(())
        }
        Err(LedgerError::PlatformActionFailed { action, source }) => {
            warn!("Discord rejected {} in guild {:?}: {}", action, ctx.guild_id(), source);
            ctx.say(format!("Could not {} that user: {}", action, source))
                .await?;
            Ok(())
        }
        Err(LedgerError::InvalidDuration(duration)) => {
            ctx.say(format!("A ban of {} cannot be scheduled.", duration))
                .await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
