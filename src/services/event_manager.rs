use crate::services::directory::ObservedUser;
use crate::services::modlog::ModLogKind;
use crate::{Data, Error};
use poise::serenity_prelude as serenity;
use tracing::{info, warn};

/// Gateway events outside of commands: keeps the user directory fresh and
/// feeds membership changes into the moderation log.
pub async fn handle_event(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!("Logged in as {}", data_about_bot.user.name);
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            observe(data, &new_member.user).await;
        }
        serenity::FullEvent::Message { new_message } => {
            if new_message.guild_id.is_some() && !new_message.author.bot {
                observe(data, &new_message.author).await;
            }
        }
        serenity::FullEvent::GuildMemberRemoval { guild_id, user, .. } => {
            data.modlog
                .on_gateway_event(*guild_id, &ObservedUser::from(user), ModLogKind::Kick)
                .await;
        }
        serenity::FullEvent::GuildBanAddition {
            guild_id,
            banned_user,
        } => {
            data.modlog
                .on_gateway_event(
                    *guild_id,
                    &ObservedUser::from(banned_user),
                    ModLogKind::BanReason,
                )
                .await;
        }
        _ => {}
    }

    Ok(())
}

async fn observe(data: &Data, user: &serenity::User) {
    if let Err(e) = data.directory.upsert(&ObservedUser::from(user), true).await {
        warn!("Failed to upsert user {}: {}", user.id, e);
    }
}
