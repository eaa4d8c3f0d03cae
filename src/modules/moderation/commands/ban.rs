use super::{action_context, reply};
use crate::modules::moderation::duration_parser::parse_duration;
use crate::services::directory::ObservedUser;
use crate::services::infractions::BanTarget;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;
use tracing::debug;

/// Discord's JSON error code for "Unknown Member".
const UNKNOWN_MEMBER: isize = 10007;

/// Outcome of resolving the ban target as a guild member.
#[derive(Debug)]
enum MemberLookup {
    Found(ObservedUser),
    NotMember,
    Failed(serenity::Error),
}

impl From<serenity::Result<serenity::Member>> for MemberLookup {
    fn from(result: serenity::Result<serenity::Member>) -> Self {
        match result {
            Ok(member) => MemberLookup::Found(ObservedUser::from(&member.user)),
            Err(e) if is_unknown_member(&e) => MemberLookup::NotMember,
            Err(e) => MemberLookup::Failed(e),
        }
    }
}

fn is_unknown_member(err: &serenity::Error) -> bool {
    matches!(
        err,
        serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response))
            if response.error.code == UNKNOWN_MEMBER
    )
}

/// Users who already left can still be banned, just without a member to log
/// against. Any other lookup failure aborts the ban.
fn ban_target(user_id: serenity::UserId, lookup: MemberLookup) -> Result<BanTarget, Error> {
    match lookup {
        MemberLookup::Found(member) => Ok(BanTarget::Member(member)),
        MemberLookup::NotMember => {
            debug!("User {} is not a guild member, banning by id", user_id);
            Ok(BanTarget::UserId(user_id))
        }
        MemberLookup::Failed(e) => {
            Err(anyhow::Error::new(e).context(format!("Failed to look up member {}", user_id)))
        }
    }
}

/// Ban a user from the server
#[poise::command(slash_command, guild_only, required_permissions = "BAN_MEMBERS")]
pub async fn ban(
    ctx: Context<'_>,
    #[description = "User to ban"] user: serenity::User,
    #[description = "Reason for the ban"] reason: Option<String>,
) -> Result<(), Error> {
    let action = action_context(&ctx)?;

    let lookup = MemberLookup::from(action.guild_id.member(ctx, user.id).await);
    let target = ban_target(user.id, lookup)?;

    let result = ctx.data().ledger.ban(&action, &target, reason).await;
    reply(ctx, result, format!("Banned <@{}>", user.id.get())).await
}

/// Ban a user for a limited time
#[poise::command(slash_command, guild_only, required_permissions = "BAN_MEMBERS")]
pub async fn tempban(
    ctx: Context<'_>,
    #[description = "User to ban"] user: serenity::User,
    #[description = "Duration of the ban (e.g. 1d, 12h, 1w2d)"] duration: String,
    #[description = "Reason for the ban"] reason: Option<String>,
) -> Result<(), Error> {
    let Some(parsed) = parse_duration(&duration) else {
        ctx.say(format!("`{}` is not a valid duration. Try something like `1d12h`.", duration))
            .await?;
        return Ok(());
    };

    let action = action_context(&ctx)?;
    let target = ObservedUser::from(&user);

    let result = ctx
        .data()
        .ledger
        .tempban(&action, &target, reason, parsed)
        .await;
    reply(
        ctx,
        result,
        format!("Banned <@{}> for {}", user.id.get(), duration.trim()),
    )
    .await
}

/// Ban and immediately unban a user to purge their recent messages
#[poise::command(slash_command, guild_only, required_permissions = "BAN_MEMBERS")]
pub async fn softban(
    ctx: Context<'_>,
    #[description = "User to softban"] user: serenity::User,
    #[description = "Reason for the softban"] reason: Option<String>,
) -> Result<(), Error> {
    let action = action_context(&ctx)?;
    let target = ObservedUser::from(&user);

    let result = ctx.data().ledger.softban(&action, &target, reason).await;
    reply(ctx, result, format!("Softbanned <@{}>", user.id.get())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::directory::tests::observed;

    #[test]
    fn test_member_lookup_bans_member() {
        let user_id = serenity::UserId::new(42);
        let target = ban_target(user_id, MemberLookup::Found(observed(42, "alice", 7, "a"))).unwrap();

        assert!(matches!(target, BanTarget::Member(ref member) if member.username == "alice"));
    }

    #[test]
    fn test_unknown_member_falls_back_to_id() {
        let user_id = serenity::UserId::new(42);
        let target = ban_target(user_id, MemberLookup::NotMember).unwrap();

        assert!(matches!(target, BanTarget::UserId(id) if id == user_id));
    }

    #[test]
    fn test_other_lookup_errors_abort_the_ban() {
        let user_id = serenity::UserId::new(42);
        let lookup = MemberLookup::from(Err(serenity::Error::Other("gateway timeout")));
        assert!(matches!(lookup, MemberLookup::Failed(_)));

        let err = ban_target(user_id, lookup).unwrap_err();
        assert_eq!(err.to_string(), "Failed to look up member 42");
    }

    #[test]
    fn test_only_http_errors_can_mean_unknown_member() {
        assert!(!is_unknown_member(&serenity::Error::Other("Unknown Member")));
    }
}
