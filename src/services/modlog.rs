use crate::services::directory::ObservedUser;
use crate::services::guilds;
use chrono::NaiveDateTime;
use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info};

/// Which gateway event a debounce stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModLogKind {
    /// Member removal after a kick.
    Kick,
    /// Ban addition, carrying the moderator's reason.
    BanReason,
}

impl ModLogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModLogKind::Kick => "kick",
            ModLogKind::BanReason => "ban_reason",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModLogEvent {
    Kick {
        actor: String,
        reason: String,
    },
    BanReason {
        actor: String,
        temp: bool,
        expires: Option<NaiveDateTime>,
        reason: String,
    },
}

impl ModLogEvent {
    pub fn kind(&self) -> ModLogKind {
        match self {
            ModLogEvent::Kick { .. } => ModLogKind::Kick,
            ModLogEvent::BanReason { .. } => ModLogKind::BanReason,
        }
    }

    /// Title and fields of the log entry posted for this event.
    fn render(&self, target: &ObservedUser) -> (String, Vec<(&'static str, String)>) {
        let user_field = ("User", format!("{} (<@{}>)", target, target.id.get()));
        match self {
            ModLogEvent::Kick { actor, reason } => (
                "Member kicked".to_owned(),
                vec![user_field, ("Moderator", actor.clone()), ("Reason", reason.clone())],
            ),
            ModLogEvent::BanReason {
                actor,
                temp,
                expires,
                reason,
            } => {
                let title = match (temp, expires) {
                    (true, Some(_)) => "Member temporarily banned",
                    (true, None) => "Member softbanned",
                    (false, _) => "Member banned",
                };
                let mut fields = vec![user_field, ("Moderator", actor.clone()), ("Reason", reason.clone())];
                if let Some(expires) = expires {
                    fields.push(("Expires", format!("{} UTC", expires.format("%Y-%m-%d %H:%M:%S"))));
                }
                (title.to_owned(), fields)
            }
        }
    }
}

/// Moderation-log side channel used by the infraction ledger.
#[async_trait::async_trait]
pub trait ModLogSink: Send + Sync {
    /// Posts `event` for `target` and suppresses the matching gateway event
    /// for a short window. Never fails; delivery problems are only logged.
    async fn create_debounce(
        &self,
        guild_id: serenity::GuildId,
        target: &ObservedUser,
        event: ModLogEvent,
    );
}

type DebounceKey = (u64, u64, ModLogKind);

/// Pending debounces keyed by (guild, user, kind).
pub struct Debouncer {
    entries: DashMap<DebounceKey, Instant>,
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            window,
        }
    }

    pub fn register(&self, guild_id: serenity::GuildId, user_id: serenity::UserId, kind: ModLogKind) {
        self.entries
            .insert((guild_id.get(), user_id.get(), kind), Instant::now());
    }

    /// Consumes a pending debounce. True when one existed and was still fresh.
    pub fn take(&self, guild_id: serenity::GuildId, user_id: serenity::UserId, kind: ModLogKind) -> bool {
        match self.entries.remove(&(guild_id.get(), user_id.get(), kind)) {
            Some((_, created)) => created.elapsed() < self.window,
            None => false,
        }
    }

    /// Drops entries older than the window. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let before = self.entries.len();
        let window = self.window;
        self.entries.retain(|_, created| created.elapsed() < window);
        before - self.entries.len()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Posts moderation-log entries to each guild's configured log channel.
pub struct ModLogService {
    db: DatabaseConnection,
    http: Arc<serenity::Http>,
    debouncer: Arc<Debouncer>,
}

impl ModLogService {
    pub fn new(db: DatabaseConnection, http: Arc<serenity::Http>, window: Duration) -> Self {
        Self {
            db,
            http,
            debouncer: Arc::new(Debouncer::new(window)),
        }
    }

    /// Starts the background task that drops stale debounces.
    pub fn start_prune_runner(&self) {
        let debouncer = self.debouncer.clone();
        tokio::spawn(async move {
            info!("Mod-log debounce prune runner started.");
            loop {
                sleep(Duration::from_secs(30)).await;
                let removed = debouncer.prune();
                if removed > 0 {
                    debug!("Pruned {} stale mod-log debounce(s)", removed);
                }
            }
        });
    }

    /// Called for gateway events that may have been caused by the bot itself.
    /// A fresh debounce swallows the event; otherwise a generic entry is posted.
    pub async fn on_gateway_event(
        &self,
        guild_id: serenity::GuildId,
        user: &ObservedUser,
        kind: ModLogKind,
    ) {
        if self.debouncer.take(guild_id, user.id, kind) {
            debug!(
                "Suppressed {} gateway event for user {} in guild {}",
                kind.as_str(),
                user.id,
                guild_id
            );
            return;
        }

        let title = match kind {
            ModLogKind::Kick => "Member left",
            ModLogKind::BanReason => "Member banned",
        };
        let fields = vec![("User", format!("{} (<@{}>)", user, user.id.get()))];
        self.post(guild_id, title, fields).await;
    }

    async fn post(&self, guild_id: serenity::GuildId, title: &str, fields: Vec<(&str, String)>) {
        let channel_id = match guilds::log_channel(&self.db, guild_id).await {
            Ok(Some(channel_id)) => channel_id,
            Ok(None) => return, // No log channel configured
            Err(e) => {
                error!("Failed to load log channel for guild {}: {:?}", guild_id, e);
                return;
            }
        };

        let mut embed = serenity::CreateEmbed::new()
            .title(title)
            .colour(0x95a5a6)
            .timestamp(serenity::Timestamp::now());
        for (name, value) in fields {
            embed = embed.field(name, value, false);
        }

        let message = serenity::CreateMessage::new()
            .embed(embed)
            .allowed_mentions(serenity::CreateAllowedMentions::new());

        if let Err(e) = channel_id.send_message(&*self.http, message).await {
            error!(
                "Failed to post mod-log entry to channel {} in guild {}: {:?}",
                channel_id, guild_id, e
            );
        }
    }
}

#[async_trait::async_trait]
impl ModLogSink for ModLogService {
    async fn create_debounce(
        &self,
        guild_id: serenity::GuildId,
        target: &ObservedUser,
        event: ModLogEvent,
    ) {
        self.debouncer.register(guild_id, target.id, event.kind());
        let (title, fields) = event.render(target);
        self.post(guild_id, &title, fields).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::directory::tests::observed;

    fn ids() -> (serenity::GuildId, serenity::UserId) {
        (serenity::GuildId::new(1), serenity::UserId::new(2))
    }

    #[test]
    fn test_debounce_is_consumed_once() {
        let debouncer = Debouncer::new(Duration::from_secs(60));
        let (guild, user) = ids();

        debouncer.register(guild, user, ModLogKind::BanReason);

        assert!(!debouncer.take(guild, user, ModLogKind::Kick));
        assert!(debouncer.take(guild, user, ModLogKind::BanReason));
        assert!(!debouncer.take(guild, user, ModLogKind::BanReason));
    }

    #[test]
    fn test_expired_debounce_does_not_suppress() {
        let debouncer = Debouncer::new(Duration::ZERO);
        let (guild, user) = ids();

        debouncer.register(guild, user, ModLogKind::Kick);

        assert!(!debouncer.take(guild, user, ModLogKind::Kick));
    }

    #[test]
    fn test_prune_drops_stale_entries() {
        let stale = Debouncer::new(Duration::ZERO);
        let fresh = Debouncer::new(Duration::from_secs(60));
        let (guild, user) = ids();

        stale.register(guild, user, ModLogKind::Kick);
        fresh.register(guild, user, ModLogKind::Kick);

        assert_eq!(stale.prune(), 1);
        assert_eq!(stale.len(), 0);
        assert_eq!(fresh.prune(), 0);
        assert_eq!(fresh.len(), 1);
    }

    #[test]
    fn test_render_tempban_includes_expiry() {
        let target = observed(2, "alice", 7, "a");
        let expires = chrono::NaiveDate::from_ymd_opt(2030, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let event = ModLogEvent::BanReason {
            actor: "mod#0001".to_owned(),
            temp: true,
            expires: Some(expires),
            reason: "no reason".to_owned(),
        };

        let (title, fields) = event.render(&target);

        assert_eq!(title, "Member temporarily banned");
        assert_eq!(fields[0], ("User", "alice#0007 (<@2>)".to_owned()));
        assert!(fields.contains(&("Expires", "2030-01-02 03:04:05 UTC".to_owned())));
    }

    #[test]
    fn test_render_kick_and_softban_titles() {
        let target = observed(2, "alice", 7, "a");
        let kick = ModLogEvent::Kick {
            actor: "mod#0001".to_owned(),
            reason: "spam".to_owned(),
        };
        let softban = ModLogEvent::BanReason {
            actor: "mod#0001".to_owned(),
            temp: true,
            expires: None,
            reason: "spam".to_owned(),
        };

        assert_eq!(kick.kind().as_str(), "kick");
        assert_eq!(kick.render(&target).0, "Member kicked");
        assert_eq!(softban.kind().as_str(), "ban_reason");
        assert_eq!(softban.render(&target).0, "Member softbanned");
        assert!(!softban.render(&target).1.iter().any(|(name, _)| *name == "Expires"));
    }
}
