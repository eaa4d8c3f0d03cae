use crate::db::entities::infractions::{self, InfractionType};
use crate::error::LedgerError;
use crate::services::directory::{ObservedUser, UserDirectory};
use crate::services::guilds;
use crate::services::modlog::{ModLogEvent, ModLogSink};
use crate::services::platform::ModerationPlatform;
use chrono::{Duration, NaiveDateTime, Utc};
use poise::serenity_prelude as serenity;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;
use tracing::{error, info};

const NO_REASON: &str = "no reason";

/// Who is acting, and where.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub guild_id: serenity::GuildId,
    pub actor: ObservedUser,
}

/// Target of a ban. Users who already left the guild can only be banned by id.
#[derive(Debug, Clone)]
pub enum BanTarget {
    Member(ObservedUser),
    UserId(serenity::UserId),
}

impl BanTarget {
    pub fn user_id(&self) -> serenity::UserId {
        match self {
            BanTarget::Member(user) => user.id,
            BanTarget::UserId(id) => *id,
        }
    }
}

/// Records moderation actions. Every routine upserts the target, notifies the
/// mod log, performs the platform call and only then writes the infraction row.
pub struct InfractionLedger {
    db: DatabaseConnection,
    directory: Arc<UserDirectory>,
    modlog: Arc<dyn ModLogSink>,
    platform: Arc<dyn ModerationPlatform>,
    softban_purge_days: u8,
}

impl InfractionLedger {
    pub fn new(
        db: DatabaseConnection,
        directory: Arc<UserDirectory>,
        modlog: Arc<dyn ModLogSink>,
        platform: Arc<dyn ModerationPlatform>,
        softban_purge_days: u8,
    ) -> Self {
        Self {
            db,
            directory,
            modlog,
            platform,
            softban_purge_days,
        }
    }

    pub async fn kick(
        &self,
        ctx: &ActionContext,
        member: &ObservedUser,
        reason: Option<String>,
    ) -> Result<infractions::Model, LedgerError> {
        self.prepare(ctx, Some(member)).await?;

        self.modlog
            .create_debounce(
                ctx.guild_id,
                member,
                ModLogEvent::Kick {
                    actor: ctx.actor.to_string(),
                    reason: reason_or_default(&reason),
                },
            )
            .await;

        self.platform
            .kick(ctx.guild_id, member.id, reason.as_deref())
            .await
            .map_err(|e| LedgerError::platform("kick", e))?;

        self.record(ctx, member.id, InfractionType::Kick, reason, Utc::now().naive_utc(), None)
            .await
    }

    pub async fn tempban(
        &self,
        ctx: &ActionContext,
        member: &ObservedUser,
        reason: Option<String>,
        duration: Duration,
    ) -> Result<infractions::Model, LedgerError> {
        let now = Utc::now().naive_utc();
        let expires_at = now
            .checked_add_signed(duration)
            .filter(|expires_at| *expires_at > now)
            .ok_or(LedgerError::InvalidDuration(duration))?;

        self.prepare(ctx, Some(member)).await?;

        self.modlog
            .create_debounce(
                ctx.guild_id,
                member,
                ModLogEvent::BanReason {
                    actor: ctx.actor.to_string(),
                    temp: true,
                    expires: Some(expires_at),
                    reason: reason_or_default(&reason),
                },
            )
            .await;

        self.platform
            .ban(ctx.guild_id, member.id, 0, reason.as_deref())
            .await
            .map_err(|e| LedgerError::platform("ban", e))?;

        self.record(ctx, member.id, InfractionType::TempBan, reason, now, Some(expires_at))
            .await
    }

    /// Bans with message purge, then lifts the ban straight away.
    pub async fn softban(
        &self,
        ctx: &ActionContext,
        member: &ObservedUser,
        reason: Option<String>,
    ) -> Result<infractions::Model, LedgerError> {
        self.prepare(ctx, Some(member)).await?;

        self.modlog
            .create_debounce(
                ctx.guild_id,
                member,
                ModLogEvent::BanReason {
                    actor: ctx.actor.to_string(),
                    temp: true,
                    expires: None,
                    reason: reason_or_default(&reason),
                },
            )
            .await;

        self.platform
            .ban(ctx.guild_id, member.id, self.softban_purge_days, reason.as_deref())
            .await
            .map_err(|e| LedgerError::platform("ban", e))?;

        self.platform
            .unban(ctx.guild_id, member.id)
            .await
            .map_err(|e| LedgerError::platform("unban", e))?;

        self.record(ctx, member.id, InfractionType::SoftBan, reason, Utc::now().naive_utc(), None)
            .await
    }

    pub async fn ban(
        &self,
        ctx: &ActionContext,
        target: &BanTarget,
        reason: Option<String>,
    ) -> Result<infractions::Model, LedgerError> {
        match target {
            BanTarget::Member(member) => {
                self.prepare(ctx, Some(member)).await?;
                self.modlog
                    .create_debounce(
                        ctx.guild_id,
                        member,
                        ModLogEvent::BanReason {
                            actor: ctx.actor.to_string(),
                            temp: false,
                            expires: None,
                            reason: reason_or_default(&reason),
                        },
                    )
                    .await;
            }
            // No member context to attach a log entry to.
            BanTarget::UserId(_) => self.prepare(ctx, None).await?,
        }

        let user_id = target.user_id();
        self.platform
            .ban(ctx.guild_id, user_id, 0, reason.as_deref())
            .await
            .map_err(|e| LedgerError::platform("ban", e))?;

        self.record(ctx, user_id, InfractionType::Ban, reason, Utc::now().naive_utc(), None)
            .await
    }

    /// A user's infractions in a guild, newest first.
    pub async fn history(
        &self,
        guild_id: serenity::GuildId,
        user_id: serenity::UserId,
        limit: u64,
    ) -> Result<Vec<infractions::Model>, LedgerError> {
        Ok(infractions::Entity::find()
            .filter(infractions::Column::GuildId.eq(guild_id.get() as i64))
            .filter(infractions::Column::UserId.eq(user_id.get() as i64))
            .order_by_desc(infractions::Column::CreatedAt)
            .order_by_desc(infractions::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    /// Rows the infraction will reference must exist before the irreversible
    /// platform call, so a storage failure here aborts the whole action.
    async fn prepare(
        &self,
        ctx: &ActionContext,
        target: Option<&ObservedUser>,
    ) -> Result<(), LedgerError> {
        if let Some(target) = target {
            self.directory.upsert(target, true).await?;
        }
        self.directory.upsert(&ctx.actor, true).await?;
        guilds::ensure_guild(&self.db, ctx.guild_id).await?;
        Ok(())
    }

    async fn record(
        &self,
        ctx: &ActionContext,
        user_id: serenity::UserId,
        kind: InfractionType,
        reason: Option<String>,
        created_at: NaiveDateTime,
        expires_at: Option<NaiveDateTime>,
    ) -> Result<infractions::Model, LedgerError> {
        let model = infractions::ActiveModel {
            guild_id: Set(ctx.guild_id.get() as i64),
            user_id: Set(user_id.get() as i64),
            actor_id: Set(Some(ctx.actor.id.get() as i64)),
            kind: Set(kind),
            reason: Set(reason),
            expires_at: Set(expires_at),
            created_at: Set(created_at),
            active: Set(true),
            ..Default::default()
        };

        match model.insert(&self.db).await {
            Ok(infraction) => {
                info!(
                    "Recorded {} infraction #{} against user {} in guild {} by {}",
                    kind, infraction.id, user_id, ctx.guild_id, ctx.actor.id
                );
                Ok(infraction)
            }
            Err(e) => {
                // The platform action already happened; only the audit row is missing.
                error!(
                    "Platform {} of user {} in guild {} succeeded but recording it failed: {:?}",
                    kind, user_id, ctx.guild_id, e
                );
                Err(e.into())
            }
        }
    }
}

fn reason_or_default(reason: &Option<String>) -> String {
    reason.clone().unwrap_or_else(|| NO_REASON.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModerationConfig;
    use crate::db::entities::users;
    use crate::db::test_connection;
    use crate::services::directory::tests::observed;
    use sea_orm::PaginatorTrait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    enum PlatformCall {
        Kick(u64),
        Ban { user: u64, delete_message_days: u8 },
        Unban(u64),
    }

    #[derive(Default)]
    struct FakePlatform {
        calls: Mutex<Vec<PlatformCall>>,
        fail: AtomicBool,
    }

    impl FakePlatform {
        fn calls(&self) -> Vec<PlatformCall> {
            self.calls.lock().unwrap().clone()
        }

        fn check(&self) -> anyhow::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("Missing Permissions");
            }
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl ModerationPlatform for FakePlatform {
        async fn kick(
            &self,
            _guild_id: serenity::GuildId,
            user_id: serenity::UserId,
            _reason: Option<&str>,
        ) -> anyhow::Result<()> {
            self.check()?;
            self.calls.lock().unwrap().push(PlatformCall::Kick(user_id.get()));
            Ok(())
        }

        async fn ban(
            &self,
            _guild_id: serenity::GuildId,
            user_id: serenity::UserId,
            delete_message_days: u8,
            _reason: Option<&str>,
        ) -> anyhow::Result<()> {
            self.check()?;
            self.calls.lock().unwrap().push(PlatformCall::Ban {
                user: user_id.get(),
                delete_message_days,
            });
            Ok(())
        }

        async fn unban(
            &self,
            _guild_id: serenity::GuildId,
            user_id: serenity::UserId,
        ) -> anyhow::Result<()> {
            self.check()?;
            self.calls.lock().unwrap().push(PlatformCall::Unban(user_id.get()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingModLog {
        events: Mutex<Vec<(u64, ModLogEvent)>>,
    }

    #[async_trait::async_trait]
    impl ModLogSink for RecordingModLog {
        async fn create_debounce(
            &self,
            _guild_id: serenity::GuildId,
            target: &ObservedUser,
            event: ModLogEvent,
        ) {
            self.events.lock().unwrap().push((target.id.get(), event));
        }
    }

    struct Harness {
        db: DatabaseConnection,
        ledger: InfractionLedger,
        platform: Arc<FakePlatform>,
        modlog: Arc<RecordingModLog>,
    }

    async fn harness() -> Harness {
        let db = test_connection().await;
        let platform = Arc::new(FakePlatform::default());
        let modlog = Arc::new(RecordingModLog::default());
        let ledger = InfractionLedger::new(
            db.clone(),
            Arc::new(UserDirectory::new(db.clone())),
            modlog.clone(),
            platform.clone(),
            ModerationConfig::default().softban_purge_days,
        );
        Harness {
            db,
            ledger,
            platform,
            modlog,
        }
    }

    fn context() -> ActionContext {
        ActionContext {
            guild_id: serenity::GuildId::new(1000),
            actor: observed(1, "mod", 1, "m"),
        }
    }

    #[tokio::test]
    async fn test_kick_records_and_notifies() {
        let h = harness().await;
        let target = observed(42, "alice", 7, "a");

        let infraction = h
            .ledger
            .kick(&context(), &target, Some("spam".to_owned()))
            .await
            .unwrap();

        assert_eq!(infraction.kind, InfractionType::Kick);
        assert_eq!(infraction.guild_id, 1000);
        assert_eq!(infraction.user_id, 42);
        assert_eq!(infraction.actor_id, Some(1));
        assert_eq!(infraction.reason.as_deref(), Some("spam"));
        assert_eq!(infraction.expires_at, None);
        assert!(infraction.active);

        assert_eq!(h.platform.calls(), vec![PlatformCall::Kick(42)]);
        assert_eq!(
            *h.modlog.events.lock().unwrap(),
            vec![(
                42,
                ModLogEvent::Kick {
                    actor: "mod#0001".to_owned(),
                    reason: "spam".to_owned(),
                }
            )]
        );
        assert!(users::Entity::find_by_id(42).one(&h.db).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_tempban_sets_expiry_from_creation_time() {
        let h = harness().await;
        let target = observed(42, "alice", 7, "a");

        let infraction = h
            .ledger
            .tempban(&context(), &target, None, Duration::seconds(3600))
            .await
            .unwrap();

        assert_eq!(infraction.kind, InfractionType::TempBan);
        assert!(infraction.active);
        assert_eq!(
            infraction.expires_at,
            Some(infraction.created_at + Duration::seconds(3600))
        );
        assert_eq!(
            h.platform.calls(),
            vec![PlatformCall::Ban {
                user: 42,
                delete_message_days: 0
            }]
        );

        let events = h.modlog.events.lock().unwrap();
        match &events[0].1 {
            ModLogEvent::BanReason {
                temp,
                expires,
                reason,
                ..
            } => {
                assert!(*temp);
                assert_eq!(*expires, infraction.expires_at);
                assert_eq!(reason, "no reason");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tempban_rejects_unrepresentable_expiry() {
        let h = harness().await;
        let target = observed(42, "alice", 7, "a");

        let err = h
            .ledger
            .tempban(&context(), &target, None, Duration::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidDuration(_)));

        let err = h
            .ledger
            .tempban(&context(), &target, None, Duration::seconds(-60))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidDuration(_)));

        assert!(h.platform.calls().is_empty());
        assert!(h.modlog.events.lock().unwrap().is_empty());
        assert_eq!(users::Entity::find().count(&h.db).await.unwrap(), 0);
        assert_eq!(infractions::Entity::find().count(&h.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_softban_purges_then_unbans_without_expiry() {
        let h = harness().await;
        let target = observed(42, "alice", 7, "a");

        let infraction = h
            .ledger
            .softban(&context(), &target, Some("raid".to_owned()))
            .await
            .unwrap();

        assert_eq!(infraction.kind, InfractionType::SoftBan);
        assert_eq!(infraction.expires_at, None);
        assert_eq!(
            h.platform.calls(),
            vec![
                PlatformCall::Ban {
                    user: 42,
                    delete_message_days: 7
                },
                PlatformCall::Unban(42),
            ]
        );
        assert!(matches!(
            h.modlog.events.lock().unwrap()[0].1,
            ModLogEvent::BanReason {
                temp: true,
                expires: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_ban_member_notifies_permanent_ban() {
        let h = harness().await;
        let target = BanTarget::Member(observed(42, "alice", 7, "a"));

        let infraction = h.ledger.ban(&context(), &target, None).await.unwrap();

        assert_eq!(infraction.kind, InfractionType::Ban);
        assert!(matches!(
            h.modlog.events.lock().unwrap()[0].1,
            ModLogEvent::BanReason { temp: false, .. }
        ));
    }

    #[tokio::test]
    async fn test_ban_by_raw_id_skips_notification() {
        let h = harness().await;
        let target = BanTarget::UserId(serenity::UserId::new(777));

        let infraction = h
            .ledger
            .ban(&context(), &target, Some("alt account".to_owned()))
            .await
            .unwrap();

        assert_eq!(infraction.kind, InfractionType::Ban);
        assert_eq!(infraction.user_id, 777);
        assert!(h.modlog.events.lock().unwrap().is_empty());
        assert_eq!(
            h.platform.calls(),
            vec![PlatformCall::Ban {
                user: 777,
                delete_message_days: 0
            }]
        );
        // The banned id was never observed, so it is not in the directory.
        assert!(users::Entity::find_by_id(777).one(&h.db).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_platform_call_writes_no_infraction() {
        let h = harness().await;
        h.platform.fail.store(true, Ordering::SeqCst);
        let target = BanTarget::Member(observed(42, "alice", 7, "a"));

        let err = h.ledger.ban(&context(), &target, None).await.unwrap_err();

        assert!(matches!(
            err,
            LedgerError::PlatformActionFailed { action: "ban", .. }
        ));
        assert_eq!(infractions::Entity::find().count(&h.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_history_is_scoped_and_newest_first() {
        let h = harness().await;
        let ctx = context();
        let target = observed(42, "alice", 7, "a");

        h.ledger.kick(&ctx, &target, None).await.unwrap();
        h.ledger.softban(&ctx, &target, None).await.unwrap();
        h.ledger
            .kick(&ctx, &observed(43, "bob", 1, "b"), None)
            .await
            .unwrap();

        let history = h
            .ledger
            .history(ctx.guild_id, target.id, 10)
            .await
            .unwrap();

        let kinds: Vec<_> = history.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![InfractionType::SoftBan, InfractionType::Kick]);

        let elsewhere = h
            .ledger
            .history(serenity::GuildId::new(1), target.id, 10)
            .await
            .unwrap();
        assert!(elsewhere.is_empty());
    }
}
