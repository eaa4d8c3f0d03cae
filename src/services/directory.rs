use crate::db::entities::users;
use crate::error::LedgerError;
use chrono::Utc;
use poise::serenity_prelude as serenity;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use tracing::debug;

/// A user as currently seen on the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedUser {
    pub id: serenity::UserId,
    pub username: String,
    pub discriminator: i16,
    pub avatar: Option<String>,
    pub bot: bool,
}

impl From<&serenity::User> for ObservedUser {
    fn from(user: &serenity::User) -> Self {
        Self {
            id: user.id,
            username: user.name.clone(),
            // Migrated accounts have no discriminator; store them as #0000.
            discriminator: user.discriminator.map(|d| d.get() as i16).unwrap_or(0),
            avatar: user.avatar.as_ref().map(|hash| hash.to_string()),
            bot: user.bot,
        }
    }
}

impl std::fmt::Display for ObservedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{:04}", self.username, self.discriminator)
    }
}

/// Deduplicated table of every platform user the bot has seen.
pub struct UserDirectory {
    db: DatabaseConnection,
}

impl UserDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get(&self, user_id: serenity::UserId) -> Result<Option<users::Model>, LedgerError> {
        Ok(users::Entity::find_by_id(user_id.get() as i64)
            .one(&self.db)
            .await?)
    }

    /// Inserts the user on first sight. Otherwise, when `refresh` is set,
    /// writes whichever of username/discriminator/avatar changed in a single
    /// update. `bot` and `created_at` keep their first-seen values.
    pub async fn upsert(
        &self,
        observed: &ObservedUser,
        refresh: bool,
    ) -> Result<users::Model, LedgerError> {
        let found = self.get(observed.id).await?;
        self.reconcile(observed, found, refresh).await
    }

    /// Second half of [`upsert`](Self::upsert): `found` is what the lookup
    /// returned, which may be stale by the time the insert runs.
    async fn reconcile(
        &self,
        observed: &ObservedUser,
        found: Option<users::Model>,
        refresh: bool,
    ) -> Result<users::Model, LedgerError> {
        let stored = match found {
            Some(stored) => stored,
            None => match self.insert(observed).await {
                Ok(created) => return Ok(created),
                Err(LedgerError::DuplicateKey(detail)) => {
                    // Lost an insert race; the winner's row is the one to refresh.
                    debug!("User {} inserted concurrently: {}", observed.id, detail);
                    self.get(observed.id).await?.ok_or_else(|| {
                        LedgerError::RecordNotFound(format!("user {}", observed.id))
                    })?
                }
                Err(e) => return Err(e),
            },
        };

        if !refresh {
            return Ok(stored);
        }

        let mut changes: users::ActiveModel = stored.clone().into();
        let mut changed = false;

        if stored.username != observed.username {
            changes.username = Set(observed.username.clone());
            changed = true;
        }
        if stored.discriminator != observed.discriminator {
            changes.discriminator = Set(observed.discriminator);
            changed = true;
        }
        if stored.avatar != observed.avatar {
            changes.avatar = Set(observed.avatar.clone());
            changed = true;
        }

        if !changed {
            return Ok(stored);
        }

        debug!("Refreshing stored profile for user {}", observed.id);
        Ok(changes.update(&self.db).await?)
    }

    async fn insert(&self, observed: &ObservedUser) -> Result<users::Model, LedgerError> {
        let model = users::ActiveModel {
            user_id: Set(observed.id.get() as i64),
            username: Set(observed.username.clone()),
            discriminator: Set(observed.discriminator),
            avatar: Set(observed.avatar.clone()),
            bot: Set(observed.bot),
            created_at: Set(Utc::now().naive_utc()),
        };

        Ok(model.insert(&self.db).await?)
    }
}
