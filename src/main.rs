use anyhow::Context as _;
use clap::Parser as _;
use dotenvy::dotenv;
use poise::serenity_prelude as serenity;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod error;
mod modules;
mod services;

#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Publish commands. If no guild ID is provided, publish globally.
    #[arg(long, num_args = 0..)]
    publish: Option<Vec<u64>>,

    /// Clear all commands instead of publishing them.
    #[arg(long)]
    clear: bool,

    /// Rollback the specified number of migrations and run all migrations again.
    #[arg(long, num_args = 0..=1, default_missing_value = "1")]
    refresh_migrations: Option<u32>,
}

// Custom user data passed to all command functions
pub struct Data {
    pub db: DatabaseConnection,
    pub directory: Arc<services::directory::UserDirectory>,
    pub ledger: Arc<services::infractions::InfractionLedger>,
    pub modlog: Arc<services::modlog::ModLogService>,
}

pub type Error = anyhow::Error;
pub type Context<'a> = poise::Context<'a, Data, Error>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config::Config::from_env().context("Failed to load configuration")?;

    info!("Starting moderation bot...");

    let db = db::establish_connection(&config.database)
        .await
        .context("Failed to connect to database")?;

    use sea_orm_migration::MigratorTrait;
    if let Some(depth) = args.refresh_migrations {
        info!("Refreshing migrations (down {}, then up)...", depth);
        db::migrations::Migrator::down(&db, Some(depth))
            .await
            .context("Failed to rollback migration")?;
    }

    db::migrations::Migrator::up(&db, None)
        .await
        .context("Failed to run migrations")?;

    if args.refresh_migrations.is_some() {
        info!("Migrations refreshed successfully.");
        return Ok(());
    }

    let commands = modules::commands();

    if let Some(guild_ids) = args.publish {
        return publish_commands(&config.discord_token, &commands, guild_ids, args.clear).await;
    }

    let http = Arc::new(serenity::Http::new(&config.discord_token));

    let directory = Arc::new(services::directory::UserDirectory::new(db.clone()));
    let modlog = Arc::new(services::modlog::ModLogService::new(
        db.clone(),
        http.clone(),
        Duration::from_secs(config.moderation.debounce_window_secs),
    ));
    let platform = Arc::new(services::platform::SerenityPlatform::new(http));
    let ledger = Arc::new(services::infractions::InfractionLedger::new(
        db.clone(),
        directory.clone(),
        modlog.clone(),
        platform,
        config.moderation.softban_purge_days,
    ));

    modlog.start_prune_runner();

    let data = Data {
        db,
        directory,
        ledger,
        modlog,
    };

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            event_handler: |ctx, event, framework, data| {
                Box::pin(services::event_manager::handle_event(ctx, event, framework, data))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(move |_ctx, _ready, _framework| Box::pin(async move { Ok(data) }))
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::GUILD_MODERATION
        | serenity::GatewayIntents::GUILD_MESSAGES;

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .context("Failed to create client")?;

    info!("Bot is ready!");
    client.start_autosharded().await.context("Client error")?;

    Ok(())
}

async fn publish_commands(
    token: &str,
    commands: &[poise::Command<Data, Error>],
    guild_ids: Vec<u64>,
    clear: bool,
) -> anyhow::Result<()> {
    let http = serenity::Http::new(token);
    let application = http
        .get_current_application_info()
        .await
        .context("Failed to fetch application info")?;
    http.set_application_id(application.id);
    info!("Fetched Application ID: {}", application.id);

    let commands: &[poise::Command<Data, Error>] = if clear { &[] } else { commands };

    if guild_ids.is_empty() {
        if clear {
            info!("Clearing commands globally...");
        } else {
            info!("Registering commands globally...");
        }

        match poise::builtins::register_globally(&http, commands).await {
            Ok(()) => info!("Global command operation successful"),
            Err(e) => error!("Failed to register commands globally: {}", e),
        }
    } else {
        for guild_id in guild_ids {
            if clear {
                info!("Clearing commands in guild {}...", guild_id);
            } else {
                info!("Registering commands in guild {}...", guild_id);
            }

            match poise::builtins::register_in_guild(
                &http,
                commands,
                serenity::GuildId::new(guild_id),
            )
            .await
            {
                Ok(()) => info!("Guild command operation successful for guild {}", guild_id),
                Err(e) => error!("Failed to register commands in guild {}: {}", guild_id, e),
            }
        }
    }

    Ok(())
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    if let poise::FrameworkError::Command { error, ctx, .. } = &error {
        error!("Command /{} failed: {:?}", ctx.command().name, error);
    }

    if let Err(e) = poise::builtins::on_error(error).await {
        error!("Error while handling error: {}", e);
    }
}
