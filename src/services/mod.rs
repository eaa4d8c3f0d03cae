pub mod directory;
pub mod event_manager;
pub mod guilds;
pub mod infractions;
pub mod modlog;
pub mod platform;
