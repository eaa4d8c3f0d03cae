pub mod guild_configs;
pub mod infractions;
pub mod users;
