pub mod commands;
pub mod duration_parser;

use crate::modules::{Module, ModuleDefinition};

pub fn module() -> Module {
    Module {
        definition: ModuleDefinition {
            id: "moderation",
            name: "Moderation",
            description: "Kick and ban members, and keep an infraction record of every action",
        },
        commands: vec![
            commands::kick(),
            commands::ban(),
            commands::tempban(),
            commands::softban(),
            commands::infractions(),
            commands::modlog(),
        ],
    }
}
