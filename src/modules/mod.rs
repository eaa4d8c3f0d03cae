pub mod moderation;

use crate::{Data, Error};

#[derive(Debug, Clone)]
pub struct ModuleDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub struct Module {
    pub definition: ModuleDefinition,
    pub commands: Vec<poise::Command<Data, Error>>,
}

pub fn get_modules() -> Vec<Module> {
    vec![moderation::module()]
}

pub fn commands() -> Vec<poise::Command<Data, Error>> {
    let mut all_commands = vec![];

    for mut module in get_modules() {
        let category = module.definition.name;
        for command in &mut module.commands {
            command.category = Some(category.into());
        }
        all_commands.extend(module.commands);
    }

    all_commands
}
