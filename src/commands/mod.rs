use clap::ValueEnum;

mod category;
mod config_cmd;
mod favorite;
mod item;
mod review;
mod user;

pub use category::CategoryCommand;
pub use config_cmd::ConfigCommand;
pub use favorite::FavoriteCommand;
pub use item::ItemCommand;
pub use review::ReviewCommand;
pub use user::UserCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Asks a yes/no question on stdin. Anything but `y` is a no.
pub(crate) fn confirm(prompt: &str) -> Result<bool, std::io::Error> {
    use std::io::{self, Write};

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
