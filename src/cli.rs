use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "service-jobs", version, about = "Field-service job lifecycle API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Run migrations, then start the HTTP server and notification worker (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
}

impl Cli {
    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Serve)
    }
}
