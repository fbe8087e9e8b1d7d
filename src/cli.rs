use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "keyword-trigger",
    about = "Plays a video when the trigger keyword is heard"
)]
pub struct CliArgs {
    /// Config file merged over the built-in defaults
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
