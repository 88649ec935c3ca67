use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional command to run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Send the whole conversation instead of only the latest message
    #[arg(long, global = true)]
    pub full_history: bool,

    /// Write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Where the chat transcript is exported (Ctrl+E)
    #[arg(long, default_value = "gemchat-transcript.html")]
    pub export_path: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a one-off message and get a response
    Ask {
        /// The message to send
        #[arg(required = true)]
        message: Vec<String>,

        /// Print the reply as sanitized HTML
        #[arg(long)]
        html: bool,

        /// Print only the code blocks of the reply
        #[arg(long, conflicts_with = "html")]
        code_only: bool,
    },

    /// Format markdown from a file (or stdin) as sanitized HTML
    Render {
        /// Markdown file to read; stdin when omitted
        file: Option<PathBuf>,
    },
}
