use clap::{Parser, Subcommand};

/// Rollcall: attendance tracker notifications from the terminal
#[derive(Parser)]
#[command(name = "rollcall", version, about)]
pub struct Cli {
    /// Bearer token to use instead of the saved credentials
    #[arg(long, env = "ROLLCALL_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List received notifications
    Inbox {
        /// Only show unread notifications
        #[arg(long)]
        unread: bool,
    },

    /// List sent notifications, one line per broadcast
    Sent {
        /// Show every per-recipient record instead of grouping
        #[arg(long)]
        raw: bool,
    },

    /// Show the inbox and follow live updates until interrupted
    Watch,

    /// Mark one notification as read
    Read { id: String },

    /// Mark every notification as read
    ReadAll,

    /// Send a notification to everyone in a course
    Send {
        #[arg(long)]
        course: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long)]
        message: String,
    },

    /// Save an access token for later commands
    Login {
        #[arg(long)]
        token: String,
        #[arg(long)]
        username: Option<String>,
        /// teacher or student
        #[arg(long)]
        role: Option<String>,
    },

    /// Forget the saved credentials
    Logout,
}
