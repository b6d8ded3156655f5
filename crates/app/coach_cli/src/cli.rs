use std::path::PathBuf;

use clap::{Parser, Subcommand};
use coach_core::models::Role;
use coach_core::notifications::source::NotificationSourceKind;

/// Command-line client for the coaching platform.
#[derive(Parser, Debug)]
#[command(name = "coach", version, about = "Coaching platform client")]
pub struct Cli {
    /// API base URL.
    #[arg(long, global = true, env = "COACH_API_URL")]
    pub api_url: Option<String>,

    /// Where the session token is stored.
    #[arg(long, global = true, env = "COACH_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and store the session token.
    Login {
        email: String,
        /// Read from stdin when omitted.
        #[arg(long, env = "COACH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and sign in with it.
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted.
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        role: Option<Role>,
    },

    /// Forget the stored session.
    Logout,

    /// Show the signed-in user.
    Whoami,

    /// Change the password of the signed-in user.
    ChangePassword {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },

    /// Request a password reset email.
    ForgotPassword { email: String },

    /// Set a new password with a reset token.
    ResetPassword {
        token: String,
        #[arg(long)]
        password: String,
    },

    /// Confirm an email address with a verification token.
    VerifyEmail { token: String },

    /// Print notifications as they arrive.
    Watch {
        /// simulated, polling or push.
        #[arg(long, env = "COACH_NOTIFICATION_SOURCE")]
        source: Option<NotificationSourceKind>,

        /// Seconds between ticks or polls.
        #[arg(long)]
        interval: Option<u64>,

        /// Stop after this many notifications (at least 1).
        #[arg(long)]
        count: Option<usize>,
    },
}
