//! DelCourse CLI - a command-line client for the DelCourse learning platform.
//!
//! Browse courses and users, manage your enrollment and ratings, and author
//! courses and lessons from the terminal.

mod app;
mod render;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use delcourse_core::config::{API_BASE_ENV, USE_KEYRING_ENV};
use delcourse_core::models::{ContentId, CourseId};

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "delcourse")]
#[command(author, version, about = "Command-line client for the DelCourse learning platform", long_about = None)]
pub struct Cli {
    /// API base URL (default: https://open-api.delcom.org/api/v1)
    #[arg(long, env = API_BASE_ENV, global = true)]
    pub api_base: Option<String>,

    /// Keep the session in the OS keychain instead of the cache directory
    #[arg(long, env = USE_KEYRING_ENV, global = true, value_parser = clap::builder::BoolishValueParser::new())]
    pub keyring: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in with email and password
    Login {
        /// Email address (defaults to the last one used)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Create a new account
    Register {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Platform totals and recently added courses
    Dashboard,

    /// List users
    Users {
        /// Filter by name or email
        #[arg(short, long)]
        search: Option<String>,
        /// Sort names Z-A
        #[arg(long)]
        desc: bool,
    },

    /// List courses
    Courses {
        /// Only courses you have joined
        #[arg(long)]
        mine: bool,
        /// Filter by title
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Course management commands
    #[command(subcommand)]
    Course(CourseCommands),

    /// Join a course
    Join { id: CourseId },

    /// Leave a course
    Leave {
        id: CourseId,
        /// Confirm leaving the course
        #[arg(long)]
        yes: bool,
    },

    /// Rate a course you have joined
    Rate {
        id: CourseId,
        /// Stars from 1 to 5
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        stars: u8,
        #[arg(long)]
        comment: Option<String>,
    },

    /// Lesson management commands
    #[command(subcommand)]
    Content(ContentCommands),
}

/// Course subcommands
#[derive(Subcommand, Debug)]
pub enum CourseCommands {
    /// Show a course with its lessons and reviews
    Show { id: CourseId },
    /// Create a course
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// Cover image file
        #[arg(long)]
        cover: Option<PathBuf>,
    },
    /// Edit a course's title and description
    Update {
        id: CourseId,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
    },
    /// Delete a course
    Delete {
        id: CourseId,
        #[arg(long)]
        yes: bool,
    },
    /// Replace a course's cover image
    Cover { id: CourseId, path: PathBuf },
}

/// Content subcommands
#[derive(Subcommand, Debug)]
pub enum ContentCommands {
    /// Add a lesson to a course
    Add {
        course_id: CourseId,
        #[arg(long)]
        title: String,
        /// YouTube link
        #[arg(long)]
        youtube: String,
    },
    /// Show a lesson
    Show { id: ContentId },
    /// Edit a lesson
    Update {
        id: ContentId,
        #[arg(long)]
        title: String,
        #[arg(long)]
        youtube: String,
    },
    /// Delete a lesson
    Delete {
        id: ContentId,
        #[arg(long)]
        yes: bool,
    },
    /// Mark a lesson as finished
    Done { id: ContentId },
    /// Mark a lesson as not finished
    Undone { id: ContentId },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    init_tracing();
    info!("delcourse starting");

    let app = App::new(cli.api_base.as_deref(), cli.keyring)?;
    let status = app.hydrate().await;
    debug!(?status, "Session resolved");

    app.run(cli.command).await
}
