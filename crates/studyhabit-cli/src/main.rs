use clap::{CommandFactory, Parser, Subcommand};

mod commands;
mod common;

#[derive(Parser)]
#[command(name = "studyhabit", version, about = "Studyhabit CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Profile and coin wallet
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
    /// Subjects and weekly targets
    Subject {
        #[command(subcommand)]
        action: commands::subject::SubjectAction,
    },
    /// Study session control
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// To-do items, rewards and reminders
    Todo {
        #[command(subcommand)]
        action: commands::todo::TodoAction,
    },
    /// Duration estimator management
    Estimator {
        #[command(subcommand)]
        action: commands::estimator::EstimatorAction,
    },
    /// Post-session emotion log
    Emotion {
        #[command(subcommand)]
        action: commands::emotion::EmotionAction,
    },
    /// Character shop and inventory
    Shop {
        #[command(subcommand)]
        action: commands::shop::ShopAction,
    },
    /// Achievements
    Achievement {
        #[command(subcommand)]
        action: commands::achievement::AchievementAction,
    },
    /// Study statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate for
        shell: clap_complete::Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Profile { action } => commands::profile::run(action),
        Commands::Subject { action } => commands::subject::run(action),
        Commands::Session { action } => commands::session::run(action),
        Commands::Todo { action } => commands::todo::run(action),
        Commands::Estimator { action } => commands::estimator::run(action),
        Commands::Emotion { action } => commands::emotion::run(action),
        Commands::Shop { action } => commands::shop::run(action),
        Commands::Achievement { action } => commands::achievement::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "studyhabit", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
