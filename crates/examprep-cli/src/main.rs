//! examprep CLI: practice interview questions and get AI-graded feedback.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "examprep", version, about = "Interview practice with AI grading")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter config and an example question bank
    Init,

    /// Check question bank files for authoring mistakes
    Validate {
        /// Bank file or directory (default: bank_dir from config)
        #[arg(long)]
        bank: Option<PathBuf>,
    },

    /// List available subjects
    Subjects,

    /// Take an exam on stdin
    Exam {
        /// Subject code (e.g. "java")
        #[arg(long)]
        subject: String,

        /// Number of questions
        #[arg(long, default_value = "5")]
        count: usize,

        /// Selection strategy: random, not_answered, least_answered
        #[arg(long, default_value = "random")]
        strategy: String,

        /// Seed for a reproducible draw
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Grade a completed exam
    Grade {
        /// Exam id
        #[arg(long)]
        exam: String,

        /// Regrade answers that already have an evaluation
        #[arg(long)]
        force: bool,

        /// Grading provider (default: default_provider from config)
        #[arg(long)]
        provider: Option<String>,
    },

    /// List past exams, newest first
    History {
        #[arg(long)]
        subject: Option<String>,
    },

    /// Coverage for every subject, or the score trend of one
    Report {
        #[arg(long)]
        subject: Option<String>,
    },

    /// Export a subject's history as JSON
    Export {
        #[arg(long)]
        subject: String,

        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Import a subject's history from an exported JSON file
    Import {
        #[arg(long)]
        subject: String,

        #[arg(long)]
        file: PathBuf,

        /// Merge mode: add or override
        #[arg(long, default_value = "add")]
        mode: String,

        /// Reject the file if it holds records for other subjects
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("examprep=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Init => commands::init::execute(),
        Commands::Validate { bank } => commands::validate::execute(config, bank),
        Commands::Subjects => commands::subjects::execute(config),
        Commands::Exam {
            subject,
            count,
            strategy,
            seed,
        } => commands::exam::execute(config, subject, count, strategy, seed).await,
        Commands::Grade {
            exam,
            force,
            provider,
        } => commands::grade::execute(config, exam, force, provider).await,
        Commands::History { subject } => commands::history::execute(config, subject),
        Commands::Report { subject } => commands::report::execute(config, subject),
        Commands::Export { subject, output } => commands::export::execute(config, subject, output),
        Commands::Import {
            subject,
            file,
            mode,
            strict,
        } => commands::import::execute(config, subject, file, mode, strict),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
