mod assets;
mod cli;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "parapet",
    version,
    about = "Page-threat sensor: replay signal streams, inspect the threat log, validate rulesets"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a raw-signal stream (JSONL) through the detection pipeline
    Watch {
        /// Input file; stdin when omitted
        #[arg(long)]
        input: Option<String>,

        /// Output produced reports as JSON
        #[arg(long)]
        json: bool,

        /// Tab identifier the replayed context belongs to
        #[arg(long, default_value_t = 1)]
        tab: i64,

        /// Ruleset document path (default: config, then bundled)
        #[arg(long)]
        ruleset: Option<String>,

        /// Collector endpoint override for report forwarding
        #[arg(long)]
        collector: Option<String>,

        /// Seed the session identity instead of generating one
        #[arg(long)]
        session: Option<String>,
    },

    /// Persisted threat log management
    Log {
        #[command(subcommand)]
        action: LogAction,
    },

    /// Ruleset inspection
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// Generate shell completions
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum LogAction {
    /// Print retained reports
    Export {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show summary statistics
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drop all retained reports
    Clear,
}

#[derive(Subcommand)]
enum RulesAction {
    /// List loaded rules with their presentation titles
    List {
        /// Ruleset document path (default: config, then bundled)
        #[arg(long)]
        ruleset: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a ruleset document, reporting skipped entries
    Validate {
        /// Ruleset document path (default: config, then bundled)
        #[arg(long)]
        ruleset: Option<String>,
    },
}

fn main() {
    // Reset SIGPIPE to default so piping to head/grep exits cleanly instead of panicking.
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Watch {
            input,
            json,
            tab,
            ruleset,
            collector,
            session,
        } => cli::watch::run(
            input.as_deref(),
            json,
            tab,
            ruleset.as_deref(),
            collector.as_deref(),
            session,
        ),

        Commands::Log { action } => match action {
            LogAction::Export { json } => cli::log_cmd::export(json),
            LogAction::Stats { json } => cli::log_cmd::stats(json),
            LogAction::Clear => cli::log_cmd::clear(),
        },

        Commands::Rules { action } => match action {
            RulesAction::List { ruleset, json } => cli::rules_cmd::list(ruleset.as_deref(), json),
            RulesAction::Validate { ruleset } => cli::rules_cmd::validate(ruleset.as_deref()),
        },

        Commands::Completions { shell } => cli::completions::run(shell),
    };

    std::process::exit(exit_code);
}
