mod prompts;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use std::io::Write;
use std::path::PathBuf;
use typesig_core::report::{
    generate_authentication_report, generate_collection_report, generate_profile_report,
};
use typesig_core::{
    compute_profile, AuthState, Authenticator, BiometricError, CollectionReport, Enrollment,
    SampleStore, StorePresence, TypesigConfig,
};

use crate::prompts::{ask, ask_confirmation, select_option, TerminalSource};

#[derive(Parser)]
#[command(author, version, about = "Keystroke-timing user identification CLI", long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect the first typing samples for a new user
    Enroll {
        user: String,
        /// Number of phrases to collect (default: training_iterations)
        #[arg(short = 'n', long)]
        iterations: Option<usize>,
        /// Phrase to show in each prompt
        #[arg(short, long)]
        phrase: Option<String>,
    },
    /// Collect more typing samples for an enrolled user
    Extend {
        user: String,
        #[arg(short = 'n', long)]
        iterations: Option<usize>,
        #[arg(short, long)]
        phrase: Option<String>,
    },
    /// Identify a user from one typed phrase
    Identify {
        user: String,
        #[arg(short, long)]
        phrase: Option<String>,
        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the acceptance bounds derived from a user's samples
    Profile {
        user: String,
        #[arg(long)]
        json: bool,
    },
    /// List users with stored samples
    Users,
    /// Show the effective configuration
    Config,
    /// Interactive menu
    Menu,
}

/// Get the typesig data directory
fn typesig_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TYPESIG_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    Ok(home.join(".typesig"))
}

fn load_config() -> Result<TypesigConfig> {
    let dir = typesig_dir()?;
    TypesigConfig::load_or_default(&dir)
        .with_context(|| format!("Failed to load configuration from {:?}", dir))
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    Builder::from_env(Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

// =============================================================================
// Collection Commands
// =============================================================================

fn cmd_enroll(user: &str, iterations: Option<usize>, phrase: Option<String>) -> Result<()> {
    let config = load_config()?;
    let store = SampleStore::new(&config.data_dir);
    let iterations = iterations.unwrap_or(config.training_iterations);

    let mut source = TerminalSource::stdin(phrase);
    let report = match Enrollment::new(&store, &config).enroll(user, &mut source, iterations) {
        Err(BiometricError::AlreadyEnrolled(_)) => {
            return Err(anyhow!(
                "User '{}' is already enrolled. Run 'typesig extend {}' to add samples.",
                user,
                user
            ))
        }
        other => other.with_context(|| format!("Enrollment failed for '{}'", user))?,
    };

    print_collection(&report);
    Ok(())
}

fn cmd_extend(user: &str, iterations: Option<usize>, phrase: Option<String>) -> Result<()> {
    let config = load_config()?;
    let store = SampleStore::new(&config.data_dir);
    let iterations = iterations.unwrap_or(config.training_iterations);

    if !store.presence(user)?.has_samples() {
        println!("No samples stored for '{}' yet; starting a new record.", user);
    }

    let mut source = TerminalSource::stdin(phrase);
    let report = Enrollment::new(&store, &config)
        .extend(user, &mut source, iterations)
        .with_context(|| format!("Collection failed for '{}'", user))?;

    print_collection(&report);
    Ok(())
}

fn print_collection(report: &CollectionReport) {
    println!();
    print!("{}", generate_collection_report(report));
    println!(
        "Recorded {} sample(s) for {}.",
        report.added, report.user_id
    );
}

// =============================================================================
// Identification
// =============================================================================

fn cmd_identify(user: &str, phrase: Option<String>, json: bool) -> Result<()> {
    let config = load_config()?;
    let store = SampleStore::new(&config.data_dir);

    let mut source = TerminalSource::stdin(phrase);
    let outcome = Authenticator::new(&store, &config)
        .identify_phrase(user, &mut source)
        .with_context(|| format!("Identification failed for '{}'", user))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!();
    print!("{}", generate_authentication_report(&outcome));
    match outcome.state() {
        AuthState::Accepted => println!("User {} identified.", user),
        AuthState::Rejected => println!("User {} not identified.", user),
        AuthState::NoHistory => {
            println!("Run 'typesig enroll {}' to collect samples first.", user)
        }
    }
    Ok(())
}

// =============================================================================
// Inspection Commands
// =============================================================================

fn cmd_profile(user: &str, json: bool) -> Result<()> {
    let config = load_config()?;
    let store = SampleStore::new(&config.data_dir);

    let history = store
        .load_all(user)
        .with_context(|| format!("Failed to load samples for '{}'", user))?;
    let profile = match compute_profile(user, &history, config.bound_sigma) {
        Err(BiometricError::NoHistory(_)) => {
            println!("No enrollment data for {}.", user);
            return Ok(());
        }
        other => other?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        print!("{}", generate_profile_report(&profile));
    }
    Ok(())
}

fn cmd_users() -> Result<()> {
    let config = load_config()?;
    let store = SampleStore::new(&config.data_dir);

    let users = store.list_users().context("Failed to list users")?;
    if users.is_empty() {
        println!("No users enrolled.");
        return Ok(());
    }

    println!("=== Enrolled Users ===");
    for user in users {
        match store.presence(&user)? {
            StorePresence::Populated(n) => println!("  {:<24} {} sample(s)", user, n),
            StorePresence::Empty | StorePresence::Absent => println!("  {:<24} (empty)", user),
        }
    }
    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = load_config()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

// =============================================================================
// Interactive Menu
// =============================================================================

fn cmd_menu() -> Result<()> {
    let config = load_config()?;
    let store = SampleStore::new(&config.data_dir);

    println!("=== typesig ===");
    loop {
        println!();
        let user = ask("Enter user id (blank to exit):")?;
        if user.is_empty() {
            break;
        }
        if let Err(e) = store.path_for(&user) {
            println!("{}", e);
            continue;
        }

        let keep_going = if store.presence(&user)?.has_samples() {
            known_user_menu(&store, &config, &user)?
        } else {
            unknown_user_menu(&store, &config, &user)?
        };
        if !keep_going {
            break;
        }
    }
    println!("Goodbye.");
    Ok(())
}

/// Returns `false` when the operator chose to exit.
fn unknown_user_menu(store: &SampleStore, config: &TypesigConfig, user: &str) -> Result<bool> {
    let title = format!("No enrollment data for {}.", user);
    match select_option(&title, &["Enroll", "Back", "Exit"])? {
        0 => {
            let prompt = format!(
                "Collect {} phrase(s) for {}?",
                config.training_iterations, user
            );
            if ask_confirmation(&prompt, true)? {
                let mut source = TerminalSource::stdin(None);
                report_menu_error(
                    Enrollment::new(store, config)
                        .enroll(user, &mut source, config.training_iterations)
                        .map(|report| print_collection(&report)),
                );
            }
            Ok(true)
        }
        1 => Ok(true),
        _ => Ok(false),
    }
}

fn known_user_menu(store: &SampleStore, config: &TypesigConfig, user: &str) -> Result<bool> {
    let title = format!("User {} is enrolled.", user);
    match select_option(&title, &["Extend enrollment", "Identify", "Back", "Exit"])? {
        0 => {
            let mut source = TerminalSource::stdin(None);
            report_menu_error(
                Enrollment::new(store, config)
                    .extend(user, &mut source, config.training_iterations)
                    .map(|report| print_collection(&report)),
            );
            Ok(true)
        }
        1 => {
            let mut source = TerminalSource::stdin(None);
            report_menu_error(
                Authenticator::new(store, config)
                    .identify_phrase(user, &mut source)
                    .map(|outcome| print!("{}", generate_authentication_report(&outcome))),
            );
            Ok(true)
        }
        2 => Ok(true),
        _ => Ok(false),
    }
}

/// Menu actions report failures and return to the prompt.
fn report_menu_error(result: typesig_core::Result<()>) {
    if let Err(e) = result {
        log::warn!("menu action failed: {}", e);
        println!("Error: {}", e);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Enroll {
            user,
            iterations,
            phrase,
        } => {
            cmd_enroll(&user, iterations, phrase)?;
        }
        Commands::Extend {
            user,
            iterations,
            phrase,
        } => {
            cmd_extend(&user, iterations, phrase)?;
        }
        Commands::Identify { user, phrase, json } => {
            cmd_identify(&user, phrase, json)?;
        }
        Commands::Profile { user, json } => {
            cmd_profile(&user, json)?;
        }
        Commands::Users => {
            cmd_users()?;
        }
        Commands::Config => {
            cmd_config()?;
        }
        Commands::Menu => {
            cmd_menu()?;
        }
    }

    Ok(())
}
