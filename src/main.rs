//! lessongate - lesson access gate and lives ledger
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use lessongate::config::{lessongate_home, Config};
use lessongate::core::TopicCatalog;
use lessongate::error::exit_codes;
use lessongate::store::{open_store, ProgressStore};

// =============================================================================
// CLI Definition
// =============================================================================

/// lessongate - lesson access gate and lives ledger
#[derive(Parser)]
#[command(name = "lessongate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// User id for the local file store (overrides config)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a lesson may be opened (exit 2 when locked)
    Check {
        /// Topic slug
        topic: String,
        /// Lesson number (1-based)
        lesson: u32,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Start a lesson, spending one life
    Start {
        /// Topic slug
        topic: String,
        /// Lesson number (1-based)
        lesson: u32,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Finish a lesson and advance
    Complete {
        /// Topic slug
        topic: String,
        /// Lesson number (1-based)
        lesson: u32,
        /// Return to the topic list instead of the next lesson
        #[arg(long)]
        topics: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show the lives balance
    Lives {
        /// Spend one life
        #[arg(long = "use")]
        use_life: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show stored progress for a topic
    Progress {
        /// Topic slug
        topic: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();
    init_logging();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("lessongate error: {}", e);
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

/// Log to stderr, filtered by `LESSONGATE_LOG` or `RUST_LOG` (default `warn`).
fn init_logging() {
    let filter = std::env::var("LESSONGATE_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("lessongate panic: {}", info);

        if let Some(home) = lessongate_home() {
            let crash_log = home.join("crash.log");
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Everything a command needs from configuration.
struct Context {
    config: Config,
    catalog: TopicCatalog,
    store: Arc<dyn ProgressStore>,
}

impl Context {
    fn load(user: Option<String>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Config::load();
        if let Some(user) = user {
            config.store.user = user;
        }
        let catalog = TopicCatalog::from_config(&config.catalog);
        let store = open_store(&config, &catalog)?;
        Ok(Self {
            config,
            catalog,
            store,
        })
    }

    fn flow(&self) -> lessongate::LessonFlow<Arc<dyn ProgressStore>> {
        lessongate::LessonFlow::new(
            Arc::clone(&self.store),
            self.catalog.clone(),
            self.config.access.degraded_policy,
        )
    }
}

fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let ctx = Context::load(cli.user)?;

    match cli.command {
        Commands::Check {
            topic,
            lesson,
            json,
            quiet,
        } => run_check(&ctx, &topic, lesson, json, quiet),
        Commands::Start {
            topic,
            lesson,
            json,
            quiet,
        } => run_start(&ctx, &topic, lesson, json, quiet),
        Commands::Complete {
            topic,
            lesson,
            topics,
            json,
            quiet,
        } => run_complete(&ctx, &topic, lesson, topics, json, quiet),
        Commands::Lives {
            use_life,
            json,
            quiet,
        } => run_lives(&ctx, use_life, json, quiet),
        Commands::Progress { topic, json, quiet } => run_progress(&ctx, &topic, json, quiet),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn print(formatted: &str) {
    if !formatted.is_empty() {
        print!("{}", formatted);
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(code as u8)
}

fn run_check(
    ctx: &Context,
    topic: &str,
    lesson: u32,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use lessongate::cli::check::{CheckCommand, CheckOptions};
    use lessongate::AccessController;

    let controller = AccessController::new(
        Arc::clone(&ctx.store),
        ctx.config.access.degraded_policy,
    );
    let cmd = CheckCommand::new(controller, ctx.catalog.clone());
    let options = CheckOptions { json, quiet };

    let output = cmd.run(topic, lesson);
    print(&cmd.format_output(&output, &options));

    Ok(exit_code(if output.granted {
        exit_codes::OK
    } else {
        exit_codes::DENIED
    }))
}

fn run_start(
    ctx: &Context,
    topic: &str,
    lesson: u32,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use lessongate::cli::start::{StartCommand, StartOptions};

    let mut cmd = StartCommand::new(ctx.flow());
    let options = StartOptions { json, quiet };

    let output = cmd.run(topic, lesson);
    print(&cmd.format_output(&output, &options));

    let code = if output.started {
        exit_codes::OK
    } else if output.exhausted || output.decision.is_some() {
        exit_codes::DENIED
    } else {
        exit_codes::ERROR
    };
    Ok(exit_code(code))
}

fn run_complete(
    ctx: &Context,
    topic: &str,
    lesson: u32,
    topics: bool,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use lessongate::cli::complete::{CompleteCommand, CompleteOptions};

    let cmd = CompleteCommand::new(ctx.flow());
    let options = CompleteOptions {
        json,
        quiet,
        to_topic_list: topics,
    };

    let output = cmd.run(topic, lesson, &options);
    print(&cmd.format_output(&output, &options));

    Ok(exit_code(if output.success {
        exit_codes::OK
    } else {
        exit_codes::ERROR
    }))
}

fn run_lives(
    ctx: &Context,
    use_life: bool,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use lessongate::cli::lives::{LivesCommand, LivesOptions};
    use lessongate::LivesLedger;

    let mut cmd = LivesCommand::new(LivesLedger::new(Arc::clone(&ctx.store)));
    let options = LivesOptions {
        json,
        quiet,
        use_life,
    };

    let output = cmd.run(&options);
    print(&cmd.format_output(&output, &options));

    let code = if output.success {
        exit_codes::OK
    } else if output.exhausted {
        exit_codes::DENIED
    } else {
        exit_codes::ERROR
    };
    Ok(exit_code(code))
}

fn run_progress(
    ctx: &Context,
    topic: &str,
    json: bool,
    quiet: bool,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    use lessongate::cli::progress::{ProgressCommand, ProgressOptions};
    use lessongate::ProgressSync;

    let sync = ProgressSync::new(Arc::clone(&ctx.store));
    let cmd = ProgressCommand::new(sync, ctx.catalog.clone());
    let options = ProgressOptions { json, quiet };

    let output = cmd.run(topic);
    print(&cmd.format_output(&output, &options));

    Ok(exit_code(if output.success {
        exit_codes::OK
    } else {
        exit_codes::ERROR
    }))
}
