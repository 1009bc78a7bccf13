//! CLI for oscillo, a secure oscillation engine.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "oscillo")]
#[command(about = "oscillo: mixed-source entropy, pink noise and session oscillation metrics")]
#[command(version = oscillo_core::VERSION)]
struct Cli {
    /// Log at debug level (otherwise RUST_LOG, defaulting to warn)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw from the entropy source and report quality, inputs and draw statistics
    Entropy {
        /// Number of raw/normalized draws to report
        #[arg(long, default_value = "10")]
        samples: usize,

        /// Write the report as JSON to this path instead of stdout
        #[arg(long)]
        output: Option<String>,
    },

    /// Generate a Voss-McCartney pink noise series
    Pink {
        /// Number of values to generate
        #[arg(long, default_value = "200")]
        count: usize,

        /// Octave count
        #[arg(long, default_value = "5")]
        octaves: u32,

        /// Also compute oscillation metrics over the series
        #[arg(long)]
        metrics: bool,

        /// Write the result as JSON to this path instead of stdout
        #[arg(long)]
        output: Option<String>,
    },

    /// Start or resume a session, feed it events and print its metrics
    Simulate {
        /// Session store directory
        #[arg(long, default_value = "sessions")]
        store: String,

        /// Resume this session id instead of starting a new one
        #[arg(long)]
        session: Option<String>,

        /// Character id for a new session
        #[arg(long, default_value = "default")]
        character: String,

        /// Pattern events to record
        #[arg(long, default_value = "3")]
        patterns: usize,

        /// Conversation turns to record
        #[arg(long, default_value = "10")]
        conversations: usize,

        /// Use each pattern's literal history instead of entropy-generated values
        #[arg(long)]
        no_entropy: bool,

        /// Minimum samples before metrics (overrides MIN_OSCILLATION_SAMPLES)
        #[arg(long)]
        min_samples: Option<usize>,

        /// Write the session's buffer snapshot as JSON to this path
        #[arg(long)]
        snapshot: Option<String>,

        /// End the session after printing metrics
        #[arg(long)]
        end: bool,
    },

    /// Compute metrics from a snapshot JSON file ({"values": [...], "timestamps": [...]})
    Metrics {
        /// Snapshot file to read
        input: String,

        /// Attach a fresh entropy quality snapshot
        #[arg(long)]
        with_entropy: bool,

        /// Resample to this many points before computing metrics
        #[arg(long)]
        resample: Option<usize>,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Entropy { samples, output } => commands::entropy::run(samples, output.as_deref()),
        Commands::Pink {
            count,
            octaves,
            metrics,
            output,
        } => commands::pink::run(count, octaves, metrics, output.as_deref()),
        Commands::Simulate {
            store,
            session,
            character,
            patterns,
            conversations,
            no_entropy,
            min_samples,
            snapshot,
            end,
        } => commands::simulate::run(&commands::simulate::SimulateArgs {
            store: &store,
            session: session.as_deref(),
            character: &character,
            patterns,
            conversations,
            use_entropy: !no_entropy,
            min_samples,
            snapshot: snapshot.as_deref(),
            end,
        }),
        Commands::Metrics {
            input,
            with_entropy,
            resample,
        } => commands::metrics::run(&input, with_entropy, resample),
    }
}
