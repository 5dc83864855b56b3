//! prefpack CLI: builds compressed preference stores from tuple files and
//! inspects persisted ones.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use log::LevelFilter;

use prefpack::codec::policy;
use prefpack::input::{self, Orientation};
use prefpack::store::format;
use prefpack::{
    AnyStore, BinaryPreferenceStore, EntityIndex, Labels, PreferenceSource,
    RatingPreferenceStore, StoreConfig, StoreSummary,
};

#[derive(Debug, Parser)]
#[command(name = "prefpack")]
#[command(about = "Compressed dual-indexed preference store", long_about = None)]
#[command(version)]
struct Cli {
    /// Log construction details (codec plan, timings)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a store from a tab-separated tuple file
    Build(BuildArgs),
    /// Print the summary of a persisted store
    Inspect(InspectArgs),
}

#[derive(Debug, Parser)]
struct BuildArgs {
    /// Tuple file: one entity per line, tab separated
    tuples: PathBuf,

    /// User index file (one id per line). Derived from the tuples when omitted
    #[arg(long, requires = "items")]
    users: Option<PathBuf>,

    /// Item index file (one id per line). Derived from the tuples when omitted
    #[arg(long, requires = "users")]
    items: Option<PathBuf>,

    /// Whether each line starts with a user or an item
    #[arg(long, value_enum, default_value = "user")]
    orientation: OrientationArg,

    /// Lines alternate counterpart id and rating
    #[arg(long)]
    ratings: bool,

    /// JSON configuration file; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Identifier codec, e.g. "zeta_3", "fixed", "succinct"
    #[arg(long)]
    id_codec: Option<String>,

    /// Rating codec (with --ratings)
    #[arg(long)]
    value_codec: Option<String>,

    /// Ratings are stored as round(rating * scale)
    #[arg(long)]
    rating_scale: Option<f64>,

    /// Size of a dedicated construction thread pool
    #[arg(long)]
    threads: Option<usize>,

    /// Write the persisted store here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Zstd level for the persisted store (1-22)
    #[arg(long)]
    zstd: Option<i32>,
}

#[derive(Debug, Parser)]
struct InspectArgs {
    /// Persisted store
    blob: PathBuf,

    /// Also print the preferences of this user (raw id if labels were stored, else index)
    #[arg(long)]
    user: Option<String>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrientationArg {
    /// Lines start with a user id
    User,
    /// Lines start with an item id
    Item,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::User => Orientation::UserMajor,
            OrientationArg::Item => Orientation::ItemMajor,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Command::Build(args) => run_build(args),
        Command::Inspect(args) => run_inspect(args),
    }
}

fn init_logger(verbose: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    });
    builder.parse_default_env();
    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(buf, "[{}] {}", record.level(), record.args())
    });
    let _ = builder.try_init();
}

//==================================================================================
// build
//==================================================================================

fn run_build(args: BuildArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => StoreConfig::from_path(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(codec) = args.id_codec {
        config.id_codec = codec;
    }
    if let Some(codec) = args.value_codec {
        config.value_codec = codec;
    }
    if let Some(scale) = args.rating_scale {
        config.rating_scale = scale;
    }
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    if args.zstd.is_some() {
        config.persist_zstd_level = args.zstd;
    }
    // Codec names fail here, before the tuple file is opened.
    if args.ratings {
        policy::parse_rating_codecs(&config)?;
    } else {
        policy::parse_binary_codecs(&config)?;
    }

    let orientation = Orientation::from(args.orientation);
    let start = Instant::now();
    let labels = match (&args.users, &args.items) {
        (Some(users), Some(items)) => Labels {
            users: read_index_file(users)?,
            items: read_index_file(items)?,
        },
        (None, None) => {
            let (users, items) =
                input::scan_indices(open(&args.tuples)?, orientation, args.ratings)?;
            Labels { users, items }
        }
        _ => bail!("--users and --items must be given together"),
    };
    let num_users = labels.users.len();
    let num_items = labels.items.len();

    let (store, summary) = if args.ratings {
        let tuples =
            input::read_rating_tuples(open(&args.tuples)?, &labels.users, &labels.items, orientation)?;
        let store = RatingPreferenceStore::build(num_users, num_items, tuples, &config)?;
        let summary = store.summary();
        (AnyStore::Rating(store), summary)
    } else {
        let tuples =
            input::read_binary_tuples(open(&args.tuples)?, &labels.users, &labels.items, orientation)?;
        let store = BinaryPreferenceStore::build(num_users, num_items, tuples, &config)?;
        let summary = store.summary();
        (AnyStore::Binary(store), summary)
    };
    let elapsed = start.elapsed();

    print_summary(&summary);
    let stats = match &store {
        AnyStore::Binary(s) => s.adjacency().id_stats(),
        AnyStore::Rating(s) => s.adjacency().id_stats(),
    };
    println!(
        "  {:<22} {:.3} of 32-bit ints",
        "id compression:",
        stats.fraction_of_uncompressed()
    );
    println!("  {:<22} {:.2?}", "built in:", elapsed);

    if let Some(path) = &args.output {
        let mut file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        format::write_to(
            &mut file,
            store.as_store_ref(),
            Some(&labels),
            config.persist_zstd_level,
        )?;
        println!("{} {}", "Wrote".green().bold(), path.display());
    }
    Ok(())
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn read_index_file(path: &Path) -> Result<EntityIndex<String>> {
    input::read_index(open(path)?).with_context(|| format!("Failed to read index {}", path.display()))
}

//==================================================================================
// inspect
//==================================================================================

fn run_inspect(args: InspectArgs) -> Result<()> {
    let mut file = File::open(&args.blob)
        .with_context(|| format!("Failed to open {}", args.blob.display()))?;
    let (store, labels) = format::read_from(&mut file)?;
    let summary = store.summary();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if let Some(user) = &args.user {
        let uidx = match &labels {
            Some(labels) => labels
                .users
                .idx(user.as_str())
                .with_context(|| format!("Unknown user '{}'", user))?,
            None => user
                .parse::<u32>()
                .with_context(|| format!("'{}' is not a user index", user))?,
        };
        let source = store.as_source();
        println!("{} {} ({} preferences)", "User".bold(), user, source.user_preference_count(uidx));
        for pref in source.preferences_of_user(uidx) {
            let item = labels
                .as_ref()
                .and_then(|l| l.items.id(pref.idx).cloned())
                .unwrap_or_else(|| pref.idx.to_string());
            println!("  {}\t{}", item, pref.value);
        }
    }
    Ok(())
}

fn print_summary(summary: &StoreSummary) {
    let kind = if summary.value_codec.is_some() { "rating" } else { "binary" };
    println!("{} {} store", "prefpack".cyan().bold(), kind);
    println!(
        "  {:<22} {} users ({} active) x {} items ({} active)",
        "shape:",
        summary.num_users,
        summary.users_with_preferences,
        summary.num_items,
        summary.items_with_preferences
    );
    println!("  {:<22} {}", "preferences:", summary.num_preferences);
    println!(
        "  {:<22} {} (users) / {} (items)",
        "id codecs:", summary.user_id_codec, summary.item_id_codec
    );
    println!(
        "  {:<22} {} bytes, {:.2} bits per id",
        "id payload:",
        summary.id_bytes,
        summary.bits_per_id()
    );
    if let Some(codec) = summary.value_codec {
        println!("  {:<22} {}", "value codec:", codec);
        println!(
            "  {:<22} {} bytes, {:.2} bits per value",
            "value payload:",
            summary.value_bytes,
            summary.bits_per_value()
        );
    }
}
