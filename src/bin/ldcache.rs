use bpaf::Bpaf;
use camino::Utf8PathBuf;
use ldcache::CacheConfig;
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Bpaf)]
#[bpaf(options)]
struct Options {
    #[bpaf(short, long)]
    /// Verbose output
    verbose: bool,

    #[bpaf(short, long)]
    /// Print cache contents
    print_cache: bool,

    #[bpaf(short('r'), long, argument("PREFIX"))]
    /// Use alternative root prefix (like chroot)
    root: Option<Utf8PathBuf>,

    #[bpaf(short('C'), long, argument("CACHE"))]
    /// Use cache file path
    cache: Option<Utf8PathBuf>,

    #[bpaf(positional("NAME"), many)]
    /// Library name prefixes to look up
    names: Vec<String>,
}

/// Initialize the tracing subscriber
///
/// # Arguments
///
/// * `verbose` - If true, sets log level to DEBUG, otherwise INFO
pub fn init_logging(verbose: bool) {
    let filter_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Allow overriding via RUST_LOG
    let env_filter = EnvFilter::builder()
        .with_default_directive(filter_level.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_level(verbose)
        .with_target(verbose)
        .with_line_number(verbose)
        .without_time()
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    debug!("Logging initialized with level: {}", filter_level);
}

fn main() -> anyhow::Result<()> {
    let options = options().run();

    init_logging(options.verbose);

    let config = CacheConfig::builder()
        .maybe_root(options.root)
        .maybe_cache_path(options.cache)
        .build();

    let cache = config.open()?;
    debug!("Using cache: {}", cache.path());

    if options.print_cache {
        print!("{}", cache);
    }

    if !options.names.is_empty() {
        let found = cache.lookup(&options.names);
        if found.is_empty() {
            info!("No libraries matching {:?}", options.names);
        }
        for path in &found.paths32 {
            println!("32\t{}", path);
        }
        for path in &found.paths64 {
            println!("64\t{}", path);
        }
    }

    cache.close();
    Ok(())
}
