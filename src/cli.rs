//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{ArgAction, Args as ClapArgs, Parser};

use iadl_core::{Category, DEFAULT_BASE_URL, DEFAULT_CONCURRENCY, DEFAULT_MAX_RETRIES};

/// Default fixed wait between attempts of one file, in milliseconds.
pub(crate) const DEFAULT_RETRY_BACKOFF_MS: u64 = 2000;

/// Default pause after each finished file, in milliseconds.
pub(crate) const DEFAULT_COURTESY_DELAY_MS: u64 = 1000;

/// Download files from an Internet Archive item.
///
/// iadl reads an item's listing page, keeps the download links that match the
/// selected file categories, and fetches them into a destination folder.
#[derive(Parser, Debug)]
#[command(name = "iadl")]
#[command(author, version, about)]
pub struct Args {
    /// Internet Archive item URL or bare item identifier
    #[arg(short = 'u', long = "url", value_name = "URL")]
    pub url: String,

    /// Destination folder (not required with -s/--show-links)
    #[arg(short = 'd', long = "dest", value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Limit how many discovered files are acted on (0 = no limit)
    #[arg(short = 'l', long, default_value_t = 0)]
    pub limit: usize,

    /// Display the discovered links without downloading
    #[arg(short = 's', long = "show-links")]
    pub show_links: bool,

    /// Maximum concurrent downloads (1-100)
    #[arg(
        short = 'c',
        long = "concurrent",
        default_value_t = DEFAULT_CONCURRENCY as u8,
        value_parser = clap::value_parser!(u8).range(1..=100)
    )]
    pub concurrent: u8,

    #[command(flatten)]
    pub categories: CategoryArgs,

    /// Remote host the item listing is fetched from
    #[arg(long, value_name = "URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Maximum attempts per file, including the first (1-10)
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_RETRIES as u8,
        value_parser = clap::value_parser!(u8).range(1..=10)
    )]
    pub max_retries: u8,

    /// Wait between attempts of one file, in milliseconds
    #[arg(long, default_value_t = DEFAULT_RETRY_BACKOFF_MS)]
    pub retry_backoff_ms: u64,

    /// Pause after each finished file, in milliseconds
    #[arg(long, default_value_t = DEFAULT_COURTESY_DELAY_MS)]
    pub courtesy_delay_ms: u64,

    /// Read defaults from this config file instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (--verbose for debug, twice for trace)
    #[arg(long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Print links or the final summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

/// File category filters. Selecting none keeps every known file type.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct CategoryArgs {
    /// Archive formats
    #[arg(short = 'z', long)]
    pub archive: bool,

    /// Video formats
    #[arg(short = 'v', long)]
    pub video: bool,

    /// Audio formats
    #[arg(short = 'm', long)]
    pub audio: bool,

    /// Streaming formats
    #[arg(short = 't', long)]
    pub streaming: bool,

    /// Audiobook formats
    #[arg(short = 'b', long)]
    pub audiobooks: bool,

    /// Disk images
    #[arg(short = 'i', long = "disk-images")]
    pub disk_images: bool,

    /// Documents
    #[arg(short = 'o', long)]
    pub documents: bool,

    /// Executables
    #[arg(short = 'x', long)]
    pub executables: bool,

    /// Data files
    #[arg(short = 'f', long)]
    pub data: bool,

    /// Web files
    #[arg(short = 'w', long)]
    pub web: bool,

    /// Comics
    #[arg(short = 'k', long)]
    pub comics: bool,

    /// eBooks
    #[arg(short = 'e', long)]
    pub ebooks: bool,

    /// Pictures
    #[arg(short = 'p', long)]
    pub pictures: bool,

    /// Graphics containers
    #[arg(short = 'n', long)]
    pub containers: bool,

    /// Torrents
    #[arg(short = 'r', long)]
    pub torrent: bool,
}

impl CategoryArgs {
    /// Returns the selected categories in flag order.
    #[must_use]
    pub fn selected(&self) -> Vec<Category> {
        [
            (self.archive, Category::Archive),
            (self.video, Category::Video),
            (self.audio, Category::Audio),
            (self.streaming, Category::Streaming),
            (self.audiobooks, Category::Audiobook),
            (self.disk_images, Category::DiskImage),
            (self.documents, Category::Document),
            (self.executables, Category::Executable),
            (self.data, Category::Data),
            (self.web, Category::Web),
            (self.comics, Category::Comic),
            (self.ebooks, Category::Ebook),
            (self.pictures, Category::Picture),
            (self.containers, Category::GraphicsContainer),
            (self.torrent, Category::Torrent),
        ]
        .into_iter()
        .filter_map(|(selected, category)| selected.then_some(category))
        .collect()
    }
}
