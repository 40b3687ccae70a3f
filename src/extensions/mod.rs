//! File-name suffix taxonomy used to filter discovered links.
//!
//! Suffixes are grouped into fixed [`Category`] tables. A selection of
//! categories resolves into an [`ExtensionFilter`]: the deduplicated union of
//! the selected tables, or [`ExtensionFilter::MatchAll`] when nothing was
//! selected.
//!
//! Every table entry is one suffix with its leading dot, so matching is on
//! whole extensions: `.ps` matches `paper.ps` but not `maps`.
//!
//! # Example
//!
//! ```
//! use iadl_core::extensions::{Category, ExtensionFilter, resolve_filter};
//!
//! let filter = resolve_filter(&[Category::Video, Category::Audio]);
//! assert!(filter.matches("/download/item/clip.mp4"));
//! assert!(!filter.matches("/download/item/readme.pdf"));
//!
//! assert_eq!(resolve_filter(&[]), ExtensionFilter::MatchAll);
//! ```

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, instrument};

const ARCHIVE: &[&str] = &[
    ".7z", ".zip", ".rar", ".tar", ".gz", ".xz", ".lz", ".lzma", ".zst", ".tgz", ".tbz", ".tb2",
    ".tbz2", ".tar.gz", ".tar.bz2", ".tar.xz", ".tar.lzma", ".tar.zst", ".tar.lz", ".tar.bzip2",
    ".tar.lzip", ".tar.lzop", ".tar.zlib", ".tar.lzo", ".cab", ".arj", ".ace", ".zoo", ".zipx",
    ".war", ".ear", ".lzh", ".lha", ".pax", ".cpio", ".bzip", ".bzip2", ".uue",
];

const VIDEO: &[&str] = &[
    ".avi", ".mov", ".wmv", ".mpg", ".mpeg", ".mp4", ".mkv", ".webm", ".flv", ".3gp", ".m4v",
    ".vob", ".ogv", ".gifv", ".mng", ".mts", ".m2ts", ".ts", ".divx", ".dv", ".f4v", ".f4p",
    ".f4a", ".f4b", ".h264", ".h265", ".hevc", ".vp8", ".vp9", ".av1", ".xvid", ".qt", ".svi",
    ".rm", ".rmvb", ".asf", ".drc", ".mjpeg", ".mjpg", ".mp2v", ".mp4v", ".mpv", ".nsv", ".ogm",
    ".roq", ".srt", ".sub", ".idx", ".vtt",
];

const AUDIO: &[&str] = &[
    ".mp3", ".flac", ".alac", ".wav", ".aac", ".ogg", ".wma", ".opus", ".m4p", ".aiff",
];

const STREAMING: &[&str] = &[".m3u8", ".m3u", ".ts", ".m4s", ".mpd"];

const AUDIOBOOK: &[&str] = &[".m4b", ".m4p", ".m4a", ".aa", ".aax"];

const DISK_IMAGE: &[&str] = &[
    ".iso", ".img", ".bin", ".cue", ".dmg", ".nrg", ".toast", ".raw", ".qcow", ".qcow2", ".vmdk",
    ".vdi", ".vhd", ".vhdx", ".hdd", ".hdi",
];

const DOCUMENT: &[&str] = &[
    ".txt", ".pdf", ".doc", ".docx", ".ppt", ".pptx", ".xls", ".xlsx",
];

const EXECUTABLE: &[&str] = &[".exe", ".msi", ".apk", ".deb", ".rpm", ".jar"];

const DATA: &[&str] = &[".txt", ".csv", ".json", ".xml", ".sqlite"];

const WEB: &[&str] = &[".html", ".css", ".js"];

const COMIC: &[&str] = &[".cbr", ".cbz", ".cb7", ".cbt", ".cba"];

const EBOOK: &[&str] = &[
    ".epub", ".mobi", ".lrf", ".lrx", ".pkg", ".opf", ".lit", ".ps", ".djvu", ".azw", ".azw3",
    ".ibooks", ".kf8", ".kfx", ".prc", ".pdb", ".fb2", ".fbz", ".fb2.zip", ".xeb", ".xhtml",
    ".ceb",
];

const HELP: &[&str] = &[".chm", ".hlp"];

const PICTURE: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webm", ".jpeg2000", ".webp", ".hdr", ".heif", ".avif",
    ".jpegxl", ".tiff", ".bmp", ".ppm", ".pgm", ".pbm", ".pnm",
];

const GRAPHICS_CONTAINER: &[&str] = &[
    ".afphoto", ".cd5", ".clip", ".cpt", ".kra", ".mdp", ".pdn", ".pld", ".psd", ".psp", ".sai",
    ".xcf",
];

const TORRENT: &[&str] = &[".torrent"];

/// Named group of file-name suffixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Archive,
    Video,
    Audio,
    Streaming,
    Audiobook,
    DiskImage,
    Document,
    Executable,
    Data,
    Web,
    Comic,
    Ebook,
    Picture,
    GraphicsContainer,
    Torrent,
    /// Help files. Only reachable through [`ExtensionFilter::MatchAll`].
    Help,
}

impl Category {
    /// Every category, including ones that cannot be selected on their own.
    pub const ALL: [Category; 16] = [
        Category::Archive,
        Category::Video,
        Category::Audio,
        Category::Streaming,
        Category::Audiobook,
        Category::DiskImage,
        Category::Document,
        Category::Executable,
        Category::Data,
        Category::Web,
        Category::Comic,
        Category::Ebook,
        Category::Picture,
        Category::GraphicsContainer,
        Category::Torrent,
        Category::Help,
    ];

    /// Returns the fixed suffix table for this category.
    #[must_use]
    pub fn suffixes(self) -> &'static [&'static str] {
        match self {
            Self::Archive => ARCHIVE,
            Self::Video => VIDEO,
            Self::Audio => AUDIO,
            Self::Streaming => STREAMING,
            Self::Audiobook => AUDIOBOOK,
            Self::DiskImage => DISK_IMAGE,
            Self::Document => DOCUMENT,
            Self::Executable => EXECUTABLE,
            Self::Data => DATA,
            Self::Web => WEB,
            Self::Comic => COMIC,
            Self::Ebook => EBOOK,
            Self::Picture => PICTURE,
            Self::GraphicsContainer => GRAPHICS_CONTAINER,
            Self::Torrent => TORRENT,
            Self::Help => HELP,
        }
    }

    /// Returns true if a caller may select this category explicitly.
    #[must_use]
    pub fn is_selectable(self) -> bool {
        !matches!(self, Self::Help)
    }

    /// Returns the stable kebab-case label for display output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Streaming => "streaming",
            Self::Audiobook => "audiobook",
            Self::DiskImage => "disk-image",
            Self::Document => "document",
            Self::Executable => "executable",
            Self::Data => "data",
            Self::Web => "web",
            Self::Comic => "comic",
            Self::Ebook => "ebook",
            Self::Picture => "picture",
            Self::GraphicsContainer => "graphics-container",
            Self::Torrent => "torrent",
            Self::Help => "help",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved suffix filter applied to discovered hrefs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionFilter {
    /// No category was selected: every known suffix across all categories matches.
    MatchAll,
    /// Union of the selected categories' suffixes.
    Only(BTreeSet<&'static str>),
}

impl ExtensionFilter {
    /// Returns true if `href` ends with a suffix admitted by this filter.
    ///
    /// Comparison is literal and case-sensitive against the raw href.
    #[must_use]
    pub fn matches(&self, href: &str) -> bool {
        match self {
            Self::MatchAll => Category::ALL
                .iter()
                .flat_map(|category| category.suffixes())
                .any(|suffix| href.ends_with(suffix)),
            Self::Only(suffixes) => suffixes.iter().any(|suffix| href.ends_with(suffix)),
        }
    }

    /// Returns true for the "no filter" sentinel.
    #[must_use]
    pub fn is_match_all(&self) -> bool {
        matches!(self, Self::MatchAll)
    }

    /// Returns the concrete suffix set, expanding [`Self::MatchAll`] to every known suffix.
    #[must_use]
    pub fn suffixes(&self) -> BTreeSet<&'static str> {
        match self {
            Self::MatchAll => union_of(&Category::ALL),
            Self::Only(suffixes) => suffixes.clone(),
        }
    }
}

/// Combines a category selection into a single filter.
///
/// An empty selection yields [`ExtensionFilter::MatchAll`], never an empty set.
/// Selection order and repeated categories do not affect the result.
#[must_use]
#[instrument(level = "debug")]
pub fn resolve_filter(selected: &[Category]) -> ExtensionFilter {
    if selected.is_empty() {
        debug!("no categories selected, matching all known suffixes");
        return ExtensionFilter::MatchAll;
    }

    let suffixes = union_of(selected);
    debug!(suffix_count = suffixes.len(), "resolved extension filter");
    ExtensionFilter::Only(suffixes)
}

fn union_of(categories: &[Category]) -> BTreeSet<&'static str> {
    categories
        .iter()
        .flat_map(|category| category.suffixes().iter().copied())
        .collect()
}
