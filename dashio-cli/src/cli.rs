use clap::Parser;
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser)]
#[command(
    version,
    about = "Mirror the assets referenced by an MPEG-DASH manifest",
    long_about = "Downloads every asset an MPEG-DASH (MPD) manifest references into a\n\
                  local directory tree keyed by host and URL path.\n\
                  \n\
                  Segment URLs are derived from SegmentList, SegmentBase and\n\
                  SegmentTemplate addressing (number- and timeline-based), with\n\
                  BaseURL inheritance resolved the way a DASH player would.\n\
                  Targets can be narrowed by representation id, MIME type, or host."
)]
pub struct CliArgs {
    /// Manifest to mirror
    #[arg(required = true, help = "URL or local file path of the MPD manifest")]
    pub manifest: String,

    /// Output directory for the mirrored tree
    #[arg(
        short,
        long,
        default_value = "dash_downloads",
        help = "Directory the mirrored asset tree is written under"
    )]
    pub out: PathBuf,

    /// Restrict downloads to specific representations
    #[arg(
        long = "filter-repr-id",
        value_name = "ID",
        help = "Only download targets from this representation id (can be used multiple times)"
    )]
    pub filter_repr_id: Vec<String>,

    /// Restrict downloads to specific MIME types
    #[arg(
        long = "filter-mime",
        value_name = "MIME",
        help = "Only download targets with this MIME type (can be used multiple times)"
    )]
    pub filter_mime: Vec<String>,

    /// Restrict downloads to specific hosts
    #[arg(
        long = "only-domain",
        value_name = "HOST",
        help = "Only download targets hosted on this domain (can be used multiple times)"
    )]
    pub only_domain: Vec<String>,

    /// Number of concurrent downloads
    #[arg(
        short,
        long,
        default_value = "8",
        help = "Maximum number of concurrently in-flight downloads"
    )]
    pub concurrency: usize,

    /// Retry attempts for failed downloads
    #[arg(
        long,
        default_value = "3",
        help = "Number of retry attempts after a failed download attempt"
    )]
    pub retry: u32,

    /// Per-attempt timeout in seconds
    #[arg(
        long,
        default_value = "30",
        help = "Overall timeout in seconds for each HTTP request attempt"
    )]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value = "10",
        help = "Connection timeout in seconds (time to establish initial connection)"
    )]
    pub connect_timeout: u64,

    /// List targets without downloading them
    #[arg(
        long,
        help = "Resolve and list every download target without fetching anything"
    )]
    pub dry_run: bool,

    /// Custom HTTP headers for download requests
    #[arg(
        long = "header",
        short = 'H',
        value_name = "HEADER",
        help = "Add custom HTTP header to requests (can be used multiple times). Format: 'Name: Value'"
    )]
    pub headers: Vec<String>,

    /// Override the User-Agent header
    #[arg(long, help = "Custom User-Agent string sent with every request")]
    pub user_agent: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable detailed debug logging")]
    pub verbose: bool,
}
