// Global configuration constants - single source of truth

pub struct Config;

impl Config {
    // Target site
    pub const TARGET_DOMAIN: &'static str = "indiankanoon.org";
    pub const USER_AGENT: &'static str =
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    // Files
    pub const SEED_FILE: &'static str = "court_links.csv";
    pub const CHECKPOINT_FILE: &'static str = "scraping_checkpoint.json";
    pub const DOWNLOAD_CHECKPOINT_FILE: &'static str = "scraping_checkpoint_download.json";
    pub const DATA_DIR: &'static str = "./data";
    pub const DOWNLOAD_DIR: &'static str = "./judgments";

    // Year range
    pub const START_YEAR: i32 = 2020;
    pub const END_YEAR: i32 = 2024;

    // Worker pool
    pub const DEFAULT_WORKERS: usize = 4;
    pub const DOWNLOAD_WORKERS: usize = 6;
    pub const DISPATCH_STAGGER_SECS: u64 = 5;

    // Batch sink
    pub const BATCH_SIZE: usize = 100;

    // Handshake
    pub const HANDSHAKE_MAX_ATTEMPTS: u32 = 4;
    pub const RECONNECT_ATTEMPTS: u32 = 3;
    pub const FAST_PATH_POLLS: u32 = 10;
    pub const POLL_INTERVAL_SECS: u64 = 1;
    pub const CHALLENGE_SETTLE_SECS: u64 = 5;
    pub const VERIFY_TIMEOUT_SECS: u64 = 15;
    pub const BACKOFF_BASE_MS: u64 = 1_000;
    pub const BACKOFF_MAX_MS: u64 = 10_000;

    // Traversal / download pacing
    pub const POLITENESS_DELAY_SECS: u64 = 2;
    pub const SAVE_SETTLE_SECS: u64 = 3;

    // Page elements
    pub const LISTING_MARKER: &'static str = "img[alt=\"Indian Kanoon\"]";
    pub const VERIFY_CONTROL: &'static str = "input[value*=\"Verify\"]";
    pub const CHALLENGE_FRAME: &'static str = "iframe";
    pub const PRINT_CONTROL: &'static str = "[devinid='10']";
    pub const PRINT_TEXT: &'static str = "Print it on a file/printer";
}
