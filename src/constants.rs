// src/constants.rs
//! Domain constants that define the operational boundaries of the system.
//!
//! Reading these constants should tell you the story of how the importers
//! operate: how hard they lean on the wiki API, how long caches stay
//! trustworthy, and where everything lands on disk.

// ---------------------------------------------------------------------------
// Wiki API boundaries
// ---------------------------------------------------------------------------

/// Endpoint of the wiki's MediaWiki action API.
pub const WIKI_API_URL: &str = "https://yugipedia.com/api.php";

/// Minimum spacing between consecutive API calls, in seconds.
///
/// The wiki asks bots to stay near one request per second; 1.1 s keeps us
/// politely under that even with clock jitter.
pub const WIKI_RATE_LIMIT_SECS: f64 = 1.1;

/// Multiplier applied to the rate limit when the server signals overload.
pub const WIKI_OVERLOAD_BACKOFF_FACTOR: u32 = 10;

/// How many page ids (or titles) one batched API call may carry.
///
/// The MediaWiki limit for anonymous clients is 50 values per multi-value
/// parameter. Ids and titles are never mixed within one parameter.
pub const BATCH_PAGE_MAX: usize = 50;

/// Seconds after which the incremental change log is abandoned in favor of
/// re-enumerating every tracked category (roughly one month).
pub const FULL_RECRAWL_AFTER_SECS: i64 = 30 * 24 * 60 * 60;

// ---------------------------------------------------------------------------
// Tracked categories
// ---------------------------------------------------------------------------

pub const CAT_TCG_CARDS: &str = "Category:TCG cards";
pub const CAT_OCG_CARDS: &str = "Category:OCG cards";
pub const CAT_TCG_SETS: &str = "Category:TCG sets";
pub const CAT_OCG_SETS: &str = "Category:OCG sets";
pub const CAT_TOKENS: &str = "Category:Tokens";
pub const CAT_SKILLS: &str = "Category:Skill Cards";

// ---------------------------------------------------------------------------
// Cache files (one JSON file per namespace, under the temp-data directory)
// ---------------------------------------------------------------------------

pub const PAGES_FILENAME: &str = "wiki_pages.json";
pub const MISSING_PAGES_FILENAME: &str = "wiki_missing.json";
pub const CONTENTS_FILENAME: &str = "wiki_contents.json";
pub const PAGE_CATS_FILENAME: &str = "wiki_categories.json";
pub const CAT_MEMBERS_FILENAME: &str = "wiki_members.json";
pub const IMAGE_URLS_FILENAME: &str = "wiki_images.json";

// ---------------------------------------------------------------------------
// Bulk-dump sources
// ---------------------------------------------------------------------------

/// Aggregate card dump maintained by the YAML Yugi project.
pub const YAMLYUGI_CARDS_URL: &str =
    "https://github.com/DawnbrandBots/yaml-yugi/raw/aggregate/cards.json";
pub const YAMLYUGI_CARDS_FILENAME: &str = "yamlyugi_cards.json";

/// YGOPRODeck card database API.
pub const PRODECK_API_URL: &str = "https://db.ygoprodeck.com/api/v7/cardinfo.php";
pub const PRODECK_CARDS_FILENAME: &str = "prodeck_cards.json";

/// Seconds a downloaded YGOPRODeck dump stays fresh before it is refetched.
pub const PRODECK_REFRESH_SECS: u64 = 4 * 60 * 60;

/// Largest password that corresponds to a real printed card; higher values
/// are placeholder ids invented by aggregators.
pub const MAX_REAL_PASSWORD: i64 = 99_999_999;

// ---------------------------------------------------------------------------
// Entity store files
// ---------------------------------------------------------------------------

pub const CARDLIST_FILENAME: &str = "cards.json";
pub const CARDS_DIRNAME: &str = "cards";
pub const SETLIST_FILENAME: &str = "sets.json";
pub const SETS_DIRNAME: &str = "sets";
pub const AGGREGATE_DIRNAME: &str = "aggregate";
pub const SYNC_STATE_FILENAME: &str = "sync_state.json";
