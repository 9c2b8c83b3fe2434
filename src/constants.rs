//! Shared constants for the cleaning stage.

/// Job type recorded on every run context opened by this stage.
pub const JOB_TYPE: &str = "basic_cleaning";

// Column names the transform operates on.
pub const PRICE_COLUMN: &str = "price";
pub const LONGITUDE_COLUMN: &str = "longitude";
pub const LATITUDE_COLUMN: &str = "latitude";
pub const LAST_REVIEW_COLUMN: &str = "last_review";

// Geographic bounding box for proper NYC listings. Listings outside this box
// are dropped regardless of price.
pub const MIN_LONGITUDE: f64 = -74.25;
pub const MAX_LONGITUDE: f64 = -73.50;
pub const MIN_LATITUDE: f64 = 40.5;
pub const MAX_LATITUDE: f64 = 41.2;

/// Date text form written to the cleaned output.
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Input date formats accepted when coercing `last_review`. Anything else
/// becomes a missing value.
pub const ACCEPTED_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

// Default locations for the filesystem store and the run log.
pub const DEFAULT_STORE_ROOT: &str = "data/store";
pub const DEFAULT_RUNS_DIR: &str = "data/runs";
