//! Shared constants for end-to-end tests

// ============================================================================
// Test User Credentials
// ============================================================================

/// Owns the seeded playlist
pub const OWNER_USER: &str = "dicoding";
pub const OWNER_PASS: &str = "secret-owner";

/// Added as a collaborator by some tests
pub const COLLAB_USER: &str = "johndoe";
pub const COLLAB_PASS: &str = "secret-collab";

/// Never granted access to anything
pub const STRANGER_USER: &str = "stranger";
pub const STRANGER_PASS: &str = "secret-stranger";

// ============================================================================
// Test Catalog Metadata
// ============================================================================

pub const ALBUM_NAME: &str = "Viva la Vida";
pub const ALBUM_YEAR: i32 = 2008;

pub const SONG_1_TITLE: &str = "Life in Technicolor";
pub const SONG_2_TITLE: &str = "Cemeteries of London";
pub const SONG_3_TITLE: &str = "Lost!";

pub const SONG_PERFORMER: &str = "Coldplay";

// ============================================================================
// Test Timeouts and Configuration
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Polling interval when waiting for server ready (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Upper bound on uploaded covers in tests (bytes)
pub const TEST_MAX_COVER_BYTES: usize = 64 * 1024;

pub const TEST_ACCESS_TOKEN_KEY: &str = "test-access-token-key";
pub const TEST_REFRESH_TOKEN_KEY: &str = "test-refresh-token-key";
