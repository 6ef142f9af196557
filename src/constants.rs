//! HashBack draft 4.0 constants: the version string, the fixed salt and
//! default Issuer limits.
//!
//! The salt and version must match byte-for-byte across every Caller and
//! Issuer implementation, otherwise the verification hash will never agree.

/// The only `Version` value this implementation accepts.  No negotiation.
pub const VERSION: &str = "BILLPG_DRAFT_4.0";

/// Optional authentication scheme token in front of the header payload.
/// Matched case-insensitively on parse; always emitted as-is on generate.
pub const SCHEME: &str = "HashBack";

/// Fixed PBKDF2 salt from draft 4.0.  Domain separation, not secrecy.
pub const FIXED_SALT: [u8; 32] = [
    113, 218, 98, 9, 6, 165, 151, 157,
    46, 28, 229, 16, 66, 91, 91, 72,
    150, 246, 69, 83, 216, 235, 21, 239,
    162, 229, 139, 163, 6, 73, 175, 201,
];

/// PBKDF2 output length in bytes (256 bits).
pub const HASH_LEN: usize = 32;

/// Unus is exactly 128 random bits.
pub const UNUS_LEN: usize = 16;

// ── Replay window ────────────────────────────────────────────

/// Number of recent Unus values remembered per tracker.
pub const UNUS_TRACKER_CAPACITY: usize = 999;

/// Added to the folded Unus so its decimal form has a stable width.
/// Sixteen zeros just exceeds anything the fold can produce for 16 bytes.
pub const UNUS_FOLD_OFFSET: u64 = 10_000_000_000_000_000;

// ── Default policies ─────────────────────────────────────────

/// Allowed distance between the supplied `Now` and the Issuer's clock.
pub const DEFAULT_CLOCK_SKEW_SECONDS: u32 = 9;

pub const DEFAULT_MIN_ROUNDS: i64 = 1;
pub const DEFAULT_MAX_ROUNDS: i64 = 99;

/// Rounds used by a freshly constructed generator.
pub const DEFAULT_GENERATOR_ROUNDS: u32 = 1;
