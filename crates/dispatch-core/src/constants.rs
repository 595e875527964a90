/// Dispatch engine constants

/// Local-part tokens that mark role accounts rather than people
pub const GENERIC_LOCAL_PARTS: &[&str] = &[
    "info",
    "sales",
    "contact",
    "marketing",
    "booking",
    "frontdesk",
    "reservations",
    "general",
];

/// Placeholder recognised in templates, e.g. `{{name}}`
pub const TAG_PATTERN: &str = r"\{\{\s*([A-Za-z_]+)\s*\}\}";

/// Variation macro, e.g. `{%Hi|Hello%}`
pub const VARIATION_PATTERN: &str = r"(?s)\{%(.*?)%\}";

/// First delay between continuation attempts, doubled on each retry
pub const CONTINUATION_BACKOFF_MS: u64 = 200;
