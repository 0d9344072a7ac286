//! Global constants for the annotation core.

/// Points closer than this (in image pixels) to the previously placed point
/// are treated as click jitter and rejected.
pub const JITTER_REJECT_DISTANCE: f64 = 1.0;

/// Bias applied in favor of reading along the base edge when resolving the
/// text direction from a stroke.
pub const ALONG_BASE_BIAS: f64 = 1.2;

/// Side edges whose unit horizontal component stays below this threshold are
/// treated as near-vertical, i.e. the text reads horizontally.
pub const HORIZONTAL_TEXT_THRESHOLD: f64 = 0.3;

/// Fixed overlap pre-filter historically applied by the cross-validation
/// entry point before the caller-supplied accept ratio.
pub const DEFAULT_PREFILTER_RATIO: f64 = 0.20;

/// Character text marking an illegible glyph.
pub const ILLEGIBLE_TEXT: &str = "*";

/// Property key marking an ignore region.
pub const MASK_PROP: &str = "mask";
