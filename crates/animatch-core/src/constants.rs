//! Constants shared across the pipeline.

/// Dimensionality of both embedding kinds.
pub const EMBEDDING_DIMENSION: usize = 512;

/// Decimal places kept for every persisted embedding component.
pub const EMBEDDING_PRECISION: u32 = 6;

/// Decimal places kept for similarity scores in duplicate reports.
pub const SIMILARITY_PRECISION: u32 = 4;

/// Cosine similarity above which a candidate is reported as a duplicate.
pub const DUPLICATE_THRESHOLD: f64 = 0.95;

/// Accepted deviation from unit length for a stored embedding.
pub const UNIT_NORM_TOLERANCE: f64 = 1e-4;

/// Default semantic model identifier recorded in the snapshot header.
pub const DEFAULT_MODEL_IDENTIFIER: &str = "ViT-B-32";

/// Default pretrained weights tag recorded in the snapshot header.
pub const DEFAULT_PRETRAINED_TAG: &str = "openai";

/// Fallback partner color when the relational row has none.
pub const DEFAULT_PARTNER_COLOR: &str = "linear-gradient(135deg, #667eea, #764ba2)";

/// Fallback partner emoji when the relational row has none.
pub const DEFAULT_PARTNER_EMOJI: &str = "💫";

/// Fallback work tier.
pub const DEFAULT_TIER: u8 = 2;
