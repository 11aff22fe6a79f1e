//! Run-level error types.

/// A full aggregation pass completed without any adapter producing data.
///
/// Each run is a full re-snapshot; an empty result set must fail loudly
/// instead of publishing an empty graph set.
#[derive(Debug, thiserror::Error)]
#[error("no adapter produced any asset data")]
pub struct EmptyAggregation;
