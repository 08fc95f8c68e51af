//! Rich diagnostic error types for the ytcluster engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text so callers know exactly which stage of a
//! clustering run failed and what to change.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for a clustering run.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum YtcError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    InsufficientData(#[from] InsufficientDataError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    FeatureDimension(#[from] FeatureDimensionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Clustering(#[from] ClusteringError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Export(#[from] ExportError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("feature weights sum to {sum}, expected 1.0")]
    #[diagnostic(
        code(ytc::config::weight_sum),
        help(
            "weights.text + weights.engagement + weights.subscription must equal 1.0 \
             (tolerance 1e-6). Rescale the three values so they add up to one."
        )
    )]
    WeightSum { sum: f64 },

    #[error("feature weight {name} is negative or not finite: {value}")]
    #[diagnostic(
        code(ytc::config::negative_weight),
        help("Every feature weight must be a finite value >= 0.0.")
    )]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("parameter grid {grid} is empty")]
    #[diagnostic(
        code(ytc::config::empty_grid),
        help("Provide at least one candidate value for {grid}.")
    )]
    EmptyGrid { grid: &'static str },

    #[error("density radius {value} is not a positive finite number")]
    #[diagnostic(
        code(ytc::config::radius),
        help("Every entry of density_radius_grid must be > 0.0.")
    )]
    InvalidRadius { value: f64 },

    #[error("minimum neighborhood size must be at least 1")]
    #[diagnostic(
        code(ytc::config::min_neighborhood),
        help("Remove zero from min_neighborhood_grid.")
    )]
    ZeroMinNeighborhood,

    #[error("{field} must be greater than zero")]
    #[diagnostic(
        code(ytc::config::zero_field),
        help("Set {field} to a positive value or drop it to use the default.")
    )]
    ZeroField { field: &'static str },

    #[error("time budget must be a positive number of seconds, got {secs}")]
    #[diagnostic(
        code(ytc::config::time_budget),
        help("Use a positive, representable number of seconds for time_budget_secs, or omit it for no budget.")
    )]
    InvalidTimeBudget { secs: f64 },

    #[error("failed to read config file: {path}")]
    #[diagnostic(
        code(ytc::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    #[diagnostic(
        code(ytc::config::parse),
        help("Check the TOML syntax. random_seed must be a non-negative integer.")
    )]
    Parse { path: String, message: String },
}

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum InputError {
    #[error("duplicate entity id: \"{id}\"")]
    #[diagnostic(
        code(ytc::input::duplicate_entity),
        help("Every entity record in a batch must carry a unique id.")
    )]
    DuplicateEntity { id: String },

    #[error("edge {source_id} -> {target_id} has invalid weight {weight}")]
    #[diagnostic(
        code(ytc::input::edge_weight),
        help("Edge weights must be finite and lie in the interval (0, 1].")
    )]
    InvalidEdgeWeight {
        source_id: String,
        target_id: String,
        weight: f64,
    },

    #[error("failed to read input file: {path}")]
    #[diagnostic(
        code(ytc::input::read),
        help("Ensure the input file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed input in {path}: {message}")]
    #[diagnostic(
        code(ytc::input::malformed),
        help(
            "Input must be a JSON array of records. Timestamps use ISO-8601 \
             (e.g. 2015-06-01T00:00:00Z) and counts are non-negative integers."
        )
    )]
    Malformed { path: String, message: String },
}

// ---------------------------------------------------------------------------
// Insufficient data
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
#[error("only {entities} entities supplied, but the smallest minimum neighborhood is {required}")]
#[diagnostic(
    code(ytc::data::insufficient),
    help(
        "Density-based clustering needs at least as many entities as the smallest \
         candidate in min_neighborhood_grid. Add entities or lower the grid."
    )
)]
pub struct InsufficientDataError {
    pub entities: usize,
    pub required: usize,
}

// ---------------------------------------------------------------------------
// Embedding errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EmbeddingError {
    #[error("text could not be encoded: {preview:?}")]
    #[diagnostic(
        code(ytc::embedding::no_content),
        help(
            "The text is non-empty but contains nothing the embedding model can encode \
             (only control characters). Clean the metadata before clustering."
        )
    )]
    NoEncodableContent { preview: String },

    #[error("embedding model produced a non-finite value for {preview:?}")]
    #[diagnostic(
        code(ytc::embedding::non_finite),
        help("The embedding model returned NaN or infinity. Check the model output.")
    )]
    NonFinite { preview: String },

    #[error("embedding model failed: {message}")]
    #[diagnostic(
        code(ytc::embedding::model),
        help("The underlying embedding model reported an error for this input.")
    )]
    Model { message: String },
}

// ---------------------------------------------------------------------------
// Feature dimension errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum FeatureDimensionError {
    #[error("{feature} vector for entity \"{entity_id}\" has dimension {actual}, expected {expected}")]
    #[diagnostic(
        code(ytc::features::dim_mismatch),
        help(
            "All sub-vectors of one kind must share the dimension declared for the run. \
             Check that the embedding model matches text_dimension."
        )
    )]
    Mismatch {
        feature: &'static str,
        entity_id: String,
        expected: usize,
        actual: usize,
    },

    #[error("embedding model produces dimension {actual}, but text_dimension is {expected}")]
    #[diagnostic(
        code(ytc::features::model_dim),
        help("Set text_dimension to the model's output dimension.")
    )]
    ModelDimension { expected: usize, actual: usize },

    #[error("{feature} features cover {actual} entities, expected {expected}")]
    #[diagnostic(
        code(ytc::features::count_mismatch),
        help("Every feature builder must emit exactly one vector per entity.")
    )]
    CountMismatch {
        feature: &'static str,
        expected: usize,
        actual: usize,
    },
}

// ---------------------------------------------------------------------------
// Clustering errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ClusteringError {
    #[error("{rows} rows is fewer than the minimum neighborhood size {min_neighbors}")]
    #[diagnostic(
        code(ytc::cluster::too_few_points),
        help("Lower min_neighbors or supply more entities.")
    )]
    TooFewPoints { rows: usize, min_neighbors: usize },

    #[error("non-finite value in feature row {row}")]
    #[diagnostic(
        code(ytc::cluster::non_finite),
        help("A NaN or infinite feature reached the clustering step. Inspect the inputs.")
    )]
    NonFinite { row: usize },

    #[error("density radius {radius} is not a positive finite number")]
    #[diagnostic(
        code(ytc::cluster::radius),
        help("The DBSCAN radius must be > 0.0.")
    )]
    InvalidRadius { radius: f64 },

    #[error("none of the {candidates} parameter candidates produced an assignment")]
    #[diagnostic(
        code(ytc::cluster::no_candidate),
        help(
            "Every (radius, min_neighborhood) pair was rejected. Widen the grids \
             or lower the minimum neighborhood values."
        )
    )]
    NoViableCandidate { candidates: usize },

    #[error("time budget exhausted before any parameter candidate finished")]
    #[diagnostic(
        code(ytc::cluster::budget),
        help("Increase time_budget_secs or shrink the parameter grids.")
    )]
    BudgetExhausted,
}

// ---------------------------------------------------------------------------
// Export errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ExportError {
    #[error("JSON error: {message}")]
    #[diagnostic(
        code(ytc::export::json),
        help("The record does not match the documented cluster record format.")
    )]
    Json { message: String },

    #[error("I/O error on {path}")]
    #[diagnostic(
        code(ytc::export::io),
        help("Check that the path exists and has correct permissions.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<serde_json::Error> for ExportError {
    fn from(e: serde_json::Error) -> Self {
        ExportError::Json {
            message: e.to_string(),
        }
    }
}

/// Convenience alias for functions returning ytcluster results.
pub type YtcResult<T> = std::result::Result<T, YtcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_ytc_error() {
        let err = ConfigError::WeightSum { sum: 1.5 };
        let top: YtcError = err.into();
        assert!(matches!(top, YtcError::Config(ConfigError::WeightSum { .. })));
    }

    #[test]
    fn insufficient_data_message_names_counts() {
        let err = InsufficientDataError {
            entities: 1,
            required: 5,
        };
        let msg = format!("{err}");
        assert!(msg.contains('1'));
        assert!(msg.contains('5'));
    }

    #[test]
    fn dimension_error_display_is_descriptive() {
        let err = FeatureDimensionError::Mismatch {
            feature: "semantic",
            entity_id: "UC1".into(),
            expected: 384,
            actual: 128,
        };
        let msg = format!("{err}");
        assert!(msg.contains("384"));
        assert!(msg.contains("128"));
        assert!(msg.contains("UC1"));
    }

    #[test]
    fn serde_json_error_maps_to_export_error() {
        let parse: Result<u32, _> = serde_json::from_str("not json");
        let err: ExportError = parse.unwrap_err().into();
        assert!(matches!(err, ExportError::Json { .. }));
    }
}
