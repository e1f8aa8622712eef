use thiserror::Error;

/// Result type for resampling and blending.
pub type SynthResult<T> = Result<T, SynthError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthError {
    #[error("cannot blend a {a} with a {b}")]
    IncompatiblePrimitiveKinds { a: &'static str, b: &'static str },
    #[error("degenerate grid: {0}")]
    DegenerateGrid(String),
    #[error("spatial index unavailable: {0}")]
    IndexUnavailable(String),
    #[error("blend fraction must lie in [0, 1], got {0}")]
    InvalidBlendFraction(f64),
    #[error("{grid} grids differ in size: {a_rows}x{a_cols} vs {b_rows}x{b_cols}")]
    ResolutionMismatch {
        grid: &'static str,
        a_rows: usize,
        a_cols: usize,
        b_rows: usize,
        b_cols: usize,
    },
    #[error(transparent)]
    Stitch(#[from] StitchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StitchError {
    #[error("triangle references vertex {index} but only {emitted} vertices were emitted")]
    ForwardReference { index: u32, emitted: u32 },
    #[error("grid handle needs at least 2 rows and 2 columns, got {rows}x{cols}")]
    GridTooSmall { rows: usize, cols: usize },
    #[error("ring {row} is outside the {rows}-row grid")]
    RingOutOfRange { row: usize, rows: usize },
    #[error("column map has {got} entries for a {expected}-column ring")]
    ColumnMapMismatch { got: usize, expected: usize },
    #[error("column {col} is outside a {cols}-column ring")]
    ColumnOutOfRange { col: usize, cols: usize },
    #[error("sheet rim needs 4 edges and 4 corners, got {edges} and {corners}")]
    RimMismatch { edges: usize, corners: usize },
    #[error("edge {run} has {got} rings but its plane boundary has {expected} vertices")]
    RunLength { run: usize, got: usize, expected: usize },
}
