/// Rejected terrain configuration. Raised at construction time, before any
/// buffer is allocated or any mesh is produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("map dimension {axis} must be > 0 (got {value})")]
    ZeroDimension { axis: &'static str, value: usize },

    #[error("map of {map_sub_x}x{map_sub_z} samples does not fit in memory")]
    MapTooLarge { map_sub_x: usize, map_sub_z: usize },

    #[error("terrain_sub must be > 0")]
    ZeroTerrainSub,

    #[error(
        "terrain_sub={terrain_sub} exceeds the backing map ({map_sub_x}x{map_sub_z} samples)"
    )]
    WindowTooLarge {
        terrain_sub: usize,
        map_sub_x: usize,
        map_sub_z: usize,
    },

    #[error("{name} must be {requirement} (got {value})")]
    InvalidScale {
        name: &'static str,
        requirement: &'static str,
        value: f64,
    },

    #[error("seed must be finite (got {0})")]
    NonFiniteSeed(f64),

    #[error("map buffer holds {actual} floats, expected {expected}")]
    BufferLength { expected: usize, actual: usize },

    #[error("map buffer is not a regular square lattice (step {0})")]
    IrregularSpacing(f32),

    #[error("sub_tolerance must be >= 1")]
    ZeroTolerance,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("generation aborted after {completed_rows} of {total_rows} rows")]
    Aborted {
        completed_rows: usize,
        total_rows: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("terrain window has been disposed")]
    Disposed,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to read terrain config: {0}")]
    Io(#[from] std::io::Error),

    #[error("terrain config was not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("failed to parse terrain config ron: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("invalid terrain config: {0}")]
    Invalid(#[from] ConfigError),
}
