use thiserror::Error;

/// Main error type for the retro-ntsc library
#[derive(Error, Debug)]
pub enum NtscError {
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    #[error("Filter state error: {0}")]
    State(#[from] StateError),

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),

    #[error("Color conversion error: {0}")]
    Color(#[from] ColorError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Setup-argument errors
#[derive(Error, Debug)]
pub enum ParameterError {
    #[error("parameter '{field}' = {value} is outside [-1, 1]")]
    OutOfRange { field: &'static str, value: f64 },

    #[error("unknown preset: '{name}', expected one of composite, svideo, rgb, monochrome")]
    UnknownPreset { name: String },
}

/// Filter lifecycle errors
#[derive(Error, Debug)]
pub enum StateError {
    #[error("filter has no compiled kernel; call configure() before process()")]
    Unconfigured,
}

/// Pixel-grid shape errors
#[derive(Error, Debug)]
pub enum BufferError {
    #[error("buffer length {got} does not match the fixed grid size {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("buffer length {len} is not a whole number of RGB triples")]
    NotRgbTriples { len: usize },
}

/// Palette and color-space conversion errors
#[derive(Error, Debug)]
pub enum ColorError {
    #[error("palette index {value} at position {position} is outside [0, {limit}]")]
    IndexOutOfRange {
        position: usize,
        value: u8,
        limit: u8,
    },
}

/// Configuration-file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using NtscError
pub type Result<T> = std::result::Result<T, NtscError>;
