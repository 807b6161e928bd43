use thiserror::Error;
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
    #[error("channel index {index} out of range for a {available}-channel stream")]
    ChannelOutOfRange { index: usize, available: usize },
    #[error("invalid window parameters: {0}")]
    InvalidWindow(String),
    #[error("Can't find EEG stream.")]
    StreamNotFound,
    #[error("lsl: {0}")]
    Lsl(String),
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for ScanError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        ScanError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for ScanError {
    fn from(value: image::ImageError) -> Self {
        ScanError::Plot(value.to_string())
    }
}
