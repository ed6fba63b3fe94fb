use imgu_core::constants::{MAX_EFFORT, MAX_QUALITY};
use imgu_core::ImageFormat;

/// Parameters of one encode call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub format: ImageFormat,
    /// The source has more than one frame
    pub animated: bool,
    pub lossless: bool,
    /// 0..=100
    pub quality: u8,
    /// 0..=10, higher is slower and smaller
    pub effort: u8,
}

impl EncodeParams {
    /// Clamp raw request values into the supported ranges
    pub fn new(format: ImageFormat, animated: bool, lossless: bool, quality: i32, effort: i32) -> Self {
        Self {
            format,
            animated,
            lossless,
            quality: quality.clamp(0, MAX_QUALITY) as u8,
            effort: effort.clamp(0, MAX_EFFORT) as u8,
        }
    }
}

/// Encode an image into the requested format.
///
/// `None` means the input is malformed or cannot be represented in the
/// target format. Implementations are CPU-bound and synchronous; async
/// callers should run them on the blocking pool.
pub trait ImageCodec: Send + Sync {
    fn encode(&self, input: &[u8], params: &EncodeParams) -> Option<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_are_clamped() {
        let params = EncodeParams::new(ImageFormat::Webp, false, false, 250, -3);
        assert_eq!(params.quality, 100);
        assert_eq!(params.effort, 0);

        let params = EncodeParams::new(ImageFormat::Avif, false, true, 80, 4);
        assert_eq!(params.quality, 80);
        assert_eq!(params.effort, 4);
    }
}
