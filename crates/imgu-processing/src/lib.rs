//! Image codec boundary
//!
//! The upload path treats encoding as an opaque step: bytes in, bytes of the
//! requested format out, or nothing if the input cannot be encoded.
//! [`ImageCodec`] is that seam; [`NativeCodec`] is the production encoder.

pub mod codec;
pub mod detect;
#[cfg(feature = "native")]
pub mod native;

pub use codec::{EncodeParams, ImageCodec};
pub use detect::is_animated;
#[cfg(feature = "native")]
pub use native::NativeCodec;
