//! Image processing: pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode metadata** | `ImageReader::with_guessed_format` + full decode |
//! | **Optimize** | same-size re-encode in the source format |
//! | **Derivatives** | fit-inside `Lanczos3` resize, one encode per size profile |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing encodes
//! - **Codec**: [`ImageCodec`] trait + [`RustCodec`]
//! - **Derivatives**: Parallel per-profile encoding on top of a codec

mod calculations;
pub mod codec;
pub mod derivatives;
mod params;
pub mod rust_codec;

pub use calculations::fit_inside;
pub use codec::{CodecError, ImageCodec, ImageInfo, ImageKind};
pub use derivatives::{Derivative, DerivativeConfig, build_derivatives};
pub use params::{EncodeParams, Effort, Quality, SizeProfile};
pub use rust_codec::RustCodec;
