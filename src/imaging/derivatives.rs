//! Derivative generation.
//!
//! Combines size profiles with codec execution: one encode per profile, all
//! from the same source bytes, keeping the source format.

use super::codec::{CodecError, ImageCodec, ImageKind};
use super::params::{EncodeParams, Effort, Quality, SizeProfile};
use rayon::prelude::*;
use tracing::debug;

/// Configuration for derivative generation.
#[derive(Debug, Clone)]
pub struct DerivativeConfig {
    pub profiles: Vec<SizeProfile>,
    pub quality: Quality,
    pub effort: Effort,
}

/// An encoded derivative, not yet written anywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivative {
    pub label: String,
    pub bytes: Vec<u8>,
}

/// Encode one derivative per profile.
///
/// Profiles are independent and encoded in parallel; results come back in
/// profile order. Any failure fails the whole build.
pub fn build_derivatives(
    codec: &impl ImageCodec,
    source: &[u8],
    format: ImageKind,
    config: &DerivativeConfig,
) -> Result<Vec<Derivative>, CodecError> {
    config
        .profiles
        .par_iter()
        .map(|profile| {
            let params = EncodeParams::for_profile(profile, format, config.quality, config.effort);
            let bytes = codec.encode(source, &params)?;
            debug!(label = %profile.label, bytes = bytes.len(), "built derivative");
            Ok(Derivative {
                label: profile.label.clone(),
                bytes,
            })
        })
        .collect()
}
