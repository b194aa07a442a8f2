//! Procedural terrain inputs: noise sampling, the height curve and the level falloff

pub mod curve;
pub use curve::HeightCurve;

pub mod falloff;
pub use falloff::{FalloffField, FalloffKey, FalloffParams, FalloffSnapshot};

pub mod noise;
pub use noise::{FbmNoiseSampler, NoiseSampler, NoiseSettings};
