//! Random ±1 source encoding.
//!
//! One outer iteration collapses all `ns` shots into a single super-shot:
//! each shot gets a random sign, the shared wavelet is signed per source,
//! and the observed gathers are summed with the same signs. Linearity of
//! the wave operator in its source term makes the encoded residual an
//! unbiased estimate of the full multi-shot residual.
//!
//! Signs come from a seeded ChaCha8 RNG so runs are reproducible.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use tremor_core::Gather;

/// Draws one ±1 encoding vector per outer iteration.
#[derive(Debug)]
pub struct SourceEncoder {
    rng: ChaCha8Rng,
}

impl SourceEncoder {
    /// Seeded encoder; identical seeds produce identical sign sequences.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Draw a fresh encoding for `ns` shots.
    pub fn draw(&mut self, ns: usize) -> EncodingVector {
        let signs = (0..ns)
            .map(|_| if self.rng.random::<bool>() { 1 } else { -1 })
            .collect();
        EncodingVector { signs }
    }
}

/// A fixed ±1 sign per shot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodingVector {
    signs: Vec<i8>,
}

impl EncodingVector {
    /// Build from explicit signs. Values other than ±1 are normalized to
    /// their sign; zero becomes +1.
    pub fn from_signs(signs: Vec<i8>) -> Self {
        Self {
            signs: signs
                .into_iter()
                .map(|s| if s < 0 { -1 } else { 1 })
                .collect(),
        }
    }

    /// The per-shot signs.
    pub fn signs(&self) -> &[i8] {
        &self.signs
    }

    /// Number of shots encoded.
    pub fn len(&self) -> usize {
        self.signs.len()
    }

    /// True for an empty encoding.
    pub fn is_empty(&self) -> bool {
        self.signs.is_empty()
    }

    /// Super-shot source samples of shape `(nt, ns)`:
    /// `encsrc[it*ns + is] = sign[is] * wavelet[it]`.
    pub fn encode_sources(&self, wavelet: &[f32]) -> Vec<f32> {
        let ns = self.signs.len();
        let mut out = vec![0.0; wavelet.len() * ns];
        for (it, &w) in wavelet.iter().enumerate() {
            for (is, &sign) in self.signs.iter().enumerate() {
                out[it * ns + is] = f32::from(sign) * w;
            }
        }
        out
    }

    /// Super-shot observed data of shape `(nt, ng)`:
    /// `encobs[it*ng + ig] = sum_is sign[is] * dobs[is][it][ig]`.
    pub fn encode_data(&self, dobs: &Gather) -> Vec<f32> {
        let (nt, ng) = (dobs.nt(), dobs.ng());
        let mut out = vec![0.0; nt * ng];
        for (is, &sign) in self.signs.iter().enumerate() {
            let sign = f32::from(sign);
            for it in 0..nt {
                let row = dobs.slice(is, it);
                let acc = &mut out[it * ng..(it + 1) * ng];
                for (a, &v) in acc.iter_mut().zip(row) {
                    *a += sign * v;
                }
            }
        }
        out
    }
}
