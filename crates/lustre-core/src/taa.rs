//! Temporal accumulation: render-target roles, jitter and the history blend
//!
//! Two equally sized targets alternate roles every frame. The one written
//! this frame samples the other as history. Roles are a single bit, so
//! neither target is ever rebound; the GPU stage keeps one bind group per
//! role and selects it by index.

use glam::{Vec2, Vec4};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::math::mix4;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaaConfig {
    /// Weight of the new frame in the blend
    pub blend: f32,
    /// Jitter sequence seed
    pub seed: u64,
}

impl Default for TaaConfig {
    fn default() -> Self {
        Self {
            blend: 0.2,
            seed: 0x6c75_7374,
        }
    }
}

/// A pair of buffers with alternating write/history roles
#[derive(Debug)]
pub struct RenderTargetPair<T> {
    targets: [T; 2],
    /// Index written this frame
    current: usize,
    flips: u64,
}

impl<T> RenderTargetPair<T> {
    pub fn new(a: T, b: T) -> Self {
        Self {
            targets: [a, b],
            current: 0,
            flips: 0,
        }
    }

    /// Build both targets with the same constructor
    pub fn with(mut make: impl FnMut() -> T) -> Self {
        let a = make();
        let b = make();
        Self::new(a, b)
    }

    pub fn write_index(&self) -> usize {
        self.current
    }

    pub fn history_index(&self) -> usize {
        1 - self.current
    }

    pub fn write(&self) -> &T {
        &self.targets[self.current]
    }

    pub fn write_mut(&mut self) -> &mut T {
        &mut self.targets[self.current]
    }

    pub fn history(&self) -> &T {
        &self.targets[1 - self.current]
    }

    /// Both targets, write first
    pub fn split_mut(&mut self) -> (&mut T, &T) {
        let (first, second) = self.targets.split_at_mut(1);
        if self.current == 0 {
            (&mut first[0], &second[0])
        } else {
            (&mut second[0], &first[0])
        }
    }

    pub fn get(&self, index: usize) -> &T {
        &self.targets[index]
    }

    /// Swap roles for the next frame
    pub fn flip(&mut self) {
        self.current = 1 - self.current;
        self.flips += 1;
    }

    /// Number of completed frames since creation or the last reallocation
    pub fn flips(&self) -> u64 {
        self.flips
    }

    /// Replace both targets in one step (on resize). The accumulated
    /// history is meaningless at the new size, so the role counter starts
    /// over.
    pub fn reallocate(&mut self, mut make: impl FnMut(usize) -> T) {
        self.targets = [make(0), make(1)];
        self.current = 0;
        self.flips = 0;
    }
}

/// Sub-pixel jitter source
#[derive(Debug, Clone)]
pub struct Jitter {
    rng: ChaCha8Rng,
}

impl Jitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Offset in uv units, uniform in `[-0.5, 0.5] / dimension` per axis.
    /// A zero dimension yields no offset on that axis.
    pub fn next(&mut self, width: u32, height: u32) -> Vec2 {
        let jx = self.rng.random::<f32>() - 0.5;
        let jy = self.rng.random::<f32>() - 0.5;
        Vec2::new(per_axis(jx, width), per_axis(jy, height))
    }
}

fn per_axis(offset: f32, dimension: u32) -> f32 {
    if dimension == 0 {
        0.0
    } else {
        offset / dimension as f32
    }
}

/// Exponential history blend: `mix(history, current, weight)`
pub fn blend(history: Vec4, current: Vec4, weight: f32) -> Vec4 {
    mix4(history, current, weight)
}
