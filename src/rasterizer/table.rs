//! Trigonometric lookup table
//!
//! The transform builders run every frame; instead of calling into libm each
//! time, they read precomputed samples. Entry i holds sin(i/100), cos(i/100)
//! and cot(i/100), so one index step is 1/100 radian. The table spans two
//! full turns, which gives the view-direction math headroom for angle sums
//! outside [0, 2pi) before wrapping.
//!
//! Built once before the render loop and shared by reference; never mutated
//! afterwards.

/// Table indices per radian.
pub const STEPS_PER_RADIAN: f64 = 100.0;

/// Number of samples: two full turns at 1/100 radian per index.
pub const TABLE_SIZE: usize = 1257;

/// One precomputed sample.
#[derive(Debug, Clone, Copy)]
pub struct TrigSample {
    pub sin: f64,
    pub cos: f64,
    /// 1/tan; +infinity at index 0, which is a defined value, not an error.
    pub cot: f64,
}

/// Immutable sin/cos/cot samples indexed by angle step.
pub struct TrigTable {
    entries: Vec<TrigSample>,
}

impl TrigTable {
    pub fn new() -> Self {
        let entries = (0..TABLE_SIZE)
            .map(|i| {
                let angle = i as f64 / STEPS_PER_RADIAN;
                TrigSample {
                    sin: angle.sin(),
                    cos: angle.cos(),
                    cot: 1.0 / angle.tan(),
                }
            })
            .collect();
        Self { entries }
    }

    /// Wrap a signed index into [0, TABLE_SIZE). Negative indices and
    /// indices past the end are defined via modular wraparound.
    pub fn wrap(index: i32) -> usize {
        index.rem_euclid(TABLE_SIZE as i32) as usize
    }

    /// Nearest table index for an angle in radians.
    pub fn index_for(radians: f64) -> i32 {
        (radians * STEPS_PER_RADIAN).round() as i32
    }

    pub fn sample(&self, index: i32) -> TrigSample {
        self.entries[Self::wrap(index)]
    }

    pub fn sin(&self, index: i32) -> f64 {
        self.sample(index).sin
    }

    pub fn cos(&self, index: i32) -> f64 {
        self.sample(index).cos
    }

    pub fn cot(&self, index: i32) -> f64 {
        self.sample(index).cot
    }
}

impl Default for TrigTable {
    fn default() -> Self {
        Self::new()
    }
}
