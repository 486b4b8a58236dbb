use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tmonbus_frame::{NUM_CHANNELS, TEMP_INVALID};

use crate::error::{NodeError, Result};

/// Provides the node's current channel readings.
///
/// Values are tenths of a degree Celsius, or [`TEMP_INVALID`] for a channel
/// with no usable sensor. Implementations must return promptly; the
/// dispatcher calls this once per POLL and neither retries nor caches.
pub trait ReadingSource {
    fn read_channels(&self) -> [i16; NUM_CHANNELS];
}

impl<S: ReadingSource + ?Sized> ReadingSource for &S {
    fn read_channels(&self) -> [i16; NUM_CHANNELS] {
        (**self).read_channels()
    }
}

impl<S: ReadingSource + ?Sized> ReadingSource for Arc<S> {
    fn read_channels(&self) -> [i16; NUM_CHANNELS] {
        (**self).read_channels()
    }
}

impl<S: ReadingSource + ?Sized> ReadingSource for Box<S> {
    fn read_channels(&self) -> [i16; NUM_CHANNELS] {
        (**self).read_channels()
    }
}

/// Adapts a closure into a [`ReadingSource`].
pub struct FnSource<F>(pub F);

/// Wrap `f` as a reading source.
pub fn from_fn<F>(f: F) -> FnSource<F>
where
    F: Fn() -> [i16; NUM_CHANNELS],
{
    FnSource(f)
}

impl<F> ReadingSource for FnSource<F>
where
    F: Fn() -> [i16; NUM_CHANNELS],
{
    fn read_channels(&self) -> [i16; NUM_CHANNELS] {
        (self.0)()
    }
}

impl<F> std::fmt::Debug for FnSource<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnSource")
    }
}

/// Always reports the same values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedReadings(pub [i16; NUM_CHANNELS]);

impl FixedReadings {
    /// Every channel unconnected.
    pub fn unconnected() -> Self {
        Self([TEMP_INVALID; NUM_CHANNELS])
    }
}

impl ReadingSource for FixedReadings {
    fn read_channels(&self) -> [i16; NUM_CHANNELS] {
        self.0
    }
}

/// Synthetic readings for bench testing without hardware.
///
/// Each channel reads between 5.0 and 90.0 C and is independently marked
/// invalid with probability `invalid_rate`.
#[derive(Debug)]
pub struct SimulatedSource {
    rng: Mutex<StdRng>,
    invalid_rate: f64,
}

impl SimulatedSource {
    /// Lowest simulated value (5.0 C).
    pub const MIN_TENTHS: i16 = 50;
    /// Highest simulated value (90.0 C).
    pub const MAX_TENTHS: i16 = 900;
    /// Default chance of a channel reading invalid.
    pub const DEFAULT_INVALID_RATE: f64 = 0.1;

    /// Seeded source; the same seed replays the same readings.
    pub fn seeded(seed: u64, invalid_rate: f64) -> Result<Self> {
        Self::with_rng(StdRng::seed_from_u64(seed), invalid_rate)
    }

    /// Source seeded from OS entropy.
    pub fn from_entropy(invalid_rate: f64) -> Result<Self> {
        Self::with_rng(StdRng::from_entropy(), invalid_rate)
    }

    fn with_rng(rng: StdRng, invalid_rate: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&invalid_rate) {
            return Err(NodeError::InvalidConfig(format!(
                "invalid rate must be within 0.0-1.0, got {invalid_rate}"
            )));
        }
        Ok(Self {
            rng: Mutex::new(rng),
            invalid_rate,
        })
    }

    /// Chance of a channel reading invalid.
    pub fn invalid_rate(&self) -> f64 {
        self.invalid_rate
    }
}

impl ReadingSource for SimulatedSource {
    fn read_channels(&self) -> [i16; NUM_CHANNELS] {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        std::array::from_fn(|_| {
            if rng.gen_bool(self.invalid_rate) {
                TEMP_INVALID
            } else {
                rng.gen_range(Self::MIN_TENTHS..=Self::MAX_TENTHS)
            }
        })
    }
}
