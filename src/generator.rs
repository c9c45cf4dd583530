//! Synthetic reading batches for a sensor.

use rand::Rng;

use crate::allocator::IdAllocator;
use crate::models::{now, Reading, SensorId};

// ---

/// Parameters of a random batch.
///
/// The bounds may be given in either order.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomReadingParams {
    pub sensor_id: SensorId,
    pub count: u32,
    pub min_temperature: f64,
    pub max_temperature: f64,
}

/// Round to one decimal place.
///
/// Magnitudes too large to scale by ten are returned unchanged.
pub fn round_to_tenth(value: f64) -> f64 {
    let scaled = value * 10.0;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / 10.0
}

/// Uniform sample in `[lower, upper]` for any finite, ordered bounds.
fn sample_between<R>(lower: f64, upper: f64, rng: &mut R) -> f64
where
    R: Rng + ?Sized,
{
    let t: f64 = rng.gen();
    let span = upper - lower;
    let value = if span.is_finite() {
        lower + t * span
    } else {
        // The span overflows when the bounds are huge and of opposite sign.
        lower * (1.0 - t) + upper * t
    };
    value.clamp(lower, upper)
}

/// Produce `count` readings uniformly distributed between the bounds,
/// rounded to one decimal and stamped with the generation time.
///
/// Returns an empty batch, without consuming ids, when `count` is zero or a
/// bound is not finite.
pub fn generate_random_readings<R>(
    params: &RandomReadingParams,
    ids: &mut IdAllocator,
    rng: &mut R,
) -> Vec<Reading>
where
    R: Rng + ?Sized,
{
    // ---
    let (a, b) = (params.min_temperature, params.max_temperature);
    if params.count == 0 || !a.is_finite() || !b.is_finite() {
        return Vec::new();
    }

    let (lower, upper) = (a.min(b), a.max(b));
    let created_at = now();

    (0..params.count)
        .map(|_| Reading {
            id: ids.next(),
            sensor_id: params.sensor_id,
            temperature: round_to_tenth(sample_between(lower, upper, rng)),
            created_at,
        })
        .collect()
}
