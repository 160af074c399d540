use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::problem::time_slot::TimeSlots;

/// Electricity price and site demand forecast for one half-hour slot.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub energy_price: f64,
    pub triad: bool,
    pub load_forecast_kw: f64,
}

impl Default for PricePoint {
    // Fallback values for slots the price feed does not cover.
    fn default() -> Self {
        PricePoint {
            energy_price: 0.15,
            triad: false,
            load_forecast_kw: 0.0,
        }
    }
}

/// One sample of the price/forecast feed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PriceSample {
    pub at: Timestamp,
    pub energy_price: f64,
    #[serde(default)]
    pub triad: bool,
    #[serde(default)]
    pub load_forecast_kw: f64,
}

/// Per-slot price curve aligned to a slot grid.
#[derive(Debug, Clone)]
pub struct PriceCurve {
    points: Vec<PricePoint>,
}

impl PriceCurve {
    /// Align feed samples onto the slot grid. Slots without a sample take
    /// the defaults.
    pub fn align(slots: &TimeSlots, samples: &[PriceSample]) -> PriceCurve {
        let mut points = vec![PricePoint::default(); slots.len()];

        for sample in samples {
            if let Some(index) = slots.index_containing(sample.at) {
                points[index] = PricePoint {
                    energy_price: sample.energy_price,
                    triad: sample.triad,
                    load_forecast_kw: sample.load_forecast_kw,
                };
            }
        }

        PriceCurve { points }
    }

    pub fn get(&self, index: usize) -> PricePoint {
        self.points.get(index).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Latest instant covered by the feed, used to cap the planning window.
pub fn feed_horizon(samples: &[PriceSample]) -> Option<Timestamp> {
    samples.iter().map(|sample| sample.at).max()
}
