//! Robust z-score over a rolling price window.
//!
//! Uses the window median as the centre and an exponential moving
//! absolute deviation (EMAD) as the dispersion estimate, scaled by
//! 1.4826 so it matches a standard deviation under normality. All math is
//! integer: prices in raw units, dimensionless ratios at
//! [`scale::SIGNAL_SCALE`]. The sorted window is maintained by binary
//! insertion, so the median is O(1) per update.

use std::collections::VecDeque;

use crate::types::scale;

/// `1.4826` at four implied decimals.
pub const MAD_SCALE_FACTOR: i64 = 14_826;

#[derive(Debug, Clone)]
pub struct RobustZScoreConfig {
    pub window_size: usize,
    pub min_samples: usize,
    /// EMA alpha at [`scale::SIGNAL_SCALE`]; 645 is roughly `2/(30+1)`.
    pub ema_alpha: i64,
    /// Floor for the deviation estimate, in raw price units.
    pub min_mad_threshold_raw: i64,
    /// Deviation-history window for the adaptive threshold baseline.
    pub baseline_window: usize,
    pub baseline_min_history: usize,
    /// Threshold scalar bounds at [`scale::SIGNAL_SCALE`].
    pub min_vol_scalar: i64,
    pub max_vol_scalar: i64,
    /// Volatility-ratio band mapped onto the scalar bounds.
    pub vol_ratio_low: i64,
    pub vol_ratio_high: i64,
}

impl Default for RobustZScoreConfig {
    fn default() -> Self {
        RobustZScoreConfig {
            window_size: 30,
            min_samples: 20,
            ema_alpha: 645,
            min_mad_threshold_raw: 1,
            baseline_window: 50,
            baseline_min_history: 10,
            min_vol_scalar: 7_000,
            max_vol_scalar: 13_000,
            vol_ratio_low: 5_000,
            vol_ratio_high: 20_000,
        }
    }
}

#[derive(Debug)]
pub struct RobustZScore {
    config: RobustZScoreConfig,
    window: VecDeque<i64>,
    sorted: Vec<i64>,
    /// EMAD carried at `raw * SIGNAL_SCALE` so coarse price scales keep
    /// sub-unit precision through the integer EMA.
    emad_scaled: i64,
    emad_seeded: bool,
    mad_history: VecDeque<i64>,
}

impl RobustZScore {
    pub fn new(config: RobustZScoreConfig) -> Self {
        let window_size = config.window_size.max(2);
        RobustZScore {
            window: VecDeque::with_capacity(window_size + 1),
            sorted: Vec::with_capacity(window_size + 1),
            emad_scaled: 0,
            emad_seeded: false,
            mad_history: VecDeque::with_capacity(config.baseline_window + 1),
            config,
        }
    }

    /// Fold one observed price (raw units) into the window.
    pub fn on_price(&mut self, price_raw: i64) {
        self.window.push_back(price_raw);
        let pos = self.sorted.partition_point(|&v| v < price_raw);
        self.sorted.insert(pos, price_raw);

        if self.window.len() > self.config.window_size {
            if let Some(evicted) = self.window.pop_front() {
                let pos = self.sorted.partition_point(|&v| v < evicted);
                // The evicted value is present by construction.
                if pos < self.sorted.len() && self.sorted[pos] == evicted {
                    self.sorted.remove(pos);
                }
            }
        }

        let median = self.median();
        let deviation_scaled = (price_raw - median).abs() * scale::SIGNAL_SCALE;
        if self.emad_seeded {
            self.emad_scaled +=
                self.config.ema_alpha * (deviation_scaled - self.emad_scaled) / scale::SIGNAL_SCALE;
        } else {
            self.emad_scaled = deviation_scaled;
            self.emad_seeded = true;
        }
    }

    fn median(&self) -> i64 {
        if self.sorted.is_empty() {
            return 0;
        }
        let mid = self.sorted.len() / 2;
        if self.sorted.len() % 2 == 0 {
            (self.sorted[mid - 1] + self.sorted[mid]) / 2
        } else {
            self.sorted[mid]
        }
    }

    pub fn get_median(&self) -> i64 {
        self.median()
    }

    /// Current EMAD, in raw price units.
    pub fn get_mad(&self) -> i64 {
        self.emad_scaled / scale::SIGNAL_SCALE
    }

    /// EMAD rescaled to match a standard deviation (`mad * 1.4826`).
    pub fn get_robust_std(&self) -> i64 {
        (self.get_mad() * MAD_SCALE_FACTOR) / scale::SIGNAL_SCALE
    }

    /// Z-score of `price_raw` against the window, at
    /// [`scale::SIGNAL_SCALE`]. Returns 0 until `min_samples` prices have
    /// been seen. Also feeds the deviation history used by
    /// [`Self::get_adaptive_threshold`].
    pub fn calculate_zscore(&mut self, price_raw: i64) -> i64 {
        self.mad_history.push_back(self.emad_scaled);
        if self.mad_history.len() > self.config.baseline_window {
            self.mad_history.pop_front();
        }

        if self.window.len() < self.config.min_samples {
            return 0;
        }
        let delta = price_raw - self.median();
        let mad_scaled = self
            .emad_scaled
            .max(self.config.min_mad_threshold_raw * scale::SIGNAL_SCALE);
        let robust_std_scaled = (mad_scaled as i128 * MAD_SCALE_FACTOR as i128
            / scale::SIGNAL_SCALE as i128)
            .max(1);
        let z = delta as i128 * scale::SIGNAL_SCALE as i128 * scale::SIGNAL_SCALE as i128
            / robust_std_scaled;
        z.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    /// Volatility-adaptive entry threshold: scales `base_threshold` by a
    /// clamped ratio of current EMAD to its recent baseline, so quiet
    /// markets act earlier and loud ones demand more stretch.
    pub fn get_adaptive_threshold(&self, base_threshold: i64) -> i64 {
        if self.mad_history.len() < self.config.baseline_min_history {
            return base_threshold;
        }
        let sum: i128 = self.mad_history.iter().map(|&m| m as i128).sum();
        let baseline = (sum / self.mad_history.len() as i128).max(1);
        let ratio_wide = self.emad_scaled as i128 * scale::SIGNAL_SCALE as i128 / baseline;
        let ratio = ratio_wide.clamp(0, i64::MAX as i128) as i64;

        let cfg = &self.config;
        let scalar = if ratio <= cfg.vol_ratio_low {
            cfg.min_vol_scalar
        } else if ratio >= cfg.vol_ratio_high {
            cfg.max_vol_scalar
        } else {
            // Linear blend across the band.
            let span = cfg.vol_ratio_high - cfg.vol_ratio_low;
            let scalar_span = cfg.max_vol_scalar - cfg.min_vol_scalar;
            cfg.min_vol_scalar + (ratio - cfg.vol_ratio_low) * scalar_span / span
        };
        base_threshold * scalar / scale::SIGNAL_SCALE
    }

    pub fn samples(&self) -> usize {
        self.window.len()
    }
}
