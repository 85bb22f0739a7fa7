//! Real-time metric ingestion types.
//!
//! The engine does not read sensor hardware; the host feeds it
//! [`MetricUpdate`]s and the session folds them into its state. Heart-rate
//! samples live in their own buffer, persisted under a separate key so the
//! primary session record stays small.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single heart-rate reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSample {
    pub bpm: f32,
    pub at: DateTime<Utc>,
}

/// One update from the external metrics feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricUpdate {
    HeartRate { bpm: f32 },
    /// Incremental active-calorie estimate since the previous update.
    ActiveCalories { kcal: f64 },
}

/// Ordered heart-rate sample buffer for one session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeartRateBuffer {
    samples: Vec<HeartRateSample>,
}

impl HeartRateBuffer {
    pub fn push(&mut self, sample: HeartRateSample) {
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[HeartRateSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&HeartRateSample> {
        self.samples.last()
    }

    pub fn avg_bpm(&self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f32 = self.samples.iter().map(|s| s.bpm).sum();
        Some(sum / self.samples.len() as f32)
    }

    pub fn max_bpm(&self) -> Option<f32> {
        self.samples.iter().map(|s| s.bpm).fold(None, |acc, bpm| {
            Some(acc.map_or(bpm, |m: f32| m.max(bpm)))
        })
    }

    /// Fold in samples collected elsewhere (background collection), keeping
    /// the buffer ordered by timestamp.
    pub fn merge(&mut self, other: HeartRateBuffer) {
        if other.samples.is_empty() {
            return;
        }
        self.samples.extend(other.samples);
        self.samples.sort_by_key(|s| s.at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn aggregates_over_samples() {
        let mut buffer = HeartRateBuffer::default();
        assert!(buffer.avg_bpm().is_none());

        buffer.push(HeartRateSample { bpm: 100.0, at: at(0) });
        buffer.push(HeartRateSample { bpm: 140.0, at: at(10) });
        buffer.push(HeartRateSample { bpm: 120.0, at: at(20) });

        assert_eq!(buffer.avg_bpm(), Some(120.0));
        assert_eq!(buffer.max_bpm(), Some(140.0));
        assert_eq!(buffer.latest().unwrap().bpm, 120.0);
    }

    #[test]
    fn merge_keeps_timestamp_order() {
        let mut main = HeartRateBuffer::default();
        main.push(HeartRateSample { bpm: 100.0, at: at(0) });
        main.push(HeartRateSample { bpm: 110.0, at: at(30) });

        let mut background = HeartRateBuffer::default();
        background.push(HeartRateSample { bpm: 130.0, at: at(10) });
        background.push(HeartRateSample { bpm: 125.0, at: at(20) });

        main.merge(background);

        let times: Vec<_> = main.samples().iter().map(|s| s.at).collect();
        assert_eq!(times, vec![at(0), at(10), at(20), at(30)]);
        assert_eq!(main.len(), 4);
    }
}
