//! Documented ranges of the numeric Midjourney parameters.

use super::model::Parameters;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limit {
    pub min: f64,
    pub max: f64,
}

impl Limit {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

pub mod limits {
    use super::Limit;

    pub const CHAOS: Limit = Limit { min: 0.0, max: 100.0 };
    pub const WEIRD: Limit = Limit { min: 0.0, max: 3000.0 };
    pub const STOP: Limit = Limit { min: 10.0, max: 100.0 };
    pub const QUALITY: Limit = Limit { min: 0.25, max: 2.0 };
    pub const STYLIZE: Limit = Limit { min: 0.0, max: 1000.0 };
}

fn clamp_whole(value: Option<u32>, limit: Limit) -> Option<u32> {
    value.map(|v| limit.clamp(f64::from(v)).round() as u32)
}

/// Clamp every numeric parameter into its documented range.
///
/// Only the validation step calls this; nowhere else coerces values.
pub fn clamp(mut params: Parameters) -> Parameters {
    params.chaos = clamp_whole(params.chaos, limits::CHAOS);
    params.weird = clamp_whole(params.weird, limits::WEIRD);
    params.stop = clamp_whole(params.stop, limits::STOP);
    params.stylize = clamp_whole(params.stylize, limits::STYLIZE);
    params.quality = params
        .quality
        .filter(|q| q.is_finite())
        .map(|q| limits::QUALITY.clamp(q));
    params
}

/// Convert a raw JSON number into a whole parameter value, clamped to `limit`.
pub(crate) fn whole_from_f64(value: f64, limit: Limit) -> Option<u32> {
    value
        .is_finite()
        .then(|| limit.clamp(value).round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_out_of_range_values() {
        let params = clamp(Parameters {
            sref: "1".to_string(),
            chaos: Some(250),
            weird: Some(5000),
            stop: Some(2),
            quality: Some(9.5),
            stylize: Some(1001),
            ..Default::default()
        });

        assert_eq!(params.chaos, Some(100));
        assert_eq!(params.weird, Some(3000));
        assert_eq!(params.stop, Some(10));
        assert_eq!(params.quality, Some(2.0));
        assert_eq!(params.stylize, Some(1000));
    }

    #[test]
    fn leaves_in_range_and_absent_values_alone() {
        let params = clamp(Parameters {
            sref: "1".to_string(),
            chaos: Some(42),
            quality: Some(0.5),
            ..Default::default()
        });

        assert_eq!(params.chaos, Some(42));
        assert_eq!(params.quality, Some(0.5));
        assert_eq!(params.weird, None);
        assert_eq!(params.stop, None);
    }

    #[test]
    fn drops_non_finite_quality() {
        let params = clamp(Parameters {
            quality: Some(f64::NAN),
            ..Default::default()
        });
        assert_eq!(params.quality, None);
    }

    #[test]
    fn whole_values_round_and_clamp() {
        assert_eq!(whole_from_f64(-4.0, limits::CHAOS), Some(0));
        assert_eq!(whole_from_f64(33.6, limits::CHAOS), Some(34));
        assert_eq!(whole_from_f64(f64::INFINITY, limits::CHAOS), None);
    }
}
