// Pitch shifting by playback rate. The PCM bytes are never resampled or
// otherwise touched: streaming the same buffer faster raises the pitch, the
// same way a physically compressed waveform would sound.

use super::sample_bank::Sample;
use crate::shared::MAX_FRET;

/// Fret outside 0..=21. The grid filters these before the sequencer sees
/// them; a custom `FretGrid` that leaks one gets a silent cell.
#[derive(Debug, thiserror::Error)]
#[error("fret {0} is out of range (0-21)")]
pub struct InvalidFret(pub u8);

/// Equal-tempered frequency ratio for a semitone offset.
pub fn semitone_factor(semitones: u8) -> f64 {
    2f64.powf(f64::from(semitones) / 12.0)
}

/// Playback rate that transposes `native_rate` up by `fret` semitones.
pub fn shifted_rate(native_rate: u32, fret: u8) -> Result<u32, InvalidFret> {
    if fret > MAX_FRET {
        return Err(InvalidFret(fret));
    }
    if fret == 0 {
        // the open string plays back at exactly the recorded rate
        return Ok(native_rate);
    }
    Ok((f64::from(native_rate) * semitone_factor(fret)).round() as u32)
}

/// Buffer and rate for one note: the sample's raw bytes, unmodified, and the
/// rate to stream them at. The copy is what lets the voice own its buffer
/// outright.
pub fn shift(sample: &Sample, fret: u8) -> Result<(Vec<u8>, u32), InvalidFret> {
    let rate = shifted_rate(sample.sample_rate(), fret)?;
    Ok((sample.data().to_vec(), rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn open_string_is_exactly_native() {
        for rate in [8_000, 22_050, 44_100, 48_000] {
            assert_eq!(shifted_rate(rate, 0).unwrap(), rate);
        }
    }

    #[test]
    fn twelfth_fret_doubles_the_rate() {
        assert_eq!(shifted_rate(44_100, 12).unwrap(), 88_200);
        assert_eq!(shifted_rate(8_000, 12).unwrap(), 16_000);
    }

    #[test]
    fn whole_fret_range_follows_equal_temperament() {
        for fret in 0..=MAX_FRET {
            let expected = (44_100.0 * 2f64.powf(f64::from(fret) / 12.0)).round() as u32;
            assert_eq!(shifted_rate(44_100, fret).unwrap(), expected, "fret {fret}");
        }
    }

    #[test]
    fn rates_strictly_rise_per_fret() {
        let mut prev = 0;
        for fret in 0..=MAX_FRET {
            let rate = shifted_rate(44_100, fret).unwrap();
            assert!(rate > prev, "fret {fret} rate {rate} <= {prev}");
            prev = rate;
        }
    }

    #[test]
    fn known_intervals() {
        assert_relative_eq!(semitone_factor(12), 2.0, epsilon = 1e-12);
        // perfect fifth, 7 semitones
        assert_relative_eq!(semitone_factor(7), 1.4983070768766815, epsilon = 1e-12);
    }

    #[test]
    fn out_of_range_fret_rejected() {
        assert!(shifted_rate(44_100, 22).is_err());
        assert!(shifted_rate(44_100, u8::MAX).is_err());
    }

    #[test]
    fn shift_hands_back_untouched_bytes() {
        let sample = Sample::new(vec![1, 2, 3, 4, 5, 6], 8_000);
        let (data, rate) = shift(&sample, 5).unwrap();
        assert_eq!(data, sample.data());
        assert_eq!(rate, shifted_rate(8_000, 5).unwrap());
    }
}
