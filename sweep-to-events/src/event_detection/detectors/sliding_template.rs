//! Template matching by optimal scaling against a sliding window.
//!
//! At each start position the template is fitted to the window by least
//! squares (scale and offset), giving the detection statistic
//! `scale / standard error`. Runs of the statistic above a threshold are
//! events, timed at the statistic's maximum within the run.
use super::{at_or_above, threshold_regions};
use crate::{
    DetectionError, DetectionResult,
    event_detection::{
        Real,
        datatype::{DetectedEvent, EventTrain, Feature, FeatureSet, Waveform},
        first_argmax, first_argmin,
        template::{FitResult, Template, TemplateScaler, TemplateSource},
    },
    metrics,
    parameters::DetectionThreshold,
};
use ephys_common::{SampleIndex, SampleSeries, Unit, metrics::detector_kind::DetectorKind};
use tracing::debug;

const KIND: DetectorKind = DetectorKind::SlidingTemplate;

#[derive(Debug, Clone)]
pub struct SlidingTemplateDetector {
    source: TemplateSource,
    threshold: DetectionThreshold,
    pad_tail: bool,
}

/// The resolved template and its scaler, for one sweep.
struct Scan {
    template: Template,
    scaler: TemplateScaler,
    /// The sweep values, extended by its final samples if padding is enabled.
    data: Vec<Real>,
}

impl Scan {
    fn fit_at(&self, start: SampleIndex) -> Option<FitResult> {
        let window = self.data.get(start..start + self.template.len())?;
        self.scaler.fit(window).ok()
    }

    fn statistic(&self) -> Vec<Real> {
        (0..=self.data.len() - self.template.len())
            .map(|start| {
                self.fit_at(start)
                    .map(|fit| fit.detection_statistic)
                    .unwrap_or(Real::NAN)
            })
            .collect()
    }
}

impl SlidingTemplateDetector {
    pub fn new(source: TemplateSource, threshold: DetectionThreshold, pad_tail: bool) -> Self {
        Self {
            source,
            threshold,
            pad_tail,
        }
    }

    fn scan(&self, series: &SampleSeries) -> DetectionResult<Scan> {
        let template = self.source.resolve(series.dt())?;
        if template.len() > series.len() {
            return Err(DetectionError::TemplateLongerThanSeries {
                template: template.len(),
                series: series.len(),
            });
        }
        let scaler = TemplateScaler::new(template.values())?;
        let mut data = series.values().to_vec();
        if self.pad_tail {
            let tail_start = series.len() + 1 - template.len();
            data.extend_from_slice(&series.values()[tail_start..]);
        }
        Ok(Scan {
            template,
            scaler,
            data,
        })
    }

    /// The detection statistic at every window start, `len - N + 1` values,
    /// or `len` values with tail padding. Degenerate windows give `NaN`.
    pub fn detection_statistic(&self, series: &SampleSeries) -> DetectionResult<SampleSeries> {
        let scan = self.scan(series)?;
        Ok(series.derive_with_unit(scan.statistic(), series.t0(), Unit::default())?)
    }

    fn threshold_for(&self, statistic: &[Real]) -> Real {
        match self.threshold {
            DetectionThreshold::Absolute(threshold) => threshold,
            DetectionThreshold::RmsMultiple(multiple) => {
                let (sum_squares, count) = statistic
                    .iter()
                    .filter(|theta| theta.is_finite())
                    .fold((0.0, 0usize), |(sum, count), theta| {
                        (sum + theta * theta, count + 1)
                    });
                if count == 0 {
                    Real::NAN
                } else {
                    multiple * (sum_squares / count as Real).sqrt()
                }
            }
        }
    }

    /// Detects events in `series`, copying each waveform from `extraction`
    /// if given, which must share the time base of `series`.
    #[tracing::instrument(skip_all, fields(len = series.len(), threshold, num_candidates, num_events))]
    pub fn detect(
        &self,
        series: &SampleSeries,
        extraction: Option<&SampleSeries>,
    ) -> DetectionResult<EventTrain> {
        let extraction = match extraction {
            Some(raw) if !raw.is_aligned_with(series) => return Err(DetectionError::MisalignedSeries),
            Some(raw) => raw,
            None => series,
        };
        let scan = self.scan(series)?;
        let statistic = scan.statistic();
        let threshold = self.threshold_for(&statistic);
        tracing::Span::current().record("threshold", threshold);

        let regions = threshold_regions(&statistic, at_or_above(threshold));
        tracing::Span::current().record("num_candidates", regions.len());
        metrics::record_candidates(KIND, regions.len());

        let value_unit = series.value_unit();
        let n = scan.template.len();
        let mut train = EventTrain::empty();
        for region in regions {
            let indices = region.indices(statistic.len());
            let Some((peak, _)) = statistic
                .get(indices.clone())
                .and_then(first_argmax)
                .map(|(i, theta)| (indices.start + i, theta))
            else {
                continue;
            };
            let Ok(waveform) = extraction.slice(peak, peak + n) else {
                debug!("Window at {} exceeds the series", series.time_at(peak));
                metrics::record_dropped_window(KIND);
                continue;
            };
            let Some(fit) = scan.fit_at(peak) else {
                continue;
            };

            let peak_time = series.time_at(peak);
            let (rise_slope, decay_slope) = phase_slopes(&waveform, fit.scale);
            let event = DetectedEvent::new(series.time_at(region.start), peak_time)
                .with_end_time(Some(peak_time + scan.template.duration()))
                .with_slopes(rise_slope, decay_slope);

            let mut features = FeatureSet::default();
            features.insert(Feature::Scale, Some(fit.scale), value_unit);
            features.insert(Feature::Offset, Some(fit.offset), value_unit);
            features.insert(Feature::StandardError, Some(fit.stderr), value_unit);
            features.insert(
                Feature::DetectionStatistic,
                fit.statistic(),
                &Unit::default(),
            );
            train.push(event, Waveform::new(waveform, 0), features);
        }
        tracing::Span::current().record("num_events", train.len());
        metrics::record_events(KIND, train.len());
        Ok(train)
    }
}

/// Steepest slopes either side of the waveform's extremum, the maximum for
/// positive `scale` and the minimum otherwise.
fn phase_slopes(waveform: &SampleSeries, scale: Real) -> (Option<Real>, Option<Real>) {
    let values = waveform.values();
    let dt = waveform.dt();
    let differences: Vec<Real> = values.windows(2).map(|w| (w[1] - w[0]) / dt).collect();
    let positive = scale >= 0.0;
    let extremum = if positive {
        first_argmax(values)
    } else {
        first_argmin(values)
    };
    let Some((extremum, _)) = extremum else {
        return (None, None);
    };
    let (rising, falling) = differences.split_at(extremum.min(differences.len()));
    let steepest = |slopes: &[Real], towards_extremum: bool| {
        let extreme = if towards_extremum == positive {
            first_argmax(slopes)
        } else {
            first_argmin(slopes)
        };
        extreme.map(|(_, slope)| slope)
    };
    (steepest(rising, true), steepest(falling, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_detection::template::TemplateShape;
    use assert_approx_eq::assert_approx_eq;
    use rand::{SeedableRng, rngs::StdRng};
    use rand_distr::{Distribution, Normal};

    const SHAPE: TemplateShape = TemplateShape::Biexponential {
        rise: 0.5,
        decay: 2.0,
    };

    fn series(values: Vec<Real>) -> SampleSeries {
        SampleSeries::new(values, 0.1, 0.0, Unit::new("pA"), Unit::new("ms")).unwrap()
    }

    fn template() -> Template {
        Template::from_shape(&SHAPE, 5.0, 0.1).unwrap()
    }

    fn detector(threshold: DetectionThreshold) -> SlidingTemplateDetector {
        SlidingTemplateDetector::new(
            TemplateSource::Shape {
                shape: SHAPE,
                duration: 5.0,
            },
            threshold,
            false,
        )
    }

    /// Noise, with `scale * template` added at each offset.
    fn noisy_copies(len: usize, offsets: &[usize], scale: Real, seed: u64) -> Vec<Real> {
        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, 0.1).unwrap();
        let mut values: Vec<Real> = (0..len).map(|_| noise.sample(&mut rng)).collect();
        let template = template();
        for &offset in offsets {
            values[offset..offset + template.len()]
                .iter_mut()
                .zip(template.values())
                .for_each(|(v, h)| *v += scale * h);
        }
        values
    }

    #[test]
    fn statistic_length() {
        let s = series(noisy_copies(300, &[], 0.0, 1));
        let statistic = detector(Default::default()).detection_statistic(&s).unwrap();
        assert_eq!(statistic.len(), 300 - 50 + 1);
        assert_eq!(statistic.t0(), s.t0());

        let padded = SlidingTemplateDetector::new(
            TemplateSource::Shape {
                shape: SHAPE,
                duration: 5.0,
            },
            Default::default(),
            true,
        );
        assert_eq!(padded.detection_statistic(&s).unwrap().len(), 300);
    }

    #[test]
    fn finds_each_copy() {
        let offsets = [100, 300, 520, 800];
        let s = series(noisy_copies(1000, &offsets, 5.0, 2));
        let train = detector(Default::default()).detect(&s, None).unwrap();
        assert_eq!(train.len(), offsets.len());
        for (event, offset) in train.events().iter().zip(offsets) {
            let peak = s.index_at(event.peak_time()).unwrap();
            assert!(peak.abs_diff(offset) <= 1, "{peak} != {offset}");
            assert!(event.onset_time() <= event.peak_time());
            assert_approx_eq!(event.end_time().unwrap() - event.peak_time(), 5.0);
        }
        for features in train.features() {
            assert_approx_eq!(features.value(Feature::Scale).unwrap(), 5.0, 0.5);
            assert!(features.value(Feature::DetectionStatistic).unwrap() > 10.0);
        }
        assert!(train.waveforms().iter().all(|w| w.series().len() == 50));
    }

    #[test]
    fn extraction_series_supplies_waveforms() {
        let offsets = [200];
        let s = series(noisy_copies(500, &offsets, 5.0, 3));
        let raw = series(s.values().iter().map(|v| v + 100.0).collect());
        let train = detector(Default::default()).detect(&s, Some(&raw)).unwrap();
        assert_eq!(train.len(), 1);
        let waveform = train.waveforms()[0].series();
        let peak = s.index_at(train.events()[0].peak_time()).unwrap();
        assert_eq!(waveform.values()[0], raw.values()[peak]);

        let shifted = raw.derive(raw.values().to_vec(), 1.0).unwrap();
        assert_eq!(
            detector(Default::default()).detect(&s, Some(&shifted)),
            Err(DetectionError::MisalignedSeries)
        );
    }

    #[test]
    fn absolute_threshold() {
        let s = series(noisy_copies(400, &[150], 5.0, 4));
        let train = detector(DetectionThreshold::Absolute(10.0))
            .detect(&s, None)
            .unwrap();
        assert_eq!(train.len(), 1);
        let event = train.events()[0];
        assert!(event.rise_slope().unwrap() > 0.0);
        assert!(event.decay_slope().unwrap() < 0.0);
    }

    #[test]
    fn slopes_follow_the_sign_of_the_scale() {
        let waveform = series(vec![0.0, -2.0, -6.0, -4.0, -3.0]);
        let (rise, decay) = phase_slopes(&waveform, -1.0);
        assert_approx_eq!(rise.unwrap(), -40.0);
        assert_approx_eq!(decay.unwrap(), 20.0);

        let waveform = series(vec![0.0, 2.0, 6.0, 4.0, 3.0]);
        let (rise, decay) = phase_slopes(&waveform, 1.0);
        assert_approx_eq!(rise.unwrap(), 40.0);
        assert_approx_eq!(decay.unwrap(), -20.0);

        let (rise, _) = phase_slopes(&series(vec![6.0, 4.0, 3.0]), 1.0);
        assert_eq!(rise, None);
    }

    #[test]
    fn template_longer_than_series() {
        let s = series(vec![0.0; 20]);
        assert_eq!(
            detector(Default::default()).detect(&s, None),
            Err(DetectionError::TemplateLongerThanSeries {
                template: 50,
                series: 20
            })
        );
    }

    #[test]
    fn pure_noise_below_absolute_threshold() {
        let s = series(noisy_copies(500, &[], 0.0, 5));
        let train = detector(DetectionThreshold::Absolute(50.0)).detect(&s, None).unwrap();
        assert!(train.is_empty());
        assert_eq!(train.waveforms().len(), train.features().len());
    }

    #[test]
    fn rms_threshold() {
        let detector = detector(DetectionThreshold::RmsMultiple(2.0));
        assert_approx_eq!(detector.threshold_for(&[3.0, -3.0, Real::NAN, 3.0]), 6.0);
        assert!(detector.threshold_for(&[Real::NAN]).is_nan());
    }
}
