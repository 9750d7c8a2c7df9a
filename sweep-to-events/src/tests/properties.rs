use super::synthetic::SweepBuilder;
use crate::{
    event_detection::{
        Real,
        analysis::FeatureAnalyzer,
        datatype::{Feature, Waveform},
        detectors::{ActionPotentialDetector, SlidingTemplateDetector},
        template::{Template, TemplateScaler, TemplateShape, TemplateSource},
    },
    parameters::{
        ActionPotentialParameters, ActionPotentialSettings, DetectionThreshold,
        ExtractionParameters, FeatureParameters,
    },
    processing::{Detection, find_action_potentials, process_sweeps},
    sweeps::SweepRecord,
};
use assert_approx_eq::assert_approx_eq;
use ephys_common::Unit;
use rand::{Rng, SeedableRng, rngs::StdRng};

fn no_fast_rise_limit() -> ActionPotentialParameters {
    ActionPotentialParameters {
        min_fast_rise_duration: Some(0.0),
        ..Default::default()
    }
}

#[test]
fn constant_series_have_no_events() {
    for (value, dt) in [(-65.0, 0.1), (0.0, 0.02), (40.0, 1.0)] {
        let series = SweepBuilder::new(500, value, dt).build();
        let train = find_action_potentials(&series, &Default::default()).unwrap();
        assert!(train.is_empty());
        assert!(train.waveforms().is_empty() && train.features().is_empty());
    }
}

#[test]
fn single_step_gives_one_onset() {
    let detector = ActionPotentialDetector::new(no_fast_rise_limit()).unwrap();
    for k in [1, 17, 100, 198] {
        let series = SweepBuilder::new(200, 0.0, 0.1).step(k, 5.0).build();
        let events = detector.detect(&series).unwrap();
        assert_eq!(events.len(), 1, "step at {k}");
        assert!(events[0].onset_index.abs_diff(k) <= 1);
    }
}

#[test]
fn scaler_recovers_linear_transforms() {
    let mut rng = StdRng::seed_from_u64(21);
    for _ in 0..20 {
        let template: Vec<Real> = (0..30).map(|_| rng.random::<Real>()).collect();
        let scaler = TemplateScaler::new(&template).unwrap();
        let k = rng.random_range(-10.0..10.0);
        let c = rng.random_range(-100.0..100.0);
        let window: Vec<Real> = template.iter().map(|h| k * h + c).collect();
        let fit = scaler.fit(&window).unwrap();
        assert_approx_eq!(fit.scale, k, 1e-8);
        assert_approx_eq!(fit.offset, c, 1e-8);
        assert_approx_eq!(fit.sse, 0.0, 1e-9);
    }
}

#[test]
fn sliding_detector_finds_every_copy() {
    let shape = TemplateShape::Biexponential {
        rise: 0.5,
        decay: 2.0,
    };
    let template = Template::from_shape(&shape, 5.0, 0.1).unwrap();
    let detector = SlidingTemplateDetector::new(
        TemplateSource::Shape {
            shape,
            duration: 5.0,
        },
        DetectionThreshold::default(),
        false,
    );
    for copies in 1..=5 {
        let offsets: Vec<usize> = (0..copies).map(|i| 100 + 200 * i).collect();
        let series = SweepBuilder::new(1100, 0.0, 0.1)
            .noise(0.1, copies as u64)
            .copies(template.values(), &offsets, 5.0)
            .build();
        let train = detector.detect(&series, None).unwrap();
        assert_eq!(train.len(), copies);
        for (event, offset) in train.events().iter().zip(&offsets) {
            let peak = series.index_at(event.peak_time()).unwrap();
            assert!(peak.abs_diff(*offset) <= 1, "{peak} != {offset}");
        }
    }
}

#[test]
fn flat_stretches_give_no_template_events() {
    let shape = TemplateShape::Biexponential {
        rise: 0.5,
        decay: 2.0,
    };
    let template = Template::from_shape(&shape, 5.0, 0.1).unwrap();
    let detector = SlidingTemplateDetector::new(
        TemplateSource::Shape {
            shape,
            duration: 5.0,
        },
        DetectionThreshold::Absolute(4.0),
        false,
    );
    let offsets = [100, 800];
    let series = SweepBuilder::new(1000, -65.3, 0.1)
        .noise(0.1, 4)
        .copies(template.values(), &offsets, 5.0)
        .flatten(300..600, -65.3)
        .build();
    // windows starting here lie wholly within the flat stretch
    let flat_starts = 300..=(600 - template.len());

    let statistic = detector.detection_statistic(&series).unwrap();
    assert!(statistic.values()[flat_starts.clone()].iter().all(|theta| theta.is_nan()));

    let train = detector.detect(&series, None).unwrap();
    let peaks: Vec<usize> = train
        .events()
        .iter()
        .map(|event| series.index_at(event.peak_time()).unwrap())
        .collect();
    assert!(peaks.iter().all(|peak| !flat_starts.contains(peak)), "{peaks:?}");
    for offset in offsets {
        assert!(peaks.iter().any(|peak| peak.abs_diff(offset) <= 1), "{peaks:?}");
    }
}

#[test]
fn identical_inputs_give_identical_outputs() {
    let series = SweepBuilder::new(600, -60.0, 0.1)
        .spike(100, 10, 10.0, 5.0)
        .spike(300, 12, 10.0, 4.0)
        .noise(0.5, 9)
        .build();
    let settings = ActionPotentialSettings {
        detection: ActionPotentialParameters {
            min_fast_rise_duration: Some(0.3),
            ..Default::default()
        },
        features: FeatureParameters {
            interpolate_roots: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let first = find_action_potentials(&series, &settings).unwrap();
    let second = find_action_potentials(&series, &settings).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );

    let records: Vec<SweepRecord> = (0..8)
        .map(|i| SweepRecord {
            name: format!("sweep {i}"),
            dt: series.dt(),
            t0: 0.0,
            value_unit: Unit::new("mV"),
            time_unit: Unit::new("ms"),
            values: series.values().to_vec(),
            raw: None,
        })
        .collect();
    let outcomes = process_sweeps(&records, &Detection::ActionPotential(settings));
    for outcome in &outcomes {
        assert_eq!(outcome.events.as_ref(), Some(&first));
    }
}

#[test]
fn events_near_the_edges_are_excluded() {
    let series = SweepBuilder::new(300, -60.0, 0.1)
        .spike(3, 10, 10.0, 5.0)
        .spike(120, 10, 10.0, 5.0)
        .spike(280, 10, 10.0, 5.0)
        .build();
    let detection = ActionPotentialDetector::new(no_fast_rise_limit())
        .unwrap()
        .detect(&series)
        .unwrap();
    assert_eq!(detection.len(), 3);

    let settings = ActionPotentialSettings {
        detection: no_fast_rise_limit(),
        extraction: ExtractionParameters {
            before: 1.0,
            after: 3.0,
            use_min_detected_isi: false,
        },
        ..Default::default()
    };
    let train = find_action_potentials(&series, &settings).unwrap();
    assert_eq!(train.len(), 1);
    assert_eq!(train.waveforms().len(), train.len());
    assert_eq!(train.features().len(), train.len());
    assert_eq!(train.events()[0], detection[1].event);
}

#[test]
fn triangle_half_max_duration() {
    for (half_width, height, dt) in [(15, 30.0, 0.1), (9, 100.0, 0.02), (21, 7.5, 1.0)] {
        let series = SweepBuilder::new(4 * half_width, 0.0, dt)
            .triangle(half_width / 2, half_width, height)
            .build();
        let waveform = Waveform::new(series, 0);
        for interpolate_roots in [false, true] {
            let parameters = FeatureParameters {
                interpolate_roots,
                ..Default::default()
            };
            let features = FeatureAnalyzer::new(&parameters, &Unit::new("mV"))
                .unwrap()
                .analyze(&waveform);
            let duration = features.value(Feature::HalfMaxDuration).unwrap();
            assert!((duration - half_width as Real * dt).abs() <= dt);
        }
    }
}

#[test]
fn short_fast_rises_never_appear() {
    let dt = 0.1;
    let min_fast_rise_duration = 5.5 * dt;
    let detector = ActionPotentialDetector::new(ActionPotentialParameters {
        min_fast_rise_duration: Some(min_fast_rise_duration),
        vm_threshold: -100.0,
        ..Default::default()
    })
    .unwrap();
    for rise in 2..30 {
        let series = SweepBuilder::new(200, -60.0, dt)
            .spike(40, rise, 10.0, 5.0)
            .build();
        let events = detector.detect(&series).unwrap();
        // the derivative peaks on the last rising sample
        let fast_rise = (rise - 1) as Real * dt;
        assert_eq!(events.len(), usize::from(fast_rise >= min_fast_rise_duration), "rise of {rise}");
    }
}
