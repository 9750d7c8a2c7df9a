use super::{Template, TemplateShape};
use crate::{
    DetectionError, DetectionResult,
    event_detection::{Real, datatype::Waveform},
};

/// Outcome of a least-squares fit.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveFit {
    pub parameters: Vec<Real>,
    pub covariance: Option<Vec<Vec<Real>>>,
    pub success: bool,
}

/// A generic least-squares minimiser, supplied by the caller.
///
/// `objective` maps a parameter vector to the residual vector whose sum of
/// squares is minimised, starting from `initial`.
pub trait CurveFitter {
    fn fit(&self, objective: &dyn Fn(&[Real]) -> Vec<Real>, initial: &[Real]) -> CurveFit;
}

/// Mean of equal-length waveforms, sample by sample.
fn mean_waveform(waveforms: &[Waveform]) -> DetectionResult<Option<Vec<Real>>> {
    let Some(first) = waveforms.first() else {
        return Ok(None);
    };
    let len = first.series().len();
    let mut sum = vec![0.0; len];
    for waveform in waveforms {
        let values = waveform.series().values();
        if values.len() != len {
            return Err(DetectionError::LengthMismatch {
                expected: len,
                found: values.len(),
            });
        }
        sum.iter_mut().zip(values).for_each(|(s, v)| *s += v);
    }
    let count = waveforms.len() as Real;
    Ok(Some(sum.into_iter().map(|s| s / count).collect()))
}

/// Fits `shape`, plus a free scale and offset, to the mean of `waveforms`
/// and returns the fitted shape as a new template of the same length.
/// Returns `None` if there are no waveforms or the fitter reports failure.
pub fn refit_template<F: CurveFitter>(
    fitter: &F,
    shape: &TemplateShape,
    waveforms: &[Waveform],
) -> DetectionResult<Option<Template>> {
    let Some(mean) = mean_waveform(waveforms)? else {
        return Ok(None);
    };
    let Some(dt) = waveforms.first().map(|w| w.series().dt()) else {
        return Ok(None);
    };
    let num_shape_parameters = shape.parameters().len();

    let objective = |parameters: &[Real]| -> Vec<Real> {
        let (shape_parameters, linear) = parameters.split_at(num_shape_parameters);
        let (scale, offset) = match linear {
            &[scale, offset] => (scale, offset),
            _ => return vec![Real::NAN; mean.len()],
        };
        match shape.with_parameters(shape_parameters) {
            Ok(candidate) => candidate
                .sample(mean.len(), dt)
                .into_iter()
                .zip(&mean)
                .map(|(h, y)| scale * h + offset - y)
                .collect(),
            Err(_) => vec![Real::NAN; mean.len()],
        }
    };

    let baseline = mean.first().copied().unwrap_or_default();
    let peak = mean.iter().copied().fold(Real::NEG_INFINITY, Real::max);
    let mut initial = shape.parameters();
    initial.extend([peak - baseline, baseline]);

    let fit = fitter.fit(&objective, &initial);
    if !fit.success {
        return Ok(None);
    }
    let fitted = shape.with_parameters(fit.parameters.get(..num_shape_parameters).unwrap_or_default())?;
    Template::from_shape(&fitted, mean.len() as Real * dt, dt).map(Some)
}
