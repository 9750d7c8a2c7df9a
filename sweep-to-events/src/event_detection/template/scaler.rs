use crate::{DetectionError, DetectionResult, event_detection::Real};
use serde::Serialize;

/// Least-squares fit of `y ≈ scale*h + offset` for one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FitResult {
    pub scale: Real,
    pub offset: Real,
    pub sse: Real,
    pub stderr: Real,
    pub detection_statistic: Real,
}

impl FitResult {
    /// The detection statistic, if the fit was not degenerate.
    pub fn statistic(&self) -> Option<Real> {
        self.detection_statistic
            .is_finite()
            .then_some(self.detection_statistic)
    }
}

/// True when `sum_squares - sum^2/n` is indistinguishable from round-off,
/// i.e. the values are constant to within floating point precision.
fn is_flat(centred_sum_squares: Real, sum_squares: Real, n: Real) -> bool {
    !(centred_sum_squares > Real::EPSILON * sum_squares * n)
}

/// Closed-form optimal scaling of a fixed template against windows of data.
/// Sums which depend only on the template are computed once.
/// A flat template or a flat window has no defined scale, and fits to `NaN`.
#[derive(Debug, Clone)]
pub struct TemplateScaler {
    template: Vec<Real>,
    sum: Real,
    /// `None` for a flat template.
    denominator: Option<Real>,
}

impl TemplateScaler {
    pub fn new(template: &[Real]) -> DetectionResult<Self> {
        if template.len() < 2 {
            return Err(DetectionError::TemplateTooShort(template.len()));
        }
        let n = template.len() as Real;
        let sum: Real = template.iter().sum();
        let sum_squares: Real = template.iter().map(|h| h * h).sum();
        let denominator = sum_squares - sum * sum / n;
        Ok(Self {
            template: template.to_vec(),
            sum,
            denominator: (!is_flat(denominator, sum_squares, n)).then_some(denominator),
        })
    }

    pub fn len(&self) -> usize {
        self.template.len()
    }

    pub fn is_empty(&self) -> bool {
        self.template.is_empty()
    }

    pub fn fit(&self, window: &[Real]) -> DetectionResult<FitResult> {
        if window.len() != self.template.len() {
            return Err(DetectionError::LengthMismatch {
                expected: self.template.len(),
                found: window.len(),
            });
        }
        let n = self.template.len() as Real;
        let sum_y: Real = window.iter().sum();
        let sum_yy: Real = window.iter().map(|y| y * y).sum();
        let sum_hy: Real = self.template.iter().zip(window).map(|(h, y)| h * y).sum();

        let scale = match self.denominator {
            Some(denominator) if !is_flat(sum_yy - sum_y * sum_y / n, sum_yy, n) => {
                (sum_hy - self.sum * sum_y / n) / denominator
            }
            _ => Real::NAN,
        };
        let offset = (sum_y - scale * self.sum) / n;
        let sse: Real = self
            .template
            .iter()
            .zip(window)
            .map(|(h, y)| (y - (scale * h + offset)).powi(2))
            .sum();
        let stderr = (sse / (n - 1.0)).sqrt();
        Ok(FitResult {
            scale,
            offset,
            sse,
            stderr,
            detection_statistic: scale / stderr,
        })
    }
}
