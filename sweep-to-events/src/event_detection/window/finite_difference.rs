use super::{Real, Window};
use num::integer::binomial;
use std::collections::VecDeque;

/// The `order`-th forward difference divided by `dt^order`, i.e. the
/// discrete `order`-th derivative. The output computed from samples
/// `i..=i+order` is attributed to the time of sample `i`.
#[derive(Default, Clone)]
pub struct FiniteDifference {
    order: usize,
    dt: Real,
    coefficients: Vec<Real>,
    values: VecDeque<Real>,
}

impl FiniteDifference {
    pub fn new(order: usize, dt: Real) -> Self {
        FiniteDifference {
            order,
            dt,
            values: VecDeque::<Real>::with_capacity(order + 1),
            coefficients: (0..=order)
                .map(|k| (if k & 1 == 1 { -1. } else { 1. }) * (binomial(order, k) as Real))
                .collect(),
        }
    }

    fn is_full(&self) -> bool {
        self.values.len() == self.order + 1
    }
}

impl Window for FiniteDifference {
    type InputType = Real;
    type OutputType = Real;

    fn push(&mut self, value: Real) -> bool {
        if self.is_full() {
            self.values.pop_back();
        }
        self.values.push_front(value);
        self.is_full()
    }

    fn output(&self) -> Option<Real> {
        self.is_full().then(|| {
            self.coefficients
                .iter()
                .zip(&self.values)
                .map(|(c, v)| c * v)
                .sum::<Real>()
                / self.dt.powi(self.order as i32)
        })
    }

    fn apply_time_shift(&self, time: Real) -> Real {
        time - self.order as Real * self.dt
    }
}
