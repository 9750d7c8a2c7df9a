use crate::event_detection::Real;

/// Estimates the lower and upper states of a two-state waveform from its
/// amplitude histogram. Each state is the centre of the modal bin within its
/// half of the value range (ties resolve to the lower bin).
///
/// Non-finite values are ignored. Returns `None` if no finite value remains.
pub fn two_state_levels(values: &[Real], bins: usize) -> Option<(Real, Real)> {
    let finite = || values.iter().copied().filter(|v| v.is_finite());
    let min = finite().reduce(Real::min)?;
    let max = finite().reduce(Real::max)?;
    if max == min {
        return Some((min, max));
    }

    let bins = bins.max(2);
    let width = (max - min) / bins as Real;
    let mut counts = vec![0usize; bins];
    for v in finite() {
        let bin = (((v - min) / width) as usize).min(bins - 1);
        counts[bin] += 1;
    }

    let modal_bin = |range: std::ops::Range<usize>| {
        range
            .clone()
            .zip(&counts[range])
            .fold((0, 0), |(best, best_count), (bin, &count)| {
                if count > best_count {
                    (bin, count)
                } else {
                    (best, best_count)
                }
            })
            .0
    };
    let centre = |bin: usize| min + (bin as Real + 0.5) * width;
    let half = bins / 2;
    Some((centre(modal_bin(0..half)), centre(modal_bin(half..bins))))
}
