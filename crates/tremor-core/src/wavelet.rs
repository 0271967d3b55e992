//! Ricker source wavelet.

use std::f32::consts::PI;

/// Sample a Ricker wavelet (second derivative of a Gaussian) with dominant
/// frequency `fm` (Hz), time step `dt` (s), and peak amplitude `amp`.
///
/// The wavelet is delayed by one dominant period so the trace starts near
/// zero: `w(t) = amp * (1 - 2u) * exp(-u)` with
/// `u = (pi * fm * (t - 1/fm))^2`.
pub fn ricker(nt: usize, fm: f32, dt: f32, amp: f32) -> Vec<f32> {
    (0..nt)
        .map(|it| {
            let arg = PI * fm * (it as f32 * dt - 1.0 / fm);
            let u = arg * arg;
            amp * (1.0 - 2.0 * u) * (-u).exp()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_is_at_one_period_delay() {
        let fm = 10.0;
        let dt = 0.001;
        let w = ricker(400, fm, dt, 1.0);
        let peak = w
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        // Delay 1/fm = 0.1 s = sample 100.
        assert_eq!(peak, 100);
        assert!((w[peak] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn amplitude_scales_linearly() {
        let a = ricker(200, 15.0, 0.002, 1.0);
        let b = ricker(200, 15.0, 0.002, 2.5);
        for (x, y) in a.iter().zip(&b) {
            assert!((y - 2.5 * x).abs() < 1e-5);
        }
    }

    #[test]
    fn tail_decays_to_zero() {
        let w = ricker(1000, 20.0, 0.001, 1.0);
        assert!(w[999].abs() < 1e-6);
    }
}
