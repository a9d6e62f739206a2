// SPDX-License-Identifier: LGPL-3.0-or-later

//! Recursive gammatone filter.
//!
//! An order-N gammatone filter has the impulse response
//! `t^(N-1) * exp(-2*pi*s*t) * cos(2*pi*f0*t)`, the standard model of a
//! single cochlear frequency channel. This module implements it with the
//! classic heterodyne recursion: each input sample is multiplied by a
//! complex carrier at `-f0` (shifting the band of interest to DC), passed
//! through N identical complex one-pole low-pass stages, and multiplied by
//! the carrier at `+f0` again, keeping the real part.
//!
//! Each stage uses the delayed one-pole form
//! `w[n] = b*w[n-1] + (1-b)*z[n-1]`, so the filter carries two
//! complex-valued arrays of length N between buffers: the previous sample's
//! per-stage inputs and the per-stage states. The extra N samples of latency
//! leave the magnitude response untouched.
//!
//! Bandwidth is stored as the per-stage decay `b = exp(-2*pi*s/fs)` with
//! `s` the gamma scale parameter; the 3 dB width and the Equivalent
//! Rectangular Bandwidth are both derived views of it:
//!
//! - `bw3dB = 2*sqrt(2^(1/N) - 1) * s`
//! - `erb   = an * s`, with `an = pi*(2N-2)!*2^-(2N-2) / ((N-1)!)^2`

use std::f64::consts::{PI, TAU};

use num_complex::Complex64;
use thiserror::Error;

use crate::consts::DEFAULT_SAMPLE_RATE;
use crate::units::erb_of_human_auditory_filter;

/// Errors from invalid filter configuration or processing preconditions.
///
/// A failed call never mutates the filter: validation happens before any
/// coefficient or state update, so the last valid configuration stays live.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GammatoneError {
    /// Filter order must be at least 1.
    #[error("filter order must be at least 1")]
    ZeroOrder,
    /// Sample rate must be a positive number of Hz.
    #[error("sample rate must be positive, got {0} Hz")]
    NonPositiveSampleRate(f32),
    /// Center frequency must lie strictly between 0 and the Nyquist limit.
    #[error("center frequency must lie in (0, {nyquist}) Hz, got {frequency} Hz")]
    CenterFrequencyOutOfRange {
        /// The rejected frequency in Hz.
        frequency: f32,
        /// Half the sample rate the check ran against, in Hz.
        nyquist: f32,
    },
    /// Bandwidth must be a positive number of Hz.
    #[error("bandwidth must be positive, got {0} Hz")]
    NonPositiveBandwidth(f32),
    /// Processing requires at least one sample.
    #[error("cannot process an empty buffer")]
    EmptyBuffer,
    /// Two-buffer processing requires equally sized buffers.
    #[error("input and output buffers differ in length ({src} vs {dst})")]
    BufferSizeMismatch {
        /// Input buffer length.
        src: usize,
        /// Output buffer length.
        dst: usize,
    },
}

/// Non-negative integer factorial, in double precision.
fn factorial(x: usize) -> f64 {
    (2..=x).fold(1.0, |acc, k| acc * k as f64)
}

/// Bandwidth factor of the order-N one-pole cascade: the ERB of the
/// composite magnitude response is `an * s` for gamma scale parameter `s`.
fn calculate_an(order: usize) -> f64 {
    let n = order as i32;
    PI * factorial(2 * order - 2) * 2f64.powi(-(2 * n - 2)) / factorial(order - 1).powi(2)
}

/// Combinatorial amplitude factor: together with `an` it restores the
/// pass-band amplitude halved by demodulating with a real carrier, so the
/// scaled cascade sits at exactly the configured gain at `f0`.
fn calculate_cn(order: usize) -> f64 {
    let n = order as i32;
    2f64.powi(2 * n - 1) * factorial(order - 1).powi(2) / (PI * factorial(2 * order - 2))
}

/// Ratio of the 3 dB bandwidth to the gamma scale parameter for order N:
/// `2*sqrt(2^(1/N) - 1)`.
fn bw3db_factor(order: usize) -> f64 {
    2.0 * (2f64.powf(1.0 / order as f64) - 1.0).sqrt()
}

/// Recursive gammatone filter for one frequency channel.
///
/// The order is fixed at construction; sample rate, center frequency,
/// bandwidth, and output gain can be reconfigured at any time. Geometry
/// changes (anything except gain) clear the recursive state and carrier
/// phase, so the next buffer starts a fresh response; consecutive `process`
/// calls without reconfiguration are one continuous stream.
///
/// A newly constructed filter uses a 44.1 kHz sample rate and the ERB of
/// the human auditory filter at its center frequency as bandwidth.
///
/// # Examples
///
/// ```
/// use gammatone_dsp::filters::gammatone::GammatoneFilter;
///
/// let mut filt = GammatoneFilter::new(4, 1000.0).unwrap();
/// filt.set_sample_rate(48000.0).unwrap();
///
/// let mut buf = vec![0.0f32; 256];
/// buf[0] = 1.0;
/// filt.process(&mut buf).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct GammatoneFilter {
    order: usize,
    sample_rate: f64,
    center: f64,
    decay: f64,
    gain: f64,
    an: f64,
    cn: f64,
    phase: f64,
    phase_inc: f64,
    prev_z: Vec<Complex64>,
    prev_w: Vec<Complex64>,
}

impl GammatoneFilter {
    /// Create a filter of the given order at the given center frequency.
    ///
    /// The sample rate defaults to 44.1 kHz and the bandwidth to the ERB of
    /// the human auditory filter at `center_frequency` (equivalent to
    /// calling [`set_frequency_using_auditory_erb`]); gain starts at 1.0.
    /// The order cannot be changed afterwards.
    ///
    /// [`set_frequency_using_auditory_erb`]: GammatoneFilter::set_frequency_using_auditory_erb
    pub fn new(order: usize, center_frequency: f32) -> Result<Self, GammatoneError> {
        if order == 0 {
            return Err(GammatoneError::ZeroOrder);
        }
        let sample_rate = DEFAULT_SAMPLE_RATE as f64;
        let center = center_frequency as f64;
        let nyquist = sample_rate / 2.0;
        if !(center > 0.0 && center < nyquist) {
            return Err(GammatoneError::CenterFrequencyOutOfRange {
                frequency: center_frequency,
                nyquist: nyquist as f32,
            });
        }

        let an = calculate_an(order);
        let mut filt = Self {
            order,
            sample_rate,
            center,
            decay: 0.0,
            gain: 1.0,
            an,
            cn: calculate_cn(order),
            phase: 0.0,
            phase_inc: 0.0,
            prev_z: vec![Complex64::new(0.0, 0.0); order],
            prev_w: vec![Complex64::new(0.0, 0.0); order],
        };
        let erb = erb_of_human_auditory_filter(center_frequency) as f64;
        filt.reconfigure(erb / an);
        Ok(filt)
    }

    /// Set the sample rate in Hz, keeping the bandwidth in Hz.
    ///
    /// Fails if the rate is not positive or the current center frequency
    /// would reach the new Nyquist limit. Clears the recursive state.
    pub fn set_sample_rate(&mut self, sr: f32) -> Result<&mut Self, GammatoneError> {
        let rate = sr as f64;
        if !(rate > 0.0) {
            return Err(GammatoneError::NonPositiveSampleRate(sr));
        }
        let nyquist = rate / 2.0;
        if self.center >= nyquist {
            return Err(GammatoneError::CenterFrequencyOutOfRange {
                frequency: self.center as f32,
                nyquist: nyquist as f32,
            });
        }
        let scale = self.gamma_scale();
        self.sample_rate = rate;
        self.reconfigure(scale);
        Ok(self)
    }

    /// Set the bandwidth as the width between the 3 dB cutoff points, in Hz,
    /// keeping the center frequency. Clears the recursive state.
    pub fn set_3db_bandwidth(&mut self, bw: f32) -> Result<&mut Self, GammatoneError> {
        if !(bw > 0.0) {
            return Err(GammatoneError::NonPositiveBandwidth(bw));
        }
        let scale = bw as f64 / bw3db_factor(self.order);
        self.reconfigure(scale);
        Ok(self)
    }

    /// Set the bandwidth as an Equivalent Rectangular Bandwidth in Hz,
    /// keeping the center frequency. Clears the recursive state.
    pub fn set_erb_bandwidth(&mut self, erb: f32) -> Result<&mut Self, GammatoneError> {
        if !(erb > 0.0) {
            return Err(GammatoneError::NonPositiveBandwidth(erb));
        }
        let scale = erb as f64 / self.an;
        self.reconfigure(scale);
        Ok(self)
    }

    /// Set the center frequency in Hz, keeping the bandwidth.
    ///
    /// Must lie strictly between 0 and the Nyquist limit. Clears the
    /// recursive state.
    pub fn set_center_frequency(&mut self, freq: f32) -> Result<&mut Self, GammatoneError> {
        let center = freq as f64;
        let nyquist = self.sample_rate / 2.0;
        if !(center > 0.0 && center < nyquist) {
            return Err(GammatoneError::CenterFrequencyOutOfRange {
                frequency: freq,
                nyquist: nyquist as f32,
            });
        }
        let scale = self.gamma_scale();
        self.center = center;
        self.reconfigure(scale);
        Ok(self)
    }

    /// Set the center frequency and match the bandwidth to the ERB of the
    /// human auditory filter at that frequency.
    pub fn set_frequency_using_auditory_erb(
        &mut self,
        freq: f32,
    ) -> Result<&mut Self, GammatoneError> {
        self.set_center_frequency(freq)?;
        self.set_erb_bandwidth(erb_of_human_auditory_filter(freq))
    }

    /// Set the linear output gain. Does not touch the recursive state, so
    /// the stream continues without a transient.
    pub fn set_general_gain(&mut self, gain: f32) -> &mut Self {
        self.gain = gain as f64;
        self
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate as f32
    }

    /// Linear output gain.
    pub fn general_gain(&self) -> f32 {
        self.gain as f32
    }

    /// Filter order, as passed at construction.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Bandwidth as the width between the 3 dB cutoff points, in Hz.
    pub fn bandwidth_3db(&self) -> f32 {
        (bw3db_factor(self.order) * self.gamma_scale()) as f32
    }

    /// Bandwidth as an Equivalent Rectangular Bandwidth, in Hz.
    pub fn erb_bandwidth(&self) -> f32 {
        (self.an * self.gamma_scale()) as f32
    }

    /// Center frequency in Hz.
    pub fn center_frequency(&self) -> f32 {
        self.center as f32
    }

    /// Clear the recursive state and carrier phase.
    ///
    /// The next buffer starts a fresh impulse response, as if the filter had
    /// just been configured.
    pub fn reset(&mut self) {
        self.prev_z.fill(Complex64::new(0.0, 0.0));
        self.prev_w.fill(Complex64::new(0.0, 0.0));
        self.phase = 0.0;
    }

    /// Filter `buffer` in place.
    ///
    /// The buffer is treated as a contiguous continuation of previous calls;
    /// only reconfiguration or [`reset`](GammatoneFilter::reset) breaks the
    /// stream. Fails on an empty buffer without touching any state.
    pub fn process(&mut self, buffer: &mut [f32]) -> Result<(), GammatoneError> {
        if buffer.is_empty() {
            return Err(GammatoneError::EmptyBuffer);
        }
        let k = self.an * self.cn * self.gain;
        for sample in buffer.iter_mut() {
            *sample = (k * self.step(*sample as f64)) as f32;
        }
        Ok(())
    }

    /// Filter `src` into `dst`, overwriting it.
    ///
    /// Same stream semantics as [`process`](GammatoneFilter::process); both
    /// buffers must have the same non-zero length.
    pub fn process_to(&mut self, dst: &mut [f32], src: &[f32]) -> Result<(), GammatoneError> {
        Self::check_pair(dst, src)?;
        let k = self.an * self.cn * self.gain;
        for (out, &inp) in dst.iter_mut().zip(src.iter()) {
            *out = (k * self.step(inp as f64)) as f32;
        }
        Ok(())
    }

    /// Filter `src` and add the result onto `dst`.
    ///
    /// Same stream semantics as [`process`](GammatoneFilter::process); both
    /// buffers must have the same non-zero length.
    pub fn process_add(&mut self, dst: &mut [f32], src: &[f32]) -> Result<(), GammatoneError> {
        Self::check_pair(dst, src)?;
        let k = self.an * self.cn * self.gain;
        for (out, &inp) in dst.iter_mut().zip(src.iter()) {
            *out += (k * self.step(inp as f64)) as f32;
        }
        Ok(())
    }

    fn check_pair(dst: &[f32], src: &[f32]) -> Result<(), GammatoneError> {
        if src.len() != dst.len() {
            return Err(GammatoneError::BufferSizeMismatch {
                src: src.len(),
                dst: dst.len(),
            });
        }
        if src.is_empty() {
            return Err(GammatoneError::EmptyBuffer);
        }
        Ok(())
    }

    /// Run one sample through the demodulate / cascade / remodulate chain.
    ///
    /// Returns the unscaled output; callers apply `an * cn * gain`.
    #[inline]
    fn step(&mut self, x: f64) -> f64 {
        let carrier = Complex64::cis(self.phase);

        // shift the band of interest down to DC
        let mut z = carrier.conj() * x;

        let one_minus_b = 1.0 - self.decay;
        for i in 0..self.order {
            let w = self.prev_w[i] * self.decay + self.prev_z[i] * one_minus_b;
            self.prev_z[i] = z;
            self.prev_w[i] = w;
            z = w;
        }

        self.advance_phase();

        // shift back up with the same carrier sample
        (z * carrier).re
    }

    /// Advance the carrier phase by one sample, wrapping to [0, 2*pi).
    ///
    /// The increment is below pi (center frequency is below Nyquist), so a
    /// single subtraction wraps; wrapping every sample keeps the accumulator
    /// small over arbitrarily long streams.
    #[inline]
    fn advance_phase(&mut self) {
        self.phase += self.phase_inc;
        if self.phase >= TAU {
            self.phase -= TAU;
        }
    }

    /// Recompute the decay coefficient and carrier increment for the given
    /// gamma scale parameter (Hz) and clear the recursive state.
    ///
    /// Every geometry-affecting setter funnels through here, so the
    /// coefficients and the state can never disagree mid-stream.
    fn reconfigure(&mut self, scale_hz: f64) {
        self.decay = (-TAU * scale_hz / self.sample_rate).exp();
        self.phase_inc = TAU * self.center / self.sample_rate;
        self.reset();
    }

    /// Gamma scale parameter in Hz, recovered from the stored decay.
    fn gamma_scale(&self) -> f64 {
        -self.decay.ln() * self.sample_rate / TAU
    }
}
