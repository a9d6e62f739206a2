// SPDX-License-Identifier: LGPL-3.0-or-later

//! Unit conversion functions.
//!
//! This module provides the psychoacoustic and gain conversions used around
//! the gammatone filter: the Glasberg & Moore ERB of the human auditory
//! filter, and dB/linear-gain conversions.

use crate::consts::{ERB_MIN_HZ, ERB_RATE_PER_KHZ};

/// Equivalent Rectangular Bandwidth of the human auditory filter.
///
/// Implements the published Glasberg & Moore formula
/// `ERB(f) = 24.7 * (4.37 * f / 1000 + 1)`, valid for center frequencies in
/// the normal hearing range.
///
/// # Arguments
/// * `freq` - Center frequency in Hz
///
/// # Returns
/// ERB in Hz
///
/// # Examples
/// ```
/// # use gammatone_dsp::units::erb_of_human_auditory_filter;
/// // Reference value at 1 kHz: 24.7 * 5.37 ≈ 132.6 Hz
/// let erb = erb_of_human_auditory_filter(1000.0);
/// assert!((erb - 132.64).abs() < 0.01);
/// ```
#[inline]
pub fn erb_of_human_auditory_filter(freq: f32) -> f32 {
    ERB_MIN_HZ * (ERB_RATE_PER_KHZ * freq / 1000.0 + 1.0)
}

/// Convert decibels to linear gain (amplitude ratio).
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    (db * (std::f32::consts::LN_10 / 20.0)).exp()
}

/// Convert linear gain (amplitude ratio) to decibels.
#[inline]
pub fn gain_to_db(gain: f32) -> f32 {
    20.0 * gain.log10()
}
