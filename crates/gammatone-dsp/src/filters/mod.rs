// SPDX-License-Identifier: LGPL-3.0-or-later

//! Auditory filter processors.

pub mod gammatone;
