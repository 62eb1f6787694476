//! # Musical Tuning Module
//!
//! This module provides the tuning calculations for a Hindustani vocal tuner.
//! It defines the 12 swars of the scale with their just-intonation ratios,
//! expands them into a dense frequency table across the four singable octaves,
//! and maps detected frequencies back onto the nearest swar with a signed
//! deviation in cents.
//!
//! ## Features
//! - 12-swar scale (Sa to Ni) as small-integer just-intonation ratios
//! - Four octaves: Mandra (-1), Madhya (0), Taar (+1), Ati Taar (+2)
//! - Dense (octave, swar) -> ideal frequency table, built once per session
//! - Range-membership note mapping with acceptance intervals in cents
//! - Cent deviation calculations for tuning accuracy

use anyhow::{Result, anyhow, ensure};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The 12 swars of the Hindustani scale, in ascending canonical order.
///
/// Lowercase display names (re, ga, dha, ni) are the komal (flat) variants,
/// `Ma#` is tivra Ma. `Swar` is deliberately a fieldless enum so the scale
/// table can be a dense array indexed by [`Swar::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Swar {
    Sa,
    KomalRe,
    Re,
    KomalGa,
    Ga,
    Ma,
    TivraMa,
    Pa,
    KomalDha,
    Dha,
    KomalNi,
    Ni,
}

/// Number of swars in one octave.
pub const SWAR_COUNT: usize = 12;

impl Swar {
    /// All swars in ascending canonical order. Scan order for note mapping.
    pub const ALL: [Swar; SWAR_COUNT] = [
        Swar::Sa,
        Swar::KomalRe,
        Swar::Re,
        Swar::KomalGa,
        Swar::Ga,
        Swar::Ma,
        Swar::TivraMa,
        Swar::Pa,
        Swar::KomalDha,
        Swar::Dha,
        Swar::KomalNi,
        Swar::Ni,
    ];

    /// Position in the canonical ordering (0 for Sa, 11 for Ni).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Conventional display name. Komal swars are lowercase, tivra Ma is `Ma#`.
    pub fn name(self) -> &'static str {
        match self {
            Swar::Sa => "Sa",
            Swar::KomalRe => "re",
            Swar::Re => "Re",
            Swar::KomalGa => "ga",
            Swar::Ga => "Ga",
            Swar::Ma => "Ma",
            Swar::TivraMa => "Ma#",
            Swar::Pa => "Pa",
            Swar::KomalDha => "dha",
            Swar::Dha => "Dha",
            Swar::KomalNi => "ni",
            Swar::Ni => "Ni",
        }
    }

    /// Just-intonation ratio to the tonic as a (numerator, denominator) pair.
    ///
    /// Ratios are strictly increasing from 1/1 (Sa) to 15/8 (Ni), all below
    /// 2/1, so consecutive octaves never overlap.
    pub fn ratio_terms(self) -> (u32, u32) {
        match self {
            Swar::Sa => (1, 1),
            Swar::KomalRe => (16, 15),
            Swar::Re => (9, 8),
            Swar::KomalGa => (6, 5),
            Swar::Ga => (5, 4),
            Swar::Ma => (4, 3),
            Swar::TivraMa => (45, 32),
            Swar::Pa => (3, 2),
            Swar::KomalDha => (8, 5),
            Swar::Dha => (5, 3),
            Swar::KomalNi => (9, 5),
            Swar::Ni => (15, 8),
        }
    }

    /// Just-intonation ratio to the tonic at the same octave.
    pub fn ratio(self) -> f32 {
        let (num, den) = self.ratio_terms();
        num as f32 / den as f32
    }
}

impl fmt::Display for Swar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static map for quick swar name lookups (e.g. "Sa", "re", "Ma#").
static SWAR_MAP: Lazy<BTreeMap<&'static str, Swar>> =
    Lazy::new(|| Swar::ALL.iter().map(|&s| (s.name(), s)).collect());

impl FromStr for Swar {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        SWAR_MAP
            .get(s)
            .copied()
            .ok_or_else(|| anyhow!("unknown swar name: {s:?}"))
    }
}

/// The four octaves covered by the tuner, relative to the middle (Madhya)
/// octave that contains the tonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Octave {
    /// Lower octave (index -1).
    Mandra,
    /// Middle octave (index 0); contains the configured tonic.
    Madhya,
    /// Upper octave (index +1).
    Taar,
    /// Second upper octave (index +2).
    AtiTaar,
}

/// Number of octaves in the scale table.
pub const OCTAVE_COUNT: usize = 4;

impl Octave {
    /// All octaves in ascending order. Scan order for note mapping.
    pub const ALL: [Octave; OCTAVE_COUNT] =
        [Octave::Mandra, Octave::Madhya, Octave::Taar, Octave::AtiTaar];

    /// Signed octave index: the tonic is multiplied by 2^index.
    pub fn index(self) -> i32 {
        match self {
            Octave::Mandra => -1,
            Octave::Madhya => 0,
            Octave::Taar => 1,
            Octave::AtiTaar => 2,
        }
    }

    /// Position in [`Octave::ALL`], for dense table indexing.
    fn table_index(self) -> usize {
        (self.index() + 1) as usize
    }

    /// Traditional octave name, used for display.
    pub fn name(self) -> &'static str {
        match self {
            Octave::Mandra => "Mandra",
            Octave::Madhya => "Madhya",
            Octave::Taar => "Taar",
            Octave::AtiTaar => "Ati Taar",
        }
    }
}

impl fmt::Display for Octave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Calculates the deviation between two frequencies in cents.
///
/// Cents are a logarithmic unit of pitch measurement where:
/// - 1200 cents = 1 octave
/// - Positive values mean `freq` is sharp of `target_freq`, negative flat
pub fn cents_difference(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}

/// A frequency successfully mapped onto the scale: one swar in one octave,
/// with the signed deviation of the input from that swar's ideal frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteCandidate {
    pub swar: Swar,
    pub octave: Octave,
    /// The swar's ideal frequency in Hz at the table's tonic.
    pub ideal_frequency: f32,
    /// Signed deviation of the input from `ideal_frequency`, in cents.
    pub cents: f32,
}

/// Dense lookup table of ideal frequencies and acceptance intervals for every
/// (octave, swar) pair, built once from a tonic frequency and immutable for
/// the lifetime of a session.
#[derive(Debug, Clone)]
pub struct ScaleTable {
    /// Ideal frequency in Hz, indexed [octave][swar].
    frequencies: [[f32; SWAR_COUNT]; OCTAVE_COUNT],
    /// Acceptance interval (lower, upper) in Hz, indexed [octave][swar].
    ranges: [[(f32, f32); SWAR_COUNT]; OCTAVE_COUNT],
}

impl ScaleTable {
    /// Builds the table for a given tonic ("Sa" of the Madhya octave, in Hz)
    /// and acceptance half-width in cents.
    ///
    /// A frequency within `range_cents` of a swar's ideal frequency maps to
    /// that swar; anything outside every interval maps to nothing. Half-widths
    /// above 35 cents make neighboring intervals overlap (the narrowest step,
    /// ni to Ni, is a 25/24 chroma of about 70 cents); overlap is legal and
    /// resolved by scan order, ascending octave then canonical swar order.
    pub fn new(tonic: f32, range_cents: f32) -> Result<Self> {
        ensure!(
            tonic.is_finite() && tonic > 0.0,
            "tonic frequency must be positive, got {tonic}"
        );
        ensure!(
            range_cents.is_finite() && range_cents > 0.0,
            "acceptance half-width must be positive, got {range_cents}"
        );

        let mut frequencies = [[0.0; SWAR_COUNT]; OCTAVE_COUNT];
        let mut ranges = [[(0.0, 0.0); SWAR_COUNT]; OCTAVE_COUNT];

        // Multiplying by 2^octave is exact in floating point, so the octave
        // scaling identity table[o][s] == table[0][s] * 2^o holds exactly.
        let half_width = (range_cents / 1200.0).exp2();
        for octave in Octave::ALL {
            let o = octave.table_index();
            let octave_factor = 2.0f32.powi(octave.index());
            for swar in Swar::ALL {
                let ideal = tonic * swar.ratio() * octave_factor;
                frequencies[o][swar.index()] = ideal;
                ranges[o][swar.index()] = (ideal / half_width, ideal * half_width);
            }
        }

        Ok(ScaleTable { frequencies, ranges })
    }

    /// Ideal frequency in Hz of a swar in an octave.
    pub fn ideal(&self, octave: Octave, swar: Swar) -> f32 {
        self.frequencies[octave.table_index()][swar.index()]
    }

    /// Acceptance interval (lower, upper) in Hz of a swar in an octave.
    pub fn range(&self, octave: Octave, swar: Swar) -> (f32, f32) {
        self.ranges[octave.table_index()][swar.index()]
    }

    /// Maps a frequency onto the nearest swar by range membership.
    ///
    /// If `locked` names a swar, its interval is checked first so that a
    /// frequency hovering near an interval edge keeps resolving to the swar
    /// the tracker currently holds. Otherwise all (octave, swar) pairs are
    /// scanned in ascending order and the first containing interval wins.
    /// Returns `None` if the frequency falls in no interval.
    pub fn map_frequency(
        &self,
        frequency: f32,
        locked: Option<(Swar, Octave)>,
    ) -> Option<NoteCandidate> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return None;
        }

        if let Some((swar, octave)) = locked {
            if let Some(candidate) = self.check_membership(frequency, octave, swar) {
                return Some(candidate);
            }
        }

        for octave in Octave::ALL {
            for swar in Swar::ALL {
                if let Some(candidate) = self.check_membership(frequency, octave, swar) {
                    return Some(candidate);
                }
            }
        }

        None
    }

    fn check_membership(
        &self,
        frequency: f32,
        octave: Octave,
        swar: Swar,
    ) -> Option<NoteCandidate> {
        let (lower, upper) = self.range(octave, swar);
        if frequency >= lower && frequency <= upper {
            let ideal = self.ideal(octave, swar);
            Some(NoteCandidate {
                swar,
                octave,
                ideal_frequency: ideal,
                cents: cents_difference(frequency, ideal),
            })
        } else {
            None
        }
    }
}
