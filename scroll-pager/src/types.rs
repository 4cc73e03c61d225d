/// Fraction of the sentinel's area that must be visible before a load triggers.
///
/// Always within `[0.0, 1.0]`. Out-of-range inputs are clamped; `NaN` falls back to
/// [`Threshold::FULL`].
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Threshold(f32);

impl Threshold {
    /// The sentinel must be fully visible.
    pub const FULL: Self = Self(1.0);
    /// Any overlap with the viewport counts.
    pub const ANY: Self = Self(0.0);

    pub fn new(fraction: f32) -> Self {
        if fraction.is_nan() {
            pwarn!("Threshold::new: NaN threshold, using 1.0");
            return Self::FULL;
        }
        if !(0.0..=1.0).contains(&fraction) {
            pwarn!(fraction, "Threshold::new: threshold outside [0, 1], clamping");
        }
        Self(fraction.clamp(0.0, 1.0))
    }

    pub fn get(self) -> f32 {
        self.0
    }

    /// Whether an element with the given visible `ratio` meets this threshold.
    ///
    /// A zero threshold still requires some overlap (`ratio > 0`), matching how intersection
    /// observers treat a `0` threshold.
    pub fn is_met_by(self, ratio: f32) -> bool {
        if self.0 == 0.0 {
            ratio > 0.0
        } else {
            ratio >= self.0
        }
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::FULL
    }
}

impl From<f32> for Threshold {
    fn from(fraction: f32) -> Self {
        Self::new(fraction)
    }
}

/// Load flags owned by the list orchestrator and pushed into the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadState {
    pub has_more: bool,
    pub is_loading: bool,
}

impl LoadState {
    pub fn new(has_more: bool, is_loading: bool) -> Self {
        Self {
            has_more,
            is_loading,
        }
    }

    pub fn allows_load(&self) -> bool {
        self.has_more && !self.is_loading
    }
}

impl Default for LoadState {
    fn default() -> Self {
        Self {
            has_more: true,
            is_loading: false,
        }
    }
}

/// One visibility notification delivered by a [`crate::VisibilityWatch`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntersectionEntry {
    /// Visible fraction of the target, in `[0.0, 1.0]`.
    pub ratio: f32,
    /// Whether the target meets the watch threshold.
    pub is_intersecting: bool,
}

impl IntersectionEntry {
    pub fn new(ratio: f32, threshold: Threshold) -> Self {
        let ratio = if ratio.is_nan() {
            0.0
        } else {
            ratio.clamp(0.0, 1.0)
        };
        Self {
            ratio,
            is_intersecting: threshold.is_met_by(ratio),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WatchOptions {
    pub threshold: Threshold,
    /// Grows (positive) or shrinks (negative) the viewport on both edges before intersecting.
    pub root_margin: i64,
}

impl WatchOptions {
    pub fn new(threshold: Threshold) -> Self {
        Self {
            threshold,
            root_margin: 0,
        }
    }
}

/// Result of one load operation.
///
/// The controller treats both variants the same way (the fetching flag is cleared either way);
/// the variant only feeds logging and the caller's own bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoadOutcome {
    Loaded,
    Failed,
}

impl LoadOutcome {
    pub fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }
}
