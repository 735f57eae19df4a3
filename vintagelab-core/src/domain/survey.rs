//! Survey rows and round keys.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::RespondentId;
use super::quarter::{Quarter, QuarterError};

/// Key of a survey round: the `(year, quarter)` wave the panel answered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoundKey(pub Quarter);

impl RoundKey {
    pub fn new(year: i32, quarter: u8) -> Result<Self, QuarterError> {
        Quarter::new(year, quarter).map(Self)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn quarter(&self) -> u8 {
        self.0.quarter()
    }

    /// The economic quarter a round forecasts from: the quarter just before the round.
    pub fn reference_period(&self) -> Quarter {
        self.0.prev()
    }
}

impl fmt::Display for RoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One respondent's answer in one round.
///
/// `stated_value` is `None` when the survey cell was blank or a "not available"
/// sentinel. Such rows are kept; they only drop out of consensus computations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub round: RoundKey,
    pub respondent: RespondentId,
    pub stated_value: Option<f64>,
}

/// Survey row with its reconstructed lagged aggregate attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedResponse {
    pub response: SurveyResponse,
    /// Four-quarter prior-year average as of the round's resolved vintage.
    /// `0.0` when the round could not be resolved.
    pub rgdpl: f64,
}
