//! Domain types for VintageLab

pub mod ids;
pub mod quarter;
pub mod revision;
pub mod survey;

pub use ids::{DatasetHash, IndicatorId, RespondentId};
pub use quarter::{Quarter, QuarterError};
pub use revision::{IndicatorRegime, RevisionRecord, VintagePoint};
pub use survey::{EnrichedResponse, RoundKey, SurveyResponse};
