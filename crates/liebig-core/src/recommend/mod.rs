pub mod engine;
pub mod outcome;

pub use engine::{assemble, NO_APPLICATION};
pub use outcome::{
    CoverageLine, DeliveryLine, DoseLine, LimitingFinding, Recommendation, RecommendationStatus, UnmetLine,
};
