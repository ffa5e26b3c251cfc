pub mod correlation;
pub mod records;
pub mod score;
pub mod triple;

pub use correlation::{CorrelationRow, MethodSubset, StatisticKind};
pub use records::{ModelRecord, NativeRecord};
pub use score::{ScoreFailure, ScoreOutcome, ScoreReport};
pub use triple::{ChainMapping, EvaluationTriple, PairKey, StructureFormat};

#[cfg(test)]
#[path = "../../tests/src_inline/model/tests.rs"]
mod tests;
