use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use crate::comparator::{ComparatorError, StructuralComparator};
use crate::model::{EvaluationTriple, PairKey, ScoreOutcome};

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPair {
    pub key: PairKey,
    pub outcome: ScoreOutcome,
}

/// Scores every triple, in input order.
///
/// Per-pair failures are kept as `ScoreOutcome::Failed`. A fatal comparator
/// error stops the batch once in-flight pairs finish and is returned with
/// no partial results.
pub fn run_stage2(
    comparator: &dyn StructuralComparator,
    triples: &[EvaluationTriple],
    jobs: usize,
) -> Result<Vec<ScoredPair>, ComparatorError> {
    let jobs = jobs.clamp(1, triples.len().max(1));
    tracing::info!(
        "scoring {} pairs with {} ({} job{})",
        triples.len(),
        comparator.name(),
        jobs,
        if jobs == 1 { "" } else { "s" }
    );

    let outcomes = if jobs == 1 {
        score_sequential(comparator, triples)?
    } else {
        score_parallel(comparator, triples, jobs)?
    };

    let scored = triples
        .iter()
        .zip(outcomes)
        .map(|(triple, outcome)| ScoredPair {
            key: triple.key.clone(),
            outcome,
        })
        .collect::<Vec<_>>();

    let n_failed = scored.iter().filter(|s| s.outcome.failure().is_some()).count();
    tracing::info!(
        "scoring finished: {} scored, {} failed",
        scored.len() - n_failed,
        n_failed
    );
    Ok(scored)
}

fn score_one(
    comparator: &dyn StructuralComparator,
    triple: &EvaluationTriple,
) -> Result<ScoreOutcome, ComparatorError> {
    let outcome = comparator.compare(triple)?;
    match &outcome {
        ScoreOutcome::Scored(report) => {
            tracing::debug!("{}: DockQ {}", triple.key, report.dockq);
        }
        ScoreOutcome::Failed(failure) => {
            tracing::warn!("{}: scoring failed: {}", triple.key, failure);
        }
    }
    Ok(outcome)
}

fn score_sequential(
    comparator: &dyn StructuralComparator,
    triples: &[EvaluationTriple],
) -> Result<Vec<ScoreOutcome>, ComparatorError> {
    triples
        .iter()
        .map(|triple| score_one(comparator, triple))
        .collect()
}

fn score_parallel(
    comparator: &dyn StructuralComparator,
    triples: &[EvaluationTriple],
    jobs: usize,
) -> Result<Vec<ScoreOutcome>, ComparatorError> {
    let next = AtomicUsize::new(0);
    let abort = AtomicBool::new(false);
    let slots: Mutex<Vec<Option<ScoreOutcome>>> = Mutex::new(vec![None; triples.len()]);
    let fatal: Mutex<Option<ComparatorError>> = Mutex::new(None);

    thread::scope(|scope| {
        for _ in 0..jobs {
            scope.spawn(|| {
                while !abort.load(Ordering::SeqCst) {
                    let idx = next.fetch_add(1, Ordering::SeqCst);
                    let Some(triple) = triples.get(idx) else {
                        break;
                    };
                    match score_one(comparator, triple) {
                        Ok(outcome) => {
                            if let Ok(mut slots) = slots.lock() {
                                slots[idx] = Some(outcome);
                            }
                        }
                        Err(err) => {
                            abort.store(true, Ordering::SeqCst);
                            if let Ok(mut fatal) = fatal.lock() {
                                fatal.get_or_insert(err);
                            }
                        }
                    }
                }
            });
        }
    });

    if let Some(err) = fatal.into_inner().unwrap_or_else(|p| p.into_inner()) {
        return Err(err);
    }
    let slots = slots.into_inner().unwrap_or_else(|p| p.into_inner());
    let mut outcomes = Vec::with_capacity(slots.len());
    for (slot, triple) in slots.into_iter().zip(triples) {
        match slot {
            Some(outcome) => outcomes.push(outcome),
            None => {
                return Err(ComparatorError::Io {
                    key: triple.key.to_string(),
                    source: std::io::Error::other("scoring worker exited without a result"),
                });
            }
        }
    }
    Ok(outcomes)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage2_score.rs"]
mod tests;
