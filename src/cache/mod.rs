//! # Read-only cache of verdicts from prior runs.
//!
//! Goals consult the cache before running any live computation: historic
//! records matching the goal's name and a surface-derived predicate are
//! folded into a single verdict, and a definite result short-circuits the
//! pipeline entirely.
//!
//! ## Rules
//! - Records are created by prior runs and are read-only to the current run;
//!   arbitrarily many goals and workers may query concurrently without write
//!   contention.
//! - Unknown records are ignored by the fold. `True` and `False` among
//!   definite records for the same surface is a [`Contradiction`] and
//!   raises a hard error — cached data about one surface must be internally
//!   consistent, and the fold never guesses.
//!
//! [`Contradiction`]: crate::error::PipelineError::Contradiction

mod json;
mod record;

pub use json::JsonCache;
pub use record::CacheRecord;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::pipeline::Verdict;

/// Predicate selecting cache records relevant to one surface.
pub type RecordPredicate<'a> = &'a (dyn Fn(&CacheRecord) -> bool + Send + Sync);

/// A store of historic verdicts, queried by job name and predicate.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the records of prior runs of `job` accepted by `predicate`.
    async fn results(
        &self,
        job: &str,
        predicate: RecordPredicate<'_>,
    ) -> Result<Vec<CacheRecord>, PipelineError>;
}

/// The cache used when no backend was configured: it has no records.
///
/// Every query comes back empty, so goals always fall through to live
/// computation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

#[async_trait]
impl Cache for NoCache {
    async fn results(
        &self,
        _job: &str,
        _predicate: RecordPredicate<'_>,
    ) -> Result<Vec<CacheRecord>, PipelineError> {
        Ok(Vec::new())
    }
}

/// Folds the verdicts of several historic runs into one.
///
/// Unknown verdicts are ignored. If both definite verdicts appear, the data
/// is contradictory and an error is returned; otherwise the definite value
/// present wins, or the fold stays unknown.
pub fn reduce_verdicts<I>(job: &str, surface: &str, verdicts: I) -> Result<Verdict, PipelineError>
where
    I: IntoIterator<Item = Verdict>,
{
    let mut folded = Verdict::Unknown;
    for verdict in verdicts {
        match (folded, verdict) {
            (_, Verdict::Unknown) => {}
            (Verdict::Unknown, definite) => folded = definite,
            (a, b) if a == b => {}
            _ => {
                return Err(PipelineError::Contradiction {
                    job: job.to_string(),
                    surface: surface.to_string(),
                })
            }
        }
    }
    Ok(folded)
}
