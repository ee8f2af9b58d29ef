//! Counters of the work done by the queries of a contact point.

use log::info;
use std::fmt::Debug;

/// Counts of the reference-line searches done by `xy2uv`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchStats {
    pub queries: usize,
    /// Searches started from a remembered result within the close distance.
    pub close_hits: usize,
    /// Searches started from a remembered result within the far distance.
    pub far_hits: usize,
    /// Searches with no remembered result close enough to start from.
    pub misses: usize,
    /// Steps taken walking from one segment to the next.
    pub steps: usize,
    /// Coarse searches over every tenth cross section.
    pub coarse_searches: usize,
    /// Searches restarted from the other end of a closed track.
    pub restarts: usize,
}

/// Counts of the elevation evaluations done by `uv2z`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvalStats {
    pub queries: usize,
    /// Evaluations outside the range of `u`.
    pub border_u: usize,
    /// Evaluations outside the range of `v`.
    pub border_v: usize,
    /// Bisection steps locating `v` among irregular long sections.
    pub v_steps: usize,
    /// The most bisection steps taken by a single evaluation.
    pub max_v_steps: usize,
}

/// The performance statistics of a contact point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stats {
    pub search: SearchStats,
    pub eval: EvalStats,
}

impl Stats {
    /// Adds the counts of one query.
    pub(crate) fn add(&mut self, other: &Stats) {
        let (s, o) = (&mut self.search, &other.search);
        s.queries += o.queries;
        s.close_hits += o.close_hits;
        s.far_hits += o.far_hits;
        s.misses += o.misses;
        s.steps += o.steps;
        s.coarse_searches += o.coarse_searches;
        s.restarts += o.restarts;

        let (e, o) = (&mut self.eval, &other.eval);
        e.queries += o.queries;
        e.border_u += o.border_u;
        e.border_v += o.border_v;
        e.v_steps += o.v_steps;
        e.max_v_steps = e.max_v_steps.max(o.max_v_steps);
    }

    /// Writes the statistics to the log.
    pub fn log(&self, name: impl Debug) {
        let s = &self.search;
        info!("performance statistics of contact point {:?}", name);
        info!(
            "  search: {} queries, {} close hits, {} far hits, {} misses",
            s.queries, s.close_hits, s.far_hits, s.misses
        );
        info!(
            "  search: {} steps, {} coarse searches, {} restarts",
            s.steps, s.coarse_searches, s.restarts
        );
        let e = &self.eval;
        info!(
            "  evaluation: {} queries, {} outside u, {} outside v",
            e.queries, e.border_u, e.border_v
        );
        info!(
            "  evaluation: {} steps locating v, at most {} in one query",
            e.v_steps, e.max_v_steps
        );
    }
}

#[cfg(test)]
mod test {
    use super::Stats;

    #[test]
    fn counts_add_up() {
        let mut total = Stats::default();
        let mut one = Stats::default();
        one.search.queries = 1;
        one.search.close_hits = 1;
        one.eval.v_steps = 3;
        one.eval.max_v_steps = 3;
        total.add(&one);
        one.eval.max_v_steps = 2;
        total.add(&one);
        assert_eq!(total.search.queries, 2);
        assert_eq!(total.search.close_hits, 2);
        assert_eq!(total.eval.v_steps, 6);
        assert_eq!(total.eval.max_v_steps, 3);
    }
}
