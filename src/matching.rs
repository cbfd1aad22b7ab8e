use log::trace;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::features::{Descriptor, hamming};

/// Correspondence between `query_idx` in the earlier frame and `train_idx`
/// in the later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: u32,
}

/// Best and second-best neighbour of one query descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TwoNearest {
    best: (usize, u32),
    second: Option<(usize, u32)>,
}

fn two_nearest(query: &Descriptor, train: &[Descriptor]) -> Option<TwoNearest> {
    let mut best: Option<(usize, u32)> = None;
    let mut second: Option<(usize, u32)> = None;
    for (i, d) in train.iter().enumerate() {
        let dist = hamming(query, d);
        match best {
            Some((_, b)) if dist >= b => {
                if second.is_none_or(|(_, s)| dist < s) {
                    second = Some((i, dist));
                }
            }
            _ => {
                second = best;
                best = Some((i, dist));
            }
        }
    }
    best.map(|best| TwoNearest { best, second })
}

/// Exhaustive Hamming 2-NN matcher with Lowe's ratio test.
#[derive(Debug, Clone)]
pub struct Matcher {
    pub ratio_test_threshold: f32,
    pub cross_check: bool,
}

impl Matcher {
    pub fn new(ratio_test_threshold: f32, cross_check: bool) -> Matcher {
        Matcher {
            ratio_test_threshold,
            cross_check,
        }
    }

    /// Returns the good matches sorted by distance.
    ///
    /// A query is kept iff `best < ratio * second_best`; a query without a
    /// second candidate cannot pass the test and is dropped.
    pub fn match_descriptors(&self, query: &[Descriptor], train: &[Descriptor]) -> Vec<Match> {
        if query.is_empty() || train.is_empty() {
            return Vec::new();
        }
        let mut matches: Vec<Match> = query
            .par_iter()
            .enumerate()
            .filter_map(|(qi, q)| {
                let nn = two_nearest(q, train)?;
                let (_, second) = nn.second?;
                let (ti, best) = nn.best;
                if (best as f32) < self.ratio_test_threshold * second as f32 {
                    Some(Match {
                        query_idx: qi,
                        train_idx: ti,
                        distance: best,
                    })
                } else {
                    None
                }
            })
            .collect();

        if self.cross_check {
            let before = matches.len();
            matches.retain(|m| {
                two_nearest(&train[m.train_idx], query)
                    .is_some_and(|back| back.best.0 == m.query_idx)
            });
            trace!("cross check kept {} of {} matches", matches.len(), before);
        }

        matches.sort_by(|a, b| {
            a.distance
                .cmp(&b.distance)
                .then(a.query_idx.cmp(&b.query_idx))
        });
        matches
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(0.75, false)
    }
}
