//! Sequence allocator
//!
//! Picks the next per-parent-per-type sequence number from the names that
//! are persisted right now. Nothing is cached between calls: every request
//! recomputes from storage.

use sites_common::naming::parse_sequence;
use std::collections::BTreeSet;

/// Lowest positive integer not used by any name in `existing` under `prefix`.
///
/// **Algorithm:**
/// 1. Parse the numeric suffix of every name that is `prefix` + digits
/// 2. Ignore names outside the scope (other prefixes, trailing text)
/// 3. Return the first gap starting from 1
///
/// Gaps left by deleted siblings are refilled. ROI callers pass every name
/// ever issued for the instrument, so retired ROI names are never gaps.
pub fn next_sequence<I, S>(existing: I, prefix: &str) -> u32
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let used: BTreeSet<u32> = existing
        .into_iter()
        .filter_map(|name| parse_sequence(name.as_ref(), prefix))
        .collect();

    let mut candidate = 1;
    for n in used {
        if n != candidate {
            break;
        }
        candidate += 1;
    }
    candidate
}
