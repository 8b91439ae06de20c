//! Binary search with rounding over any non-decreasing sequence.
//!
//! One algorithm serves every clock lookup in the workspace: a tree path,
//! a block's node array, and a history browser's tree-plus-queue view all
//! expose themselves as `(len, measure)` and call [`search`] or
//! [`search_both`]. The measure is called O(log n) times.

use crate::error::{LookupError, PathOutOfRange};

/// How to pick a result when the target falls between two elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Rounding {
    /// Only an element whose measure equals the target.
    Exact,
    /// The nearest element at or below the target.
    Low,
    /// The nearest element at or above the target.
    High,
    /// Like [`Rounding::Low`], falling back to the high neighbour.
    #[default]
    LowOtherwiseHigh,
    /// Like [`Rounding::High`], falling back to the low neighbour.
    HighOtherwiseLow,
    /// Whichever neighbour is nearer; ties go to the low one.
    Closest,
}

/// The elements on either side of a lookup target.
///
/// On an exact match both sides hold the matching element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Neighbors<T> {
    /// Nearest element at or below the target.
    pub low: Option<T>,
    /// Nearest element at or above the target.
    pub high: Option<T>,
}

impl<T> Neighbors<T> {
    /// Apply `f` to both sides.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Neighbors<U> {
        Neighbors {
            low: self.low.map(&mut f),
            high: self.high.map(&mut f),
        }
    }

    /// Whether neither side is present.
    pub fn is_empty(&self) -> bool {
        self.low.is_none() && self.high.is_none()
    }
}

/// Raw outcome of a bisection: indices and measures of the neighbours.
///
/// `high` is the first element whose measure is `>= target`; `low` is
/// the element just before it, unless `high` matches exactly, in which
/// case both hold the match.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Bracket {
    /// Index and measure of the low neighbour.
    pub low: Option<(usize, f64)>,
    /// Index and measure of the high neighbour.
    pub high: Option<(usize, f64)>,
    target: f64,
}

impl Bracket {
    fn new(target: f64, low: Option<(usize, f64)>, high: Option<(usize, f64)>) -> Self {
        match high {
            Some((_, v)) if v == target => Self {
                low: high,
                high,
                target,
            },
            _ => Self { low, high, target },
        }
    }

    /// Whether an element's measure equals the target.
    pub fn is_exact(&self) -> bool {
        matches!(self.high, Some((_, v)) if v == self.target)
    }

    /// Index of the low and high neighbours.
    pub fn neighbors(&self) -> Neighbors<usize> {
        Neighbors {
            low: self.low.map(|(i, _)| i),
            high: self.high.map(|(i, _)| i),
        }
    }

    /// Pick one index according to `rounding`.
    pub fn resolve(&self, rounding: Rounding) -> Option<usize> {
        if self.is_exact() {
            return self.high.map(|(i, _)| i);
        }
        let low = self.low.map(|(i, _)| i);
        let high = self.high.map(|(i, _)| i);
        match rounding {
            Rounding::Exact => None,
            Rounding::Low => low,
            Rounding::High => high,
            Rounding::LowOtherwiseHigh => low.or(high),
            Rounding::HighOtherwiseLow => high.or(low),
            Rounding::Closest => match (self.low, self.high) {
                (Some((li, lv)), Some((hi, hv))) => {
                    if self.target - lv <= hv - self.target {
                        Some(li)
                    } else {
                        Some(hi)
                    }
                }
                _ => low.or(high),
            },
        }
    }
}

/// Locate `target` among `len` elements whose measures are non-decreasing.
///
/// Sequences of length 0 and 1 are answered directly. Longer ones check
/// both ends before bisecting, so a target outside the range costs two
/// measure calls.
pub fn bracket(
    len: usize,
    mut measure: impl FnMut(usize) -> f64,
    target: f64,
) -> Result<Bracket, LookupError> {
    if target.is_nan() {
        return Err(LookupError::InvalidTarget { value: target });
    }
    match len {
        0 => return Ok(Bracket::new(target, None, None)),
        1 => {
            let v = measure(0);
            return Ok(if v < target {
                Bracket::new(target, Some((0, v)), None)
            } else {
                Bracket::new(target, None, Some((0, v)))
            });
        }
        _ => {}
    }

    let first = measure(0);
    if first >= target {
        return Ok(Bracket::new(target, None, Some((0, first))));
    }
    let last_index = len - 1;
    let last = measure(last_index);
    if last < target {
        return Ok(Bracket::new(target, Some((last_index, last)), None));
    }

    // measure(lo) < target <= measure(hi)
    let (mut lo, mut lo_v) = (0, first);
    let (mut hi, mut hi_v) = (last_index, last);
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        let v = measure(mid);
        if v < target {
            lo = mid;
            lo_v = v;
        } else {
            hi = mid;
            hi_v = v;
        }
    }
    Ok(Bracket::new(target, Some((lo, lo_v)), Some((hi, hi_v))))
}

/// Find one index by measure with the given rounding.
pub fn search(
    len: usize,
    measure: impl FnMut(usize) -> f64,
    target: f64,
    rounding: Rounding,
) -> Result<Option<usize>, LookupError> {
    Ok(bracket(len, measure, target)?.resolve(rounding))
}

/// Find both neighbours of `target` by measure.
pub fn search_both(
    len: usize,
    measure: impl FnMut(usize) -> f64,
    target: f64,
) -> Result<Neighbors<usize>, LookupError> {
    Ok(bracket(len, measure, target)?.neighbors())
}

/// Turn a possibly negative index into a position in `0..len`.
///
/// Negative indices count from the end: `-1` is the last element.
pub fn resolve_index(index: isize, len: usize) -> Result<usize, PathOutOfRange> {
    let resolved = if index < 0 {
        len.checked_sub(index.unsigned_abs())
    } else {
        Some(index as usize).filter(|&i| i < len)
    };
    resolved.ok_or(PathOutOfRange { index, len })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL: [Rounding; 6] = [
        Rounding::Exact,
        Rounding::Low,
        Rounding::High,
        Rounding::LowOtherwiseHigh,
        Rounding::HighOtherwiseLow,
        Rounding::Closest,
    ];

    fn linear(values: &[f64], target: f64, rounding: Rounding) -> Option<usize> {
        let high = values.iter().position(|&v| v >= target);
        if let Some(h) = high {
            if values[h] == target {
                return Some(h);
            }
        }
        let low = match high {
            Some(h) => h.checked_sub(1),
            None => values.len().checked_sub(1),
        };
        match rounding {
            Rounding::Exact => None,
            Rounding::Low => low,
            Rounding::High => high,
            Rounding::LowOtherwiseHigh => low.or(high),
            Rounding::HighOtherwiseLow => high.or(low),
            Rounding::Closest => match (low, high) {
                (Some(l), Some(h)) => {
                    if target - values[l] <= values[h] - target {
                        Some(l)
                    } else {
                        Some(h)
                    }
                }
                _ => low.or(high),
            },
        }
    }

    fn find(values: &[f64], target: f64, rounding: Rounding) -> Option<usize> {
        search(values.len(), |i| values[i], target, rounding).unwrap()
    }

    #[test]
    fn empty_sequence_has_no_neighbours() {
        for r in ALL {
            assert_eq!(find(&[], 3.0, r), None);
        }
        assert!(search_both(0, |_| unreachable!(), 1.0).unwrap().is_empty());
    }

    #[test]
    fn single_element() {
        let v = [5.0];
        assert_eq!(find(&v, 5.0, Rounding::Exact), Some(0));
        assert_eq!(find(&v, 4.0, Rounding::Low), None);
        assert_eq!(find(&v, 4.0, Rounding::High), Some(0));
        assert_eq!(find(&v, 6.0, Rounding::Low), Some(0));
        assert_eq!(find(&v, 6.0, Rounding::High), None);
        assert_eq!(find(&v, 6.0, Rounding::HighOtherwiseLow), Some(0));
    }

    #[test]
    fn exact_match_at_first_and_last() {
        let v = [0.0, 1.0, 2.0, 3.0];
        for r in ALL {
            assert_eq!(find(&v, 0.0, r), Some(0));
            assert_eq!(find(&v, 3.0, r), Some(3));
        }
    }

    #[test]
    fn below_and_above_all_elements() {
        let v = [1.0, 2.0, 3.0];
        assert_eq!(find(&v, -1.0, Rounding::Low), None);
        assert_eq!(find(&v, -1.0, Rounding::LowOtherwiseHigh), Some(0));
        assert_eq!(find(&v, -1.0, Rounding::Closest), Some(0));
        assert_eq!(find(&v, 9.0, Rounding::High), None);
        assert_eq!(find(&v, 9.0, Rounding::HighOtherwiseLow), Some(2));
        assert_eq!(find(&v, 9.0, Rounding::Closest), Some(2));
    }

    #[test]
    fn between_elements() {
        let v = [0.0, 10.0, 20.0];
        assert_eq!(find(&v, 12.0, Rounding::Exact), None);
        assert_eq!(find(&v, 12.0, Rounding::Low), Some(1));
        assert_eq!(find(&v, 12.0, Rounding::High), Some(2));
        assert_eq!(find(&v, 12.0, Rounding::Closest), Some(1));
        assert_eq!(find(&v, 16.0, Rounding::Closest), Some(2));
        // Tie goes low.
        assert_eq!(find(&v, 15.0, Rounding::Closest), Some(1));
        let both = search_both(v.len(), |i| v[i], 12.0).unwrap();
        assert_eq!(both, Neighbors { low: Some(1), high: Some(2) });
    }

    #[test]
    fn nan_target_is_rejected() {
        let err = search(2, |i| i as f64, f64::NAN, Rounding::Low).unwrap_err();
        assert!(matches!(err, LookupError::InvalidTarget { .. }));
    }

    #[test]
    fn measure_calls_are_logarithmic() {
        let n = 1 << 12;
        let mut calls = 0;
        let found = search(
            n,
            |i| {
                calls += 1;
                i as f64
            },
            1234.5,
            Rounding::Low,
        )
        .unwrap();
        assert_eq!(found, Some(1234));
        assert!(calls <= 2 + 12, "made {calls} measure calls");
    }

    #[test]
    fn negative_indices_count_from_end() {
        assert_eq!(resolve_index(-1, 3), Ok(2));
        assert_eq!(resolve_index(-3, 3), Ok(0));
        assert_eq!(resolve_index(2, 3), Ok(2));
        assert_eq!(
            resolve_index(-4, 3),
            Err(PathOutOfRange { index: -4, len: 3 })
        );
        assert_eq!(resolve_index(3, 3), Err(PathOutOfRange { index: 3, len: 3 }));
        assert!(resolve_index(0, 0).is_err());
    }

    proptest! {
        #[test]
        fn matches_linear_reference(
            mut raw in proptest::collection::vec(0i32..40, 0..48),
            target in -5i32..45,
            half in any::<bool>(),
        ) {
            raw.sort_unstable();
            let values: Vec<f64> = raw.into_iter().map(f64::from).collect();
            let target = f64::from(target) + if half { 0.5 } else { 0.0 };
            for r in ALL {
                prop_assert_eq!(find(&values, target, r), linear(&values, target, r));
            }
        }
    }
}
