//! Closed-form branch-length estimates from quartet statistics.
//!
//! # Notation
//! For the branch above an internal node `v` with children `L`, `R`, sibling
//! `S` and the rest of the tree `O`:
//! - `m`: quartets whose topology matches the species tree (`LR|SO`)
//! - `n`: quartets supporting either discordant topology (`LS|RO`, `LO|RS`)
//! - `lm_q` / `ln_q`: mean length of quantity `q` over matching / discordant
//!   quartets, where `q` is the quartet's internal branch or the pendant
//!   branch towards `L` (a), `R` (b), `S` (c) or `O` (d).
//!
//! # Algorithm
//! ```text
//! p = (m - (1 + n) / 2) / (n + m + 1)
//! d = -ln(1 - p)                                  coalescent units
//! l_formula = (lm_i - ln_i) * d * (1 + 2p) / (3 (d - p))
//! l_naive   = d * ln_i
//! l         = weighted mean of both, weights ln(G)·d and 1 / (ln(G)·d)
//! ```
//! where `G` is the number of gene trees. Pendant estimates for the cherry
//! children (`a`, `b`) share one correction term; the sibling (`c`) and
//! outgroup (`d`) sides have their own.
//!
//! All functions are pure. Signs are kept; callers take absolute values
//! when writing lengths onto the tree.

use thiserror::Error;

use crate::annotation::QuartetStats;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimationError {
    #[error("insufficient quartets: m + n + 1 = 0 (m = {m}, n = {n})")]
    InsufficientQuartets { m: f64, n: f64 },

    #[error("{term} is zero (p_est = {p_est})")]
    ZeroDenominator { term: &'static str, p_est: f64 },

    #[error("blend weights are degenerate (w_formula = {w_formula}, w_naive = {w_naive})")]
    DegenerateWeights { w_formula: f64, w_naive: f64 },
}

/// All intermediate and final estimates for one internal node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimates {
    /// Discordance-probability estimate.
    pub p_est: f64,
    /// Internal branch length in coalescent units.
    pub d_est: f64,
    /// Mean internal length over discordant quartets.
    pub ln_internal: f64,
    pub l_formula: f64,
    pub l_naive: f64,
    /// Blended internal branch length in substitution units.
    pub l_internal: f64,
    /// Left child pendant.
    pub l_a: f64,
    /// Right child pendant.
    pub l_b: f64,
    /// Sibling pendant.
    pub l_c: f64,
    /// Branch towards the rest of the tree.
    pub l_d: f64,
}

/// Division that yields `0.0` for a zero denominator.
///
/// # Example
/// ```
/// # use castles::estimator::safe_div;
/// assert_eq!(safe_div(3.0, 2.0), 1.5);
/// assert_eq!(safe_div(-3.0, 0.0), 0.0);
/// ```
#[inline]
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Discordance probability `p_est` and coalescent length `d_est` from the
/// matching (`m`) and discordant (`n`) quartet counts.
///
/// # Errors
/// [`EstimationError::InsufficientQuartets`] when `n + m + 1 == 0`.
pub fn discordance(m: f64, n: f64) -> Result<(f64, f64), EstimationError> {
    let total = n + m + 1.0;
    if total == 0.0 {
        return Err(EstimationError::InsufficientQuartets { m, n });
    }
    let p_est = (m - 0.5 * (1.0 + n)) / total;
    let d_est = -(1.0 - p_est).ln();
    Ok((p_est, d_est))
}

/// Weighted average of the closed-form and naive internal estimates.
///
/// The closed form gets weight `ln(G)·d`, the naive one its reciprocal. With
/// a single gene tree (`ln(G) = 0`) the naive weight is unbounded and the
/// naive estimate is returned as is.
///
/// # Errors
/// [`EstimationError::DegenerateWeights`] when the weights do not sum to a
/// finite non-zero value, e.g. no gene trees at all or `d == 0` with more
/// than one gene tree.
pub fn blend(
    l_formula: f64,
    l_naive: f64,
    d_est: f64,
    gene_tree_count: usize,
) -> Result<f64, EstimationError> {
    if gene_tree_count == 1 {
        return Ok(l_naive);
    }

    let threshold = (gene_tree_count as f64).ln();
    let scale = threshold * d_est;

    let w_formula = scale;
    let w_naive = 1.0 / scale;
    let total = w_formula + w_naive;
    if total == 0.0 || !total.is_finite() {
        return Err(EstimationError::DegenerateWeights { w_formula, w_naive });
    }
    Ok((w_formula * l_formula + w_naive * l_naive) / total)
}

/// Estimate the internal branch and the four adjacent branches around a node.
///
/// # Errors
/// Any [`EstimationError`]: no quartets, `p_est` at a pole of one of the
/// pendant formulas (`0`, `-1/4`, `-1`), or degenerate blend weights.
pub fn estimate(
    stats: &QuartetStats,
    gene_tree_count: usize,
) -> Result<Estimates, EstimationError> {
    let matching = stats.lr_so;
    let discordant = stats.discordant();
    let m = matching.quartet_cnt;
    let n = discordant.quartet_cnt;

    let (p, d) = discordance(m, n)?;
    for (term, value) in [("p_est", p), ("1 + 4 p_est", 1.0 + 4.0 * p), ("1 + p_est", p + 1.0)] {
        if value == 0.0 {
            return Err(EstimationError::ZeroDenominator { term, p_est: p });
        }
    }

    let mean = |sum_m: f64, sum_n: f64| (safe_div(sum_m, m), safe_div(sum_n, n));
    let (lm_i, ln_i) = mean(matching.sum_internal, discordant.sum_internal);
    let (lm_a, ln_a) = mean(matching.sum_l, discordant.sum_l);
    let (lm_b, ln_b) = mean(matching.sum_r, discordant.sum_r);
    let (lm_c, ln_c) = mean(matching.sum_s, discordant.sum_s);
    let (lm_d, ln_d) = mean(matching.sum_o, discordant.sum_o);

    let l_formula = 1.0 / 3.0 * (lm_i - ln_i) * d * (1.0 + 2.0 * p) / (d - p);
    let l_naive = d * ln_i;
    let l_internal = blend(l_formula, l_naive, d, gene_tree_count)?;

    // Cherry children share the internal-branch correction.
    let mu2_a = -2.0 * (1.0 + 2.0 * p) * ((lm_i - ln_i) + (lm_a - ln_a)) / (1.0 + 4.0 * p);
    let mu2_b = -2.0 * (1.0 + 2.0 * p) * ((lm_i - ln_i) + (lm_b - ln_b)) / (1.0 + 4.0 * p);
    let l_a = ln_a - 5.0 / 6.0 * mu2_a - l_internal;
    let l_b = ln_b - 5.0 / 6.0 * mu2_b - l_internal;

    let l_c = ln_c - 1.0 / 3.0 * (2.0 - 1.0 / (p + 1.0)) * (lm_c - ln_c);
    let l_d = ln_d - 2.0 / 3.0 * (2.0 + 1.0 / p) * (lm_d - ln_d);

    Ok(Estimates {
        p_est: p,
        d_est: d,
        ln_internal: ln_i,
        l_formula,
        l_naive,
        l_internal,
        l_a,
        l_b,
        l_c,
        l_d,
    })
}
