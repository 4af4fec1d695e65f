//! Decode per-node quartet statistics from species-tree labels.
//!
//! # Format
//! Upstream tools attach a label of the form
//! ```text
//! {support:0.98,length:0.41,LR_SO:{quartetCnt:45,sumInternal:2.1,sumL:...,sumR:...,sumS:...,sumO:...},LS_RO:{...},LO_RS:{...}}
//! ```
//! to every internal node. The label is split on `,` `:` `{` `}` and empty
//! tokens are dropped; the numeric fields are then read at fixed positions.
//! Keys are never inspected, so the positions below are the whole contract.
//!
//! | Field        | Token |
//! |--------------|-------|
//! | support      | 1     |
//! | length       | 3     |
//! | LR_SO bucket | 6, 8, 10, 12, 14, 16 |
//! | LS_RO bucket | 19, 21, 23, 25, 27, 29 |
//! | LO_RS bucket | 32, 34, 36, 38, 40, 42 |

use thiserror::Error;

const DELIMITERS: [char; 4] = [',', ':', '{', '}'];

const SUPPORT: usize = 1;
const LENGTH: usize = 3;
const LR_SO: usize = 6;
const LS_RO: usize = 19;
const LO_RS: usize = 32;

/// Offsets of the six bucket fields relative to the bucket's first value.
const BUCKET_FIELDS: [(&str, usize); 6] = [
    ("quartetCnt", 0),
    ("sumInternal", 2),
    ("sumL", 4),
    ("sumR", 6),
    ("sumS", 8),
    ("sumO", 10),
];

/// Number of tokens a well-formed annotation must contain.
const MIN_TOKENS: usize = LO_RS + 10 + 1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnnotationError {
    #[error("internal node carries no annotation")]
    Missing,

    #[error("expected at least {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },

    #[error("field {field} (token {index}) is not a number: '{token}'")]
    NotANumber {
        field: String,
        index: usize,
        token: String,
    },
}

/// Quartets grouped under one of the three topologies around a branch.
///
/// `L`/`R` are the two child subtrees, `S` the sibling subtree and `O` the
/// rest of the tree.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bucket {
    pub quartet_cnt: f64,
    pub sum_internal: f64,
    pub sum_l: f64,
    pub sum_r: f64,
    pub sum_s: f64,
    pub sum_o: f64,
}

/// Decoded annotation of one internal species-tree node.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct QuartetStats {
    pub support: f64,
    pub length: f64,
    /// Quartets matching the species tree around this branch.
    pub lr_so: Bucket,
    pub ls_ro: Bucket,
    pub lo_rs: Bucket,
}

impl QuartetStats {
    /// Pooled bucket of both discordant topologies.
    pub fn discordant(&self) -> Bucket {
        Bucket {
            quartet_cnt: self.ls_ro.quartet_cnt + self.lo_rs.quartet_cnt,
            sum_internal: self.ls_ro.sum_internal + self.lo_rs.sum_internal,
            sum_l: self.ls_ro.sum_l + self.lo_rs.sum_l,
            sum_r: self.ls_ro.sum_r + self.lo_rs.sum_r,
            sum_s: self.ls_ro.sum_s + self.lo_rs.sum_s,
            sum_o: self.ls_ro.sum_o + self.lo_rs.sum_o,
        }
    }
}

/// Decode a raw node label into [`QuartetStats`].
///
/// # Errors
/// [`AnnotationError::TooFewFields`] when the label is shorter than the
/// positional layout, [`AnnotationError::NotANumber`] when a value token does
/// not parse as a float.
pub fn decode_annotation(raw: &str) -> Result<QuartetStats, AnnotationError> {
    let tokens: Vec<&str> = raw
        .split(|c| DELIMITERS.contains(&c))
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.len() < MIN_TOKENS {
        return Err(AnnotationError::TooFewFields {
            expected: MIN_TOKENS,
            found: tokens.len(),
        });
    }

    Ok(QuartetStats {
        support: number(&tokens, SUPPORT, "support")?,
        length: number(&tokens, LENGTH, "length")?,
        lr_so: bucket(&tokens, LR_SO, "LR_SO")?,
        ls_ro: bucket(&tokens, LS_RO, "LS_RO")?,
        lo_rs: bucket(&tokens, LO_RS, "LO_RS")?,
    })
}

fn bucket(tokens: &[&str], start: usize, name: &str) -> Result<Bucket, AnnotationError> {
    let mut values = [0.0; 6];
    for (value, (field, offset)) in values.iter_mut().zip(BUCKET_FIELDS) {
        *value = number(tokens, start + offset, &format!("{name}.{field}"))?;
    }
    let [quartet_cnt, sum_internal, sum_l, sum_r, sum_s, sum_o] = values;
    Ok(Bucket {
        quartet_cnt,
        sum_internal,
        sum_l,
        sum_r,
        sum_s,
        sum_o,
    })
}

fn number(tokens: &[&str], index: usize, field: &str) -> Result<f64, AnnotationError> {
    let token = tokens[index].trim();
    token.parse::<f64>().map_err(|_| AnnotationError::NotANumber {
        field: field.to_string(),
        index,
        token: token.to_string(),
    })
}
