#![cfg_attr(not(feature = "backend-tract"), allow(dead_code))]

use anyhow::{bail, Result};

use crate::detect::result::RawCandidate;

/// Leading values of a YOLO output row before the class scores:
/// center x, center y, width, height, objectness.
pub(crate) const ROW_PREFIX: usize = 5;

/// Split a flat YOLO output into candidates, `row_len` values per row.
///
/// Rows are `[cx, cy, w, h, objectness, class scores...]`. Objectness is
/// dropped; the class scores alone decide. A trailing partial row is ignored.
pub(crate) fn parse_rows(flat: &[f32], row_len: usize) -> Result<Vec<RawCandidate>> {
    if row_len <= ROW_PREFIX {
        bail!(
            "detector rows have {} values, expected more than {}",
            row_len,
            ROW_PREFIX
        );
    }
    Ok(flat
        .chunks_exact(row_len)
        .map(|row| RawCandidate::new(row[0], row[1], row[2], row[3], row[ROW_PREFIX..].to_vec()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objectness_is_not_a_class_score() {
        let flat = [
            0.5, 0.4, 0.2, 0.1, 0.99, 0.0, 0.0, 0.9, //
            0.1, 0.2, 0.3, 0.4, 0.01, 0.7, 0.2, 0.1,
        ];
        let rows = parse_rows(&flat, 8).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], RawCandidate::new(0.5, 0.4, 0.2, 0.1, vec![0.0, 0.0, 0.9]));
        assert_eq!(rows[1].class_scores, vec![0.7, 0.2, 0.1]);
    }

    #[test]
    fn rows_without_class_scores_are_rejected() {
        assert!(parse_rows(&[0.5, 0.5, 0.1, 0.1, 0.9], 5).is_err());
        assert!(parse_rows(&[0.5, 0.5, 0.1, 0.1], 4).is_err());
        assert!(parse_rows(&[], 0).is_err());
    }

    #[test]
    fn partial_trailing_row_is_ignored() {
        let flat = [0.5, 0.5, 0.1, 0.1, 0.9, 0.8, 0.3, 0.3];
        let rows = parse_rows(&flat, 6).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].class_scores, vec![0.8]);
    }
}
