//! The map-wide intrinsics deduplication table (spec section 4.3).

use std::collections::HashMap;

use crate::model::Keyframe;
use crate::types::Intrinsics;

/// Two intrinsics matrices are the same calibration, within measurement noise,
/// when their four defining scalars agree to within this absolute tolerance.
pub const DELTA: f32 = 0.1;

fn params(m: &Intrinsics) -> (f32, f32, f32, f32) {
    (m[(0, 0)], m[(1, 1)], m[(0, 2)], m[(1, 2)])
}

fn matches(a: &Intrinsics, b: &Intrinsics) -> bool {
    let (fx1, fy1, cx1, cy1) = params(a);
    let (fx2, fy2, cx2, cy2) = params(b);
    (fx1 - fx2).abs() < DELTA && (fy1 - fy2).abs() < DELTA && (cx1 - cx2).abs() < DELTA && (cy1 - cy2).abs() < DELTA
}

/// A deduplicated, first-seen-order table of intrinsics, plus the per-keyframe
/// index assigned into it.
#[derive(Debug, Clone, Default)]
pub struct IntrinsicsTable {
    pub rows: Vec<Intrinsics>,
    pub index_of: HashMap<u32, u32>,
}

impl IntrinsicsTable {
    /// Builds the table by scanning keyframes in ascending id order, probing
    /// linearly for a within-tolerance match before appending a new row.
    pub fn build<'a>(keyframes: impl Iterator<Item = &'a Keyframe>) -> Self {
        let mut table = IntrinsicsTable::default();
        for kf in keyframes {
            let found = table.rows.iter().position(|row| matches(row, &kf.intrinsics));
            let idx = match found {
                Some(idx) => idx as u32,
                None => {
                    table.rows.push(kf.intrinsics);
                    (table.rows.len() - 1) as u32
                }
            };
            table.index_of.insert(kf.id, idx);
        }
        table
    }

    pub fn lookup(&self, idx: u32) -> Option<Intrinsics> {
        self.rows.get(idx as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Pose, intrinsics_from_params};

    fn kf_with(id: u32, m: Intrinsics) -> Keyframe {
        Keyframe::new(id, Pose::identity(), 0.0, m)
    }

    #[test]
    fn shared_intrinsics_collapse_to_one_row() {
        let shared = intrinsics_from_params(500.0, 500.0, 320.0, 240.0);
        let kfs = vec![kf_with(0, shared), kf_with(1, shared), kf_with(2, shared)];
        let table = IntrinsicsTable::build(kfs.iter());
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.index_of[&0], 0);
        assert_eq!(table.index_of[&2], 0);
    }

    #[test]
    fn within_tolerance_intrinsics_collapse() {
        let a = intrinsics_from_params(500.0, 500.0, 320.0, 240.0);
        let b = intrinsics_from_params(500.05, 500.0, 320.0, 240.0);
        let kfs = vec![kf_with(0, a), kf_with(1, b)];
        let table = IntrinsicsTable::build(kfs.iter());
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn outside_tolerance_intrinsics_get_distinct_rows() {
        let a = intrinsics_from_params(500.0, 500.0, 320.0, 240.0);
        let b = intrinsics_from_params(501.0, 500.0, 320.0, 240.0);
        let kfs = vec![kf_with(0, a), kf_with(1, b)];
        let table = IntrinsicsTable::build(kfs.iter());
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.index_of[&0], 0);
        assert_eq!(table.index_of[&1], 1);
    }
}
