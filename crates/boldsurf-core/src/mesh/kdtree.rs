//! Static 3-D k-d tree for nearest-vertex queries.
//!
//! The tree is implicit: `order` is a permutation of point indices in which
//! every sub-range stores its splitting point at the midpoint, with smaller
//! coordinates (on the split axis) to the left.

use std::cmp::Ordering;

use nalgebra::Vector3;

#[derive(Debug, Clone)]
pub struct KdTree {
    points: Vec<Vector3<f64>>,
    order: Vec<usize>,
}

impl KdTree {
    pub fn new(points: &[Vector3<f64>]) -> Self {
        let mut order: Vec<usize> = (0..points.len()).collect();
        build(points, &mut order, 0);
        Self {
            points: points.to_vec(),
            order,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Index of the nearest point and its squared distance.
    ///
    /// Equidistant candidates resolve to the lowest index. Returns `None`
    /// for an empty tree or a query with NaN components.
    pub fn nearest(&self, query: &Vector3<f64>) -> Option<(usize, f64)> {
        if self.points.is_empty() {
            return None;
        }
        let mut best = (usize::MAX, f64::INFINITY);
        self.search(&self.order, 0, query, &mut best);
        // a NaN query never compares closer than anything
        (best.0 != usize::MAX).then_some(best)
    }

    fn search(&self, order: &[usize], depth: usize, query: &Vector3<f64>, best: &mut (usize, f64)) {
        if order.is_empty() {
            return;
        }
        let axis = depth % 3;
        let mid = order.len() / 2;
        let idx = order[mid];
        let p = &self.points[idx];

        let d2 = (p - query).norm_squared();
        if d2 < best.1 || (d2 == best.1 && idx < best.0) {
            *best = (idx, d2);
        }

        let diff = query[axis] - p[axis];
        let (near, far) = if diff < 0.0 {
            (&order[..mid], &order[mid + 1..])
        } else {
            (&order[mid + 1..], &order[..mid])
        };
        self.search(near, depth + 1, query, best);
        // ties on the split plane can sit on either side
        if diff * diff <= best.1 {
            self.search(far, depth + 1, query, best);
        }
    }
}

fn build(points: &[Vector3<f64>], order: &mut [usize], depth: usize) {
    if order.len() <= 1 {
        return;
    }
    let axis = depth % 3;
    let mid = order.len() / 2;
    order.select_nth_unstable_by(mid, |&a, &b| {
        points[a][axis]
            .partial_cmp(&points[b][axis])
            .unwrap_or(Ordering::Equal)
    });
    let (left, right) = order.split_at_mut(mid);
    build(points, left, depth + 1);
    build(points, &mut right[1..], depth + 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn brute_force(points: &[Vector3<f64>], q: &Vector3<f64>) -> (usize, f64) {
        let mut best = (usize::MAX, f64::INFINITY);
        for (i, p) in points.iter().enumerate() {
            let d2 = (p - q).norm_squared();
            if d2 < best.1 {
                best = (i, d2);
            }
        }
        best
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::new(&[]);
        assert!(tree.is_empty());
        assert_eq!(tree.nearest(&Vector3::zeros()), None);
    }

    #[test]
    fn test_nan_query_finds_nothing() {
        let tree = KdTree::new(&[Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0)]);
        assert_eq!(tree.nearest(&Vector3::new(f64::NAN, 0.0, 0.0)), None);
    }

    #[test]
    fn test_duplicate_points_resolve_to_lowest_index() {
        let pts = vec![Vector3::new(1.0, 1.0, 1.0); 5];
        let tree = KdTree::new(&pts);
        assert_eq!(tree.nearest(&Vector3::zeros()).map(|(i, _)| i), Some(0));
    }

    fn point() -> impl Strategy<Value = Vector3<f64>> {
        (-10.0f64..10.0, -10.0f64..10.0, -10.0f64..10.0).prop_map(|(x, y, z)| Vector3::new(x, y, z))
    }

    proptest! {
        #[test]
        fn prop_matches_brute_force(
            points in prop::collection::vec(point(), 1..200),
            queries in prop::collection::vec(point(), 1..20),
        ) {
            let tree = KdTree::new(&points);
            for q in &queries {
                let (i, d2) = tree.nearest(q).unwrap();
                let (bi, bd2) = brute_force(&points, q);
                prop_assert_eq!(d2, bd2);
                prop_assert_eq!(i, bi);
            }
        }

        #[test]
        fn prop_grid_points_with_ties(
            queries in prop::collection::vec(point(), 1..20),
        ) {
            let mut points = Vec::new();
            for x in -3..=3 {
                for y in -3..=3 {
                    for z in -3..=3 {
                        points.push(Vector3::new(x as f64 * 2.0, y as f64 * 2.0, z as f64 * 2.0));
                    }
                }
            }
            let tree = KdTree::new(&points);
            for q in &queries {
                let rounded = q.map(|c| c.round());
                let (i, _) = tree.nearest(&rounded).unwrap();
                let (bi, _) = brute_force(&points, &rounded);
                prop_assert_eq!(i, bi);
            }
        }
    }
}
