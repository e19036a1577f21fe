//! Nearest-neighbour transport between two spherical parameterizations.

use nalgebra::Vector3;
use ndarray::Array2;
use sprs::{CsMat, TriMat};
use tracing::debug;

use super::kdtree::KdTree;

/// Sparse transport operator, shape `(n_source, n_target)`, CSC layout.
///
/// Each target column holds non-negative weights summing to 1. A row
/// vector of source-vertex values times this matrix gives target values.
#[derive(Debug, Clone)]
pub struct MeshCorrespondence {
    matrix: CsMat<f64>,
}

impl MeshCorrespondence {
    pub fn n_source(&self) -> usize {
        self.matrix.rows()
    }

    pub fn n_target(&self) -> usize {
        self.matrix.cols()
    }

    pub fn matrix(&self) -> &CsMat<f64> {
        &self.matrix
    }

    /// Weight from `source` to `target`, zero when absent.
    pub fn weight(&self, source: usize, target: usize) -> f64 {
        self.matrix.get(source, target).copied().unwrap_or(0.0)
    }

    /// Sum of weights in every target column.
    pub fn column_sums(&self) -> Vec<f64> {
        self.matrix
            .outer_iterator()
            .map(|col| col.iter().map(|(_, &w)| w).sum())
            .collect()
    }

    /// Number of target columns each source vertex contributes to.
    pub fn source_coverage(&self) -> Vec<usize> {
        let mut hits = vec![0usize; self.n_source()];
        for col in self.matrix.outer_iterator() {
            for (row, _) in col.iter() {
                hits[row] += 1;
            }
        }
        hits
    }

    /// Right-multiply `(rows, n_source)` data into `(rows, n_target)`.
    ///
    /// Only stored entries are visited, so a NaN in a source column that
    /// carries no weight to a target never reaches it.
    ///
    /// # Panics
    /// If `data` does not have `n_source` columns.
    pub fn transport(&self, data: &Array2<f64>) -> Array2<f64> {
        assert_eq!(data.ncols(), self.n_source(), "data columns must match source vertices");
        let mut out = Array2::zeros((data.nrows(), self.n_target()));
        for (target, col) in self.matrix.outer_iterator().enumerate() {
            let mut dst = out.column_mut(target);
            for (source, &w) in col.iter() {
                dst.scaled_add(w, &data.column(source));
            }
        }
        out
    }
}

/// Build the transport from `source` vertices onto `target` vertices.
///
/// Every target takes weight 1 from its nearest source vertex. With
/// `reverse`, every source vertex no target picked adds weight 1 at its own
/// nearest target, so no source data is dropped. Repeated pairs accumulate.
/// Columns are finally scaled to unit sum.
///
/// # Panics
/// If `source` is empty while `target` is not.
pub fn mesh_correspondence(
    source: &[Vector3<f64>],
    target: &[Vector3<f64>],
    reverse: bool,
) -> MeshCorrespondence {
    let shape = (source.len(), target.len());
    let source_tree = KdTree::new(source);

    let forward: Vec<usize> = target
        .iter()
        .map(|t| match source_tree.nearest(t) {
            Some((s, _)) => s,
            None => panic!("cannot map {} target vertices from an empty source", target.len()),
        })
        .collect();

    let mut triplets = TriMat::new(shape);
    for (t, &s) in forward.iter().enumerate() {
        triplets.add_triplet(s, t, 1.0);
    }

    if reverse && !target.is_empty() {
        let mut hits = vec![0usize; source.len()];
        for &s in &forward {
            hits[s] += 1;
        }
        let target_tree = KdTree::new(target);
        let mut added = 0usize;
        for (s, point) in source.iter().enumerate().filter(|(s, _)| hits[*s] == 0) {
            if let Some((t, _)) = target_tree.nearest(point) {
                triplets.add_triplet(s, t, 1.0);
                added += 1;
            }
        }
        debug!(unmatched_sources = added, "reverse correspondence pass");
    }

    let summed: CsMat<f64> = triplets.to_csc();
    let mut indptr = Vec::with_capacity(shape.1 + 1);
    let mut indices = Vec::with_capacity(summed.nnz());
    let mut data = Vec::with_capacity(summed.nnz());
    indptr.push(0);
    for col in summed.outer_iterator() {
        let mass: f64 = col.iter().map(|(_, &w)| w).sum();
        for (row, &w) in col.iter() {
            indices.push(row);
            data.push(w / mass);
        }
        indptr.push(indices.len());
    }

    MeshCorrespondence {
        matrix: CsMat::new_csc(shape, indptr, indices, data),
    }
}
