/// Knobs of the acceleration build.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    max_leaf_triangles: usize,
    sah_bins: usize,
}

impl Config {
    /// Primitives with at most this many triangles (and BVH nodes covering
    /// at most this many) are stored as a single leaf.
    pub fn with_max_leaf_triangles(
        mut self,
        max_leaf_triangles: usize,
    ) -> Self {
        assert!(max_leaf_triangles > 0);

        self.max_leaf_triangles = max_leaf_triangles;
        self
    }

    /// Number of bins the surface area heuristic evaluates per axis.
    pub fn with_sah_bins(mut self, sah_bins: usize) -> Self {
        assert!(sah_bins >= 2);

        self.sah_bins = sah_bins;
        self
    }

    pub fn max_leaf_triangles(&self) -> usize {
        self.max_leaf_triangles
    }

    pub fn sah_bins(&self) -> usize {
        self.sah_bins
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_leaf_triangles: 4,
            sah_bins: 12,
        }
    }
}
