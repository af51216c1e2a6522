use std::collections::HashMap;

/// Flat additive mixer for named modulation sources.
///
/// Each source contributes a signed depth. The combined depth is the plain
/// sum of all contributions clamped into `[-1, 1]`, so opposite sources cancel
/// and many strong sources saturate.
#[derive(Debug, Clone, Default)]
pub struct ModulationMixer {
    sources: HashMap<String, f64>,
    depth: f64,
}

impl ModulationMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the contribution of `source`. Depths are stored as
    /// given and only the combined total is clamped. NaN depths are ignored.
    pub fn set(&mut self, source: impl Into<String>, depth: f64) -> bool {
        if depth.is_nan() {
            return false;
        }

        self.sources.insert(source.into(), depth);
        self.recompute();
        true
    }

    /// Removes the contribution of `source`, returning its previous depth.
    pub fn remove(&mut self, source: &str) -> Option<f64> {
        let removed = self.sources.remove(source);
        if removed.is_some() {
            self.recompute();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.sources.clear();
        self.depth = 0.0;
    }

    /// Combined, clamped depth in `[-1, 1]`.
    pub fn depth(&self) -> f64 {
        self.depth
    }

    pub fn source_depth(&self, source: &str) -> Option<f64> {
        self.sources.get(source).copied()
    }

    pub fn sources(&self) -> impl Iterator<Item = (&str, f64)> {
        self.sources
            .iter()
            .map(|(source, depth)| (source.as_str(), *depth))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn recompute(&mut self) {
        let total: f64 = self.sources.values().sum();
        // +inf and -inf sources sum to NaN.
        self.depth = if total.is_nan() {
            0.0
        } else {
            total.clamp(-1.0, 1.0)
        };
    }
}
