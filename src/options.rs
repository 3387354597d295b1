use crate::error::{PangeneError, Result};

/// Pangene construction options
#[derive(Debug, Clone)]
pub struct PangeneOpts {
    pub gene_sep: char,          // -d/--gene-sep
    pub min_vertex_ratio: f64,   // -p/--min-vertex-ratio
    pub max_shadow_overlap: f64, // --max-shadow-overlap
    pub threads: usize,          // -t/--threads
}

impl Default for PangeneOpts {
    fn default() -> Self {
        PangeneOpts {
            gene_sep: ':',
            min_vertex_ratio: 0.05,
            max_shadow_overlap: 0.5,
            threads: 8,
        }
    }
}

impl PangeneOpts {
    /// Reject values the graph builder cannot interpret
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_vertex_ratio) {
            return Err(PangeneError::InvalidOption(format!(
                "min vertex ratio must be in [0,1], got {}",
                self.min_vertex_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.max_shadow_overlap) {
            return Err(PangeneError::InvalidOption(format!(
                "max shadow overlap must be in [0,1], got {}",
                self.max_shadow_overlap
            )));
        }
        if self.threads == 0 {
            return Err(PangeneError::InvalidOption(
                "thread count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
