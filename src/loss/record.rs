use std::fmt;

use serde::{Deserialize, Serialize};

/// Loss components of one epoch.
///
/// `payoff` and `complementarity` are only produced by the American put
/// objective. The training loop logs a record every `log_interval` epochs
/// and hands back the one from the final epoch.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LossRecord {
    /// 1-based epoch number; 0 until the training loop stamps it.
    pub epoch: usize,
    pub total: f64,
    pub terminal: f64,
    /// Sum of the lower and upper boundary terms.
    pub boundary: f64,
    pub pde: f64,
    pub payoff: Option<f64>,
    pub complementarity: Option<f64>,
}

impl LossRecord {
    pub fn is_finite(&self) -> bool {
        [self.total, self.terminal, self.boundary, self.pde]
            .into_iter()
            .chain(self.payoff)
            .chain(self.complementarity)
            .all(f64::is_finite)
    }
}

impl fmt::Display for LossRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Epoch {}: Loss={:.6}, Terminal={:.6}, Boundary={:.6}, PDE={:.6}",
            self.epoch, self.total, self.terminal, self.boundary, self.pde
        )?;
        if let Some(payoff) = self.payoff {
            write!(f, ", Payoff={payoff:.6}")?;
        }
        if let Some(comp) = self.complementarity {
            write!(f, ", Comp={comp:.6}")?;
        }
        Ok(())
    }
}
