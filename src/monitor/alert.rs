//! Edge detection for attention alerts

/// Fires only on a false to true transition of the attention flag
#[derive(Debug, Default, Clone, Copy)]
pub struct AlertEdge {
    last: bool,
}

impl AlertEdge {
    /// Record the latest flag; returns `true` when an alert should fire
    pub fn observe(&mut self, needs_attention: bool) -> bool {
        let raised = needs_attention && !self.last;
        self.last = needs_attention;
        raised
    }

    pub fn current(&self) -> bool {
        self.last
    }
}
