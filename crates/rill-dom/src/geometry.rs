//! Geometry APIs
//!
//! Scroll and client box metrics of an element. Layout is computed by the
//! host; the tree only stores what the host reported.

/// Element scroll geometry
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElementGeometry {
    /// Current vertical scroll offset
    pub scroll_top: f64,
    /// Full height of the content, including the overflowing part
    pub scroll_height: f64,
    /// Visible height (content + padding, no scrollbar)
    pub client_height: f64,
}

impl ElementGeometry {
    pub fn new(scroll_top: f64, scroll_height: f64, client_height: f64) -> Self {
        Self {
            scroll_top,
            scroll_height,
            client_height,
        }
    }

    /// Whether content overflows the box vertically
    pub fn overflows_y(&self) -> bool {
        self.scroll_height > self.client_height
    }

    /// Largest reachable scroll offset
    pub fn max_scroll_top(&self) -> f64 {
        (self.scroll_height - self.client_height).max(0.0)
    }

    /// Distance between the bottom of the visible box and the end of content
    pub fn distance_from_bottom(&self) -> f64 {
        self.scroll_height - (self.scroll_top + self.client_height)
    }

    /// Set the scroll offset, clamped to the scrollable range
    pub fn scroll_to(&mut self, top: f64) {
        self.scroll_top = top.clamp(0.0, self.max_scroll_top());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_and_distance() {
        let g = ElementGeometry::new(100.0, 500.0, 300.0);
        assert!(g.overflows_y());
        assert_eq!(g.max_scroll_top(), 200.0);
        assert_eq!(g.distance_from_bottom(), 100.0);
    }

    #[test]
    fn test_scroll_to_clamps() {
        let mut g = ElementGeometry::new(0.0, 500.0, 300.0);
        g.scroll_to(1000.0);
        assert_eq!(g.scroll_top, 200.0);
        g.scroll_to(-5.0);
        assert_eq!(g.scroll_top, 0.0);
    }

    #[test]
    fn test_no_overflow() {
        let g = ElementGeometry::new(0.0, 200.0, 300.0);
        assert!(!g.overflows_y());
        assert_eq!(g.max_scroll_top(), 0.0);
    }
}
