use serde::{Deserialize, Serialize};

use crate::sys::geometry::Rect;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScreenId(pub usize);

impl ScreenId {
    pub fn new(id: usize) -> Self {
        ScreenId(id)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// A physical output as reported by the driver. The bar strip is reserved at
/// the top of the frame; tiling happens in what remains, minus outer gaps.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Screen {
    pub id: ScreenId,
    pub frame: Rect,
    pub bar_height: f64,
}

impl Screen {
    pub fn new(id: ScreenId, frame: Rect, bar_height: f64) -> Self {
        Self { id, frame, bar_height }
    }

    pub fn tiling_bounds(&self, gap: f64) -> Rect {
        self.frame.inset(self.bar_height + gap, gap, gap, gap)
    }

    pub fn bar_bounds(&self) -> Rect {
        Rect {
            origin: self.frame.origin,
            size: crate::sys::geometry::Size::new(self.frame.size.width, self.bar_height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiling_bounds_reserve_bar_and_gaps() {
        let screen = Screen::new(ScreenId::new(0), Rect::new(0.0, 0.0, 1920.0, 1080.0), 30.0);
        let bounds = screen.tiling_bounds(4.0);
        assert_eq!(bounds, Rect::new(4.0, 34.0, 1912.0, 1042.0));
        assert_eq!(screen.bar_bounds(), Rect::new(0.0, 0.0, 1920.0, 30.0));
    }
}
