//! The display seam. The core never renders; it only tells a display when a
//! scanline and when a frame has finished, and nothing flows back in.

/// A display collaborator. Implementors receive the two lifecycle signals
/// and draw (or count, or discard) however they like.
pub trait Screen {
    /// A horizontal line has finished.
    fn line_complete(&mut self);

    /// The vertical blank has finished; the next frame starts at the top.
    fn frame_complete(&mut self);
}

/// Keeps the pixel and line counters a renderer needs: `x` advances per
/// pixel, a finished line resets `x` and bumps `y`, and a finished frame
/// resets both.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanlineTracker {
    x: u8,
    y: u8,
}

impl ScanlineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the horizontal pixel counter.
    pub fn advance(&mut self) {
        self.x = self.x.wrapping_add(1);
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }
}

impl Screen for ScanlineTracker {
    fn line_complete(&mut self) {
        self.x = 0;
        self.y = self.y.wrapping_add(1);
    }

    fn frame_complete(&mut self) {
        self.x = 0;
        self.y = 0;
    }
}
