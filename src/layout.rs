use glam::{Mat4, Vec3};
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BarMode {
    /// Unit quads facing the viewer.
    #[default]
    Flat,
    /// Unit cubes under a tilted view.
    Cube,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as f32,
            height: height as f32,
        }
    }

    /// Pixel-space orthographic projection with the origin at the centre.
    pub fn projection(&self) -> Mat4 {
        let half_w = self.width * 0.5;
        let half_h = self.height * 0.5;
        let depth = self.width.max(self.height);
        Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, -depth, depth)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BarStyle {
    pub mode: BarMode,
    pub base_height: f32,
    pub gain: f32,
    /// Headroom kept between the tallest bar and the top of the viewport.
    pub margin: f32,
    /// Cube depth as a multiple of bar thickness.
    pub depth: f32,
    pub color: [f32; 4],
}

impl Default for BarStyle {
    fn default() -> Self {
        Self {
            mode: BarMode::Flat,
            base_height: 2.0,
            gain: 1.0,
            margin: 20.0,
            depth: 1.0,
            color: [1.0, 0.35, 0.1, 1.0],
        }
    }
}

/// Stack of model-view matrices. The bottom entry is the base view and is never popped.
#[derive(Clone, Debug)]
pub struct TransformStack {
    stack: Vec<Mat4>,
}

impl TransformStack {
    pub fn new(base: Mat4) -> Self {
        Self { stack: vec![base] }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn top(&self) -> &Mat4 {
        &self.stack[self.stack.len() - 1]
    }

    pub fn top_mut(&mut self) -> &mut Mat4 {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    /// Duplicates the top entry.
    pub fn push(&mut self) {
        let top = *self.top();
        self.stack.push(top);
    }

    pub fn pop(&mut self) -> Option<Mat4> {
        if self.stack.len() > 1 {
            self.stack.pop()
        } else {
            None
        }
    }

    pub fn multiply(&mut self, m: Mat4) {
        let top = self.top_mut();
        *top *= m;
    }

    pub fn translate(&mut self, v: Vec3) {
        self.multiply(Mat4::from_translation(v));
    }

    pub fn scale(&mut self, v: Vec3) {
        self.multiply(Mat4::from_scale(v));
    }
}

/// Maps bin magnitudes to bar transforms for a shared unit mesh.
///
/// Bar thickness comes from the full transform size even though only half the
/// bins are drawn; bars sit two thicknesses apart, leaving a gap between each.
#[derive(Clone, Debug)]
pub struct BarLayout {
    fft_size: usize,
    viewport: Viewport,
    style: BarStyle,
}

impl BarLayout {
    pub fn new(fft_size: usize, viewport: Viewport, style: BarStyle) -> Self {
        Self {
            fft_size,
            viewport,
            style,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn thickness(&self) -> f32 {
        self.viewport.width / self.fft_size as f32
    }

    /// Centre of bar `index`.
    pub fn bar_x(&self, index: usize) -> f32 {
        let t = self.thickness();
        -self.viewport.width * 0.5 + t + 2.0 * t * index as f32
    }

    pub fn bar_height(&self, magnitude: f32) -> f32 {
        let max = (self.viewport.height - self.style.margin).max(0.0);
        (self.style.base_height + self.style.gain * magnitude).min(max)
    }

    /// View shared by every bar of a frame.
    pub fn base_view(&self) -> Mat4 {
        match self.style.mode {
            BarMode::Flat => Mat4::IDENTITY,
            BarMode::Cube => {
                Mat4::from_scale(Vec3::splat(0.85))
                    * Mat4::from_rotation_x(0.35)
                    * Mat4::from_rotation_y(-0.3)
            }
        }
    }

    /// Bar transform relative to the base view: move to the bar's slot on the
    /// floor, scale to its size, then lift the centred unit mesh onto the floor.
    /// `index` must be below `bin_count` for the bar to land inside the viewport.
    pub fn compute_bar_transform(&self, index: usize, bin_count: usize, magnitude: f32) -> Mat4 {
        debug_assert!(index < bin_count, "bar {} outside {} bins", index, bin_count);
        let t = self.thickness();
        let floor = -self.viewport.height * 0.5;
        let depth = match self.style.mode {
            BarMode::Flat => 1.0,
            BarMode::Cube => t * self.style.depth,
        };

        Mat4::from_translation(Vec3::new(self.bar_x(index), floor, 0.0))
            * Mat4::from_scale(Vec3::new(t, self.bar_height(magnitude), depth))
            * Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0))
    }

    /// Configured colour, dimming towards the high end of the spectrum.
    pub fn bar_color(&self, index: usize, bin_count: usize) -> [f32; 4] {
        let [r, g, b, a] = self.style.color;
        let fade = 1.0 - 0.5 * index as f32 / bin_count.max(1) as f32;
        [r * fade, g * fade, b * fade, a]
    }

    /// Lays out one bar per magnitude, handing each composed transform to `draw`.
    /// Every bar is pushed and popped, so the stack depth is unchanged on return.
    pub fn layout_bars<I, F>(&self, stack: &mut TransformStack, magnitudes: I, mut draw: F) -> usize
    where
        I: IntoIterator<Item = f32>,
        F: FnMut(&Mat4, [f32; 4]),
    {
        let bin_count = self.bin_count();
        let mut drawn = 0;
        for (index, magnitude) in magnitudes.into_iter().take(bin_count).enumerate() {
            stack.push();
            stack.multiply(self.compute_bar_transform(index, bin_count, magnitude));
            draw(stack.top(), self.bar_color(index, bin_count));
            stack.pop();
            drawn += 1;
        }
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(mode: BarMode) -> BarLayout {
        BarLayout::new(
            256,
            Viewport::new(800, 600),
            BarStyle {
                mode,
                ..BarStyle::default()
            },
        )
    }

    #[test]
    fn test_thickness_uses_full_fft_size() {
        let l = layout(BarMode::Flat);
        assert_eq!(l.thickness(), 800.0 / 256.0);
        assert_eq!(l.bin_count(), 128);
    }

    #[test]
    fn test_bars_are_spaced_two_thicknesses_apart() {
        let l = layout(BarMode::Flat);
        let t = l.thickness();
        assert!((l.bar_x(0) - (-400.0 + t)).abs() < 1e-4);
        assert!((l.bar_x(1) - l.bar_x(0) - 2.0 * t).abs() < 1e-4);
        // Last bar ends exactly at the right edge
        assert!((l.bar_x(127) + t * 0.5 - (400.0 - t * 0.5)).abs() < 1e-3);
    }

    #[test]
    fn test_height_is_clamped_below_viewport() {
        let l = layout(BarMode::Flat);
        assert_eq!(l.bar_height(0.0), 2.0);
        assert_eq!(l.bar_height(10.0), 12.0);
        assert_eq!(l.bar_height(1.0e6), 580.0);
    }

    #[test]
    fn test_bar_transform_sits_on_floor() {
        let l = layout(BarMode::Flat);
        let m = l.compute_bar_transform(3, l.bin_count(), 40.0);
        let bottom = m.transform_point3(Vec3::new(0.0, -0.5, 0.0));
        let top = m.transform_point3(Vec3::new(0.0, 0.5, 0.0));
        assert!((bottom.y + 300.0).abs() < 1e-3);
        assert!((top.y - bottom.y - 42.0).abs() < 1e-3);
        assert!((bottom.x - l.bar_x(3)).abs() < 1e-3);
    }

    #[test]
    fn test_stack_depth_restored_after_layout() {
        for mode in [BarMode::Flat, BarMode::Cube] {
            let l = layout(mode);
            let mut stack = TransformStack::new(l.base_view());
            stack.push();
            let before = stack.depth();
            let mut seen = Vec::new();
            let drawn = l.layout_bars(&mut stack, (0..200).map(|i| i as f32), |m, _| {
                seen.push(*m)
            });
            assert_eq!(drawn, 128);
            assert_eq!(stack.depth(), before);
            assert_eq!(*stack.top(), l.base_view());
            // Each bar composes onto the same base
            assert_eq!(seen[5], l.base_view() * l.compute_bar_transform(5, 128, 5.0));
        }
    }

    #[test]
    fn test_last_bin_reaches_right_edge() {
        let l = layout(BarMode::Flat);
        let bins = l.bin_count();
        let m = l.compute_bar_transform(bins - 1, bins, 0.0);
        let right = m.transform_point3(Vec3::new(0.5, 0.0, 0.0));
        assert!((right.x - (400.0 - 0.5 * l.thickness())).abs() < 1e-3);
    }

    #[test]
    fn test_base_is_never_popped() {
        let mut stack = TransformStack::new(Mat4::IDENTITY);
        assert_eq!(stack.pop(), None);
        stack.push();
        stack.translate(Vec3::X);
        assert_eq!(stack.pop(), Some(Mat4::from_translation(Vec3::X)));
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_color_fades_with_bin() {
        let l = layout(BarMode::Flat);
        let low = l.bar_color(0, 128);
        let high = l.bar_color(127, 128);
        assert_eq!(low, BarStyle::default().color);
        assert!(high[0] < low[0]);
        assert_eq!(high[3], low[3]);
    }
}
