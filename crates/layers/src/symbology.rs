#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OverlayStyle {
    pub stroke_color: [f32; 4],
    pub fill_color: [f32; 4],
    pub stroke_width_px: f32,
    pub point_radius_px: f32,
}

impl OverlayStyle {
    pub const fn new(stroke_color: [f32; 4], fill_color: [f32; 4], stroke_width_px: f32) -> Self {
        Self {
            stroke_color,
            fill_color,
            stroke_width_px,
            point_radius_px: 6.0,
        }
    }
}

impl Default for OverlayStyle {
    fn default() -> Self {
        // Survey orange outline over a translucent fill.
        Self::new([1.0, 0.45, 0.1, 1.0], [1.0, 0.45, 0.1, 0.2], 2.0)
    }
}

/// `rgba(r, g, b, a)` for canvas and CSS.
pub fn css_rgba(color: [f32; 4]) -> String {
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    format!(
        "rgba({}, {}, {}, {})",
        channel(color[0]),
        channel(color[1]),
        channel(color[2]),
        color[3].clamp(0.0, 1.0)
    )
}

#[cfg(test)]
mod tests {
    use super::{OverlayStyle, css_rgba};

    #[test]
    fn css_colors() {
        assert_eq!(css_rgba([1.0, 0.0, 0.5, 0.25]), "rgba(255, 0, 128, 0.25)");
        assert_eq!(css_rgba([2.0, -1.0, 0.0, 1.0]), "rgba(255, 0, 0, 1)");
        assert_eq!(OverlayStyle::default().point_radius_px, 6.0);
    }
}
