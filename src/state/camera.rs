use bloons_revenge::model::Vec2;

/// Top-down view of the ground plane. World x maps to screen x, world z to screen y.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Pixels per world unit.
    pub zoom: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}
impl Default for Camera {
    fn default() -> Self {
        Self { zoom: 20.0, offset_x: 0.0, offset_y: 0.0 }
    }
}

impl Camera {
    pub fn world_to_screen(&self, p: Vec2) -> (f64, f64) {
        (p.x * self.zoom + self.offset_x, p.z * self.zoom + self.offset_y)
    }

    pub fn screen_to_world(&self, sx: f64, sy: f64) -> Vec2 {
        Vec2::new((sx - self.offset_x) / self.zoom, (sy - self.offset_y) / self.zoom)
    }

    /// Fits the square `[min, max]` into a `width × height` canvas with a small margin.
    pub fn fit(&mut self, min: Vec2, max: Vec2, width: f64, height: f64) {
        let span_x = (max.x - min.x).max(1.0);
        let span_z = (max.z - min.z).max(1.0);
        self.zoom = (width / span_x).min(height / span_z) * 0.9;
        let cx = (min.x + max.x) * 0.5;
        let cz = (min.z + max.z) * 0.5;
        self.offset_x = width * 0.5 - cx * self.zoom;
        self.offset_y = height * 0.5 - cz * self.zoom;
    }

    /// Zooms around a fixed screen point.
    pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
        let anchor = self.screen_to_world(sx, sy);
        self.zoom = (self.zoom * factor).clamp(4.0, 120.0);
        self.offset_x = sx - anchor.x * self.zoom;
        self.offset_y = sy - anchor.z * self.zoom;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_centres_the_field_and_round_trips() {
        let mut cam = Camera::default();
        cam.fit(Vec2::new(-14.0, -14.0), Vec2::new(14.0, 14.0), 800.0, 600.0);
        let (sx, sy) = cam.world_to_screen(Vec2::new(0.0, 0.0));
        assert!((sx - 400.0).abs() < 1e-9 && (sy - 300.0).abs() < 1e-9);
        let back = cam.screen_to_world(123.0, 456.0);
        let (rx, ry) = cam.world_to_screen(back);
        assert!((rx - 123.0).abs() < 1e-9 && (ry - 456.0).abs() < 1e-9);
    }

    #[test]
    fn zoom_keeps_the_anchor_in_place() {
        let mut cam = Camera::default();
        let before = cam.screen_to_world(200.0, 150.0);
        cam.zoom_at(200.0, 150.0, 1.5);
        let after = cam.screen_to_world(200.0, 150.0);
        assert!(before.distance(after) < 1e-9);
    }
}
