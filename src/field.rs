use crate::config::MatchConfig;
use crate::rng::Rng;
use crate::types::{SafeZoneView, Vec2};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Field {
    pub width: f32,
    pub height: f32,
}

impl Field {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Keeps a circle of `radius` fully inside the field.
    pub fn clamp(&self, pos: Vec2, radius: f32) -> Vec2 {
        Vec2 {
            x: pos.x.max(radius).min(self.width - radius),
            y: pos.y.max(radius).min(self.height - radius),
        }
    }

    pub fn random_position(&self, rng: &mut Rng, margin: f32) -> Vec2 {
        Vec2 {
            x: rng.range_f32(margin, self.width - margin),
            y: rng.range_f32(margin, self.height - margin),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SafeZone {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub occupants: Vec<usize>,
}

impl SafeZone {
    pub fn contains(&self, pos: Vec2) -> bool {
        pos.x >= self.x
            && pos.x <= self.x + self.width
            && pos.y >= self.y
            && pos.y <= self.y + self.height
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Pushes a circle out past the nearest edge along the dominant axis
    /// from the zone centre. The result is strictly outside the rectangle.
    pub fn eject(&self, pos: Vec2, radius: f32) -> Vec2 {
        let center = self.center();
        let dx = pos.x - center.x;
        let dy = pos.y - center.y;
        if dx.abs() > dy.abs() {
            let x = if dx > 0.0 {
                self.x + self.width + radius
            } else {
                self.x - radius
            };
            Vec2::new(x, pos.y)
        } else {
            let y = if dy > 0.0 {
                self.y + self.height + radius
            } else {
                self.y - radius
            };
            Vec2::new(pos.x, y)
        }
    }

    pub fn to_view(&self) -> SafeZoneView {
        SafeZoneView {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            occupants: self.occupants.clone(),
        }
    }
}

/// Fixed two-column layout: zones alternate between the near and far inset
/// horizontally, and fill rows top to bottom.
pub fn build_safe_zones(config: &MatchConfig) -> Vec<SafeZone> {
    let zones = &config.safe_zones;
    let far_x = config.field_width - zones.far_margin;
    let far_y = config.field_height - zones.far_margin;
    (0..zones.count)
        .map(|i| SafeZone {
            x: zones.inset + (i % 2) as f32 * far_x,
            y: zones.inset + (i / 2) as f32 * far_y,
            width: zones.size,
            height: zones.size,
            occupants: Vec::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> SafeZone {
        SafeZone {
            x: 100.0,
            y: 100.0,
            width: 80.0,
            height: 80.0,
            occupants: Vec::new(),
        }
    }

    #[test]
    fn default_layout_matches_corner_positions() {
        let zones = build_safe_zones(&MatchConfig::default());
        let corners: Vec<(f32, f32)> = zones.iter().map(|z| (z.x, z.y)).collect();
        assert_eq!(
            corners,
            vec![(100.0, 100.0), (650.0, 100.0), (100.0, 450.0), (650.0, 450.0)]
        );
        assert!(zones.iter().all(|z| z.width == 80.0 && z.height == 80.0));
    }

    #[test]
    fn containment_is_inclusive_and_uses_height() {
        let mut tall = zone();
        tall.height = 200.0;
        assert!(tall.contains(Vec2::new(100.0, 100.0)));
        assert!(tall.contains(Vec2::new(180.0, 290.0)));
        assert!(!tall.contains(Vec2::new(181.0, 150.0)));
    }

    #[test]
    fn eject_uses_dominant_axis() {
        let z = zone();
        let right = z.eject(Vec2::new(175.0, 142.0), 20.0);
        assert_eq!(right, Vec2::new(200.0, 142.0));
        assert!(!z.contains(right));

        let up = z.eject(Vec2::new(141.0, 101.0), 20.0);
        assert_eq!(up, Vec2::new(141.0, 80.0));
        assert!(!z.contains(up));

        let left = z.eject(Vec2::new(101.0, 139.0), 20.0);
        assert_eq!(left, Vec2::new(80.0, 139.0));
    }

    #[test]
    fn eject_from_exact_center_moves_up() {
        let z = zone();
        let out = z.eject(z.center(), 20.0);
        assert_eq!(out, Vec2::new(140.0, 80.0));
        assert!(!z.contains(out));
    }

    #[test]
    fn ejection_never_lands_in_another_zone() {
        let mut tight = MatchConfig::default();
        tight.safe_zones.far_margin = tight.field_width - 125.0;
        tight.safe_zones.count = 2;

        for config in [MatchConfig::default(), tight] {
            config.validate().expect("layout should be valid");
            let field = Field::new(config.field_width, config.field_height);
            let radius = config.agent_radius;
            let zones = build_safe_zones(&config);
            for (index, zone) in zones.iter().enumerate() {
                for step_x in 0..=8 {
                    for step_y in 0..=8 {
                        let pos = Vec2::new(
                            zone.x + zone.width * step_x as f32 / 8.0,
                            zone.y + zone.height * step_y as f32 / 8.0,
                        );
                        let out = zone.eject(pos, radius);
                        assert_eq!(field.clamp(out, radius), out, "zone {index} from {pos:?}");
                        for (other_index, other) in zones.iter().enumerate() {
                            assert!(
                                !other.contains(out),
                                "zone {index} ejected {pos:?} into zone {other_index}"
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn clamp_keeps_full_radius_inside() {
        let field = Field::new(800.0, 600.0);
        assert_eq!(field.clamp(Vec2::new(-5.0, 900.0), 20.0), Vec2::new(20.0, 580.0));
        assert_eq!(field.clamp(Vec2::new(400.0, 300.0), 20.0), Vec2::new(400.0, 300.0));
    }
}
