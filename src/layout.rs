//! Screen layout classification and region mapping.
//!
//! The results screen repeats horizontally: one column of stat boxes per
//! player, shifted by a fixed per-layout offset. Boxes are calibrated against
//! a small set of known base resolutions; anything else falls back to the
//! highest-resolution layout with per-axis scaling.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pixel tolerance when matching image dimensions against a base resolution.
pub const RESOLUTION_TOLERANCE: u32 = 5;

/// The semantic type of a screen region. Determines the OCR whitelist and
/// the cleaning rule applied to the recognized text.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum FieldKind {
    Name,
    Kills,
    ShotsFired,
    ShotsHit,
    Deaths,
    Accuracy,
    MeleeKills,
}

impl FieldKind {
    /// All fields, in extraction order.
    pub const ALL: [FieldKind; 7] = [
        FieldKind::Name,
        FieldKind::Kills,
        FieldKind::ShotsFired,
        FieldKind::ShotsHit,
        FieldKind::Deaths,
        FieldKind::Accuracy,
        FieldKind::MeleeKills,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FieldKind::Name => "Name",
            FieldKind::Kills => "Kills",
            FieldKind::ShotsFired => "Shots Fired",
            FieldKind::ShotsHit => "Shots Hit",
            FieldKind::Deaths => "Deaths",
            FieldKind::Accuracy => "Accuracy",
            FieldKind::MeleeKills => "Melee Kills",
        }
    }
}

/// A bounding box in base-resolution coordinates, before player offset and
/// scaling are applied. Signed so that clamping to ≥0 is explicit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl BaseBox {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }
}

/// A final bounding box in actual-image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl PixelRect {
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }
}

/// A known screen layout: base resolution, per-field boxes for the first
/// player column, and the horizontal shift between player columns.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayoutClass {
    pub base_width: u32,
    pub base_height: u32,
    /// Horizontal shift added per additional player column. Vertical
    /// positions never shift.
    pub player_offset: i32,
    pub boxes: BTreeMap<FieldKind, BaseBox>,
}

impl LayoutClass {
    /// Whether the given image dimensions are close enough to this layout's
    /// base resolution.
    pub fn matches(&self, width: u32, height: u32) -> bool {
        width.abs_diff(self.base_width) <= RESOLUTION_TOLERANCE
            && height.abs_diff(self.base_height) <= RESOLUTION_TOLERANCE
    }
}

/// Outcome of classifying an image against the known layouts.
#[derive(Clone, Copy, Debug)]
pub struct ResolutionMatch<'a> {
    pub class: &'a LayoutClass,
    pub scale_x: f32,
    pub scale_y: f32,
    /// True when no layout was close enough and the default was scaled.
    pub fallback: bool,
}

/// Picks the first layout whose base resolution is within tolerance of the
/// image, or falls back to the highest-resolution layout with per-axis
/// scaling. Returns `None` only when no layouts are configured.
pub fn classify(classes: &[LayoutClass], width: u32, height: u32) -> Option<ResolutionMatch<'_>> {
    let (class, fallback) = match classes.iter().find(|c| c.matches(width, height)) {
        Some(class) => (class, false),
        None => {
            let class = classes
                .iter()
                .max_by_key(|c| u64::from(c.base_width) * u64::from(c.base_height))?;
            log::warn!(
                "image is {}x{}, no close layout; scaling from {}x{} boxes",
                width,
                height,
                class.base_width,
                class.base_height
            );
            (class, true)
        }
    };

    Some(ResolutionMatch {
        class,
        scale_x: width as f32 / class.base_width as f32,
        scale_y: height as f32 / class.base_height as f32,
        fallback,
    })
}

/// Final region boxes for every configured player column and field.
/// Computed once per image and discarded after extraction.
#[derive(Clone, Debug, Default)]
pub struct RegionSet {
    regions: BTreeMap<(usize, FieldKind), PixelRect>,
}

impl RegionSet {
    pub fn get(&self, player: usize, field: FieldKind) -> Option<&PixelRect> {
        self.regions.get(&(player, field))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(usize, FieldKind), &PixelRect)> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Applies per-player horizontal offset, clamps to ≥0, then scales to the
/// actual image resolution, truncating to integer pixels.
pub fn map_regions(resolution: &ResolutionMatch<'_>, num_players: usize) -> RegionSet {
    let class = resolution.class;
    let mut regions = BTreeMap::new();

    for player in 0..num_players {
        let shift = player as i32 * class.player_offset;
        for (&field, base) in &class.boxes {
            let left = (base.left + shift).max(0);
            let right = (base.right + shift).max(0);
            let top = base.top.max(0);
            let bottom = base.bottom.max(0);

            let rect = PixelRect {
                left: (left as f32 * resolution.scale_x) as u32,
                top: (top as f32 * resolution.scale_y) as u32,
                right: (right as f32 * resolution.scale_x) as u32,
                bottom: (bottom as f32 * resolution.scale_y) as u32,
            };
            log::debug!("P{} {} -> {:?}", player + 1, field.label(), rect);
            regions.insert((player, field), rect);
        }
    }

    RegionSet { regions }
}

/// Draws every region box onto a copy of the image. Calibration aid only.
pub fn draw_region_overlay(image: &RgbaImage, regions: &RegionSet) -> RgbaImage {
    const BORDER: Rgba<u8> = Rgba([255, 0, 0, 255]);
    let mut out = image.clone();
    let (w, h) = out.dimensions();

    for (_, rect) in regions.iter() {
        for x in rect.left..rect.right.min(w) {
            for y in [rect.top, rect.bottom.saturating_sub(1)] {
                if y < h {
                    out.put_pixel(x, y, BORDER);
                }
            }
        }
        for y in rect.top..rect.bottom.min(h) {
            for x in [rect.left, rect.right.saturating_sub(1)] {
                if x < w {
                    out.put_pixel(x, y, BORDER);
                }
            }
        }
    }

    out
}

/// The layouts this tool ships with, calibrated against 1280×800 and
/// 1920×1080 captures of the results screen.
pub fn default_classes() -> Vec<LayoutClass> {
    vec![
        LayoutClass {
            base_width: 1280,
            base_height: 800,
            player_offset: 305,
            boxes: BTreeMap::from([
                (FieldKind::Name, BaseBox::new(87, 133, 262, 152)),
                (FieldKind::Kills, BaseBox::new(229, 225, 293, 247)),
                (FieldKind::Accuracy, BaseBox::new(229, 259, 293, 278)),
                (FieldKind::ShotsFired, BaseBox::new(229, 291, 293, 311)),
                (FieldKind::ShotsHit, BaseBox::new(229, 322, 293, 346)),
                (FieldKind::Deaths, BaseBox::new(250, 352, 293, 376)),
                (FieldKind::MeleeKills, BaseBox::new(250, 382, 293, 404)),
            ]),
        },
        LayoutClass {
            base_width: 1920,
            base_height: 1080,
            player_offset: 460,
            boxes: BTreeMap::from([
                (FieldKind::Name, BaseBox::new(130, 200, 360, 230)),
                (FieldKind::Kills, BaseBox::new(340, 338, 450, 375)),
                (FieldKind::Accuracy, BaseBox::new(340, 386, 450, 420)),
                (FieldKind::ShotsFired, BaseBox::new(340, 435, 450, 470)),
                (FieldKind::ShotsHit, BaseBox::new(340, 483, 449, 518)),
                (FieldKind::Deaths, BaseBox::new(375, 528, 450, 566)),
                (FieldKind::MeleeKills, BaseBox::new(375, 574, 450, 610)),
            ]),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_base_resolution_selects_class_without_scaling() {
        let classes = default_classes();
        let m = classify(&classes, 1920, 1080).unwrap();
        assert_eq!(m.class.base_width, 1920);
        assert!(!m.fallback);
        assert_eq!(m.scale_x, 1.0);
        assert_eq!(m.scale_y, 1.0);
    }

    #[test]
    fn test_within_tolerance_selects_class() {
        let classes = default_classes();

        let m = classify(&classes, 1923, 1077).unwrap();
        assert_eq!(m.class.base_width, 1920);
        assert!(!m.fallback);

        let m = classify(&classes, 1277, 803).unwrap();
        assert_eq!(m.class.base_width, 1280);
        assert!(!m.fallback);
    }

    #[test]
    fn test_unknown_resolution_falls_back_scaled() {
        let classes = default_classes();
        let m = classify(&classes, 3840, 2160).unwrap();
        assert_eq!(m.class.base_width, 1920);
        assert!(m.fallback);
        assert_eq!(m.scale_x, 2.0);
        assert_eq!(m.scale_y, 2.0);
    }

    #[test]
    fn test_classify_empty_layouts_is_none() {
        assert!(classify(&[], 1920, 1080).is_none());
    }

    #[test]
    fn test_all_region_boxes_are_well_formed() {
        let classes = default_classes();
        for (w, h) in [(1280, 800), (1920, 1080), (3840, 2160), (2560, 1440)] {
            let m = classify(&classes, w, h).unwrap();
            let regions = map_regions(&m, 4);
            assert_eq!(regions.len(), 4 * FieldKind::ALL.len());
            for (&(player, field), rect) in regions.iter() {
                assert!(
                    rect.left < rect.right && rect.top < rect.bottom,
                    "degenerate box for P{} {:?} at {}x{}: {:?}",
                    player + 1,
                    field,
                    w,
                    h,
                    rect
                );
            }
        }
    }

    #[test]
    fn test_player_offset_shifts_horizontally_only() {
        let classes = default_classes();
        let m = classify(&classes, 1920, 1080).unwrap();
        let regions = map_regions(&m, 2);

        let p1 = regions.get(0, FieldKind::Kills).unwrap();
        let p2 = regions.get(1, FieldKind::Kills).unwrap();
        assert_eq!(p2.left, p1.left + 460);
        assert_eq!(p2.right, p1.right + 460);
        assert_eq!(p2.top, p1.top);
        assert_eq!(p2.bottom, p1.bottom);
    }

    #[test]
    fn test_negative_base_coordinates_clamp_to_zero() {
        let classes = vec![LayoutClass {
            base_width: 100,
            base_height: 100,
            player_offset: 0,
            boxes: BTreeMap::from([(FieldKind::Name, BaseBox::new(-10, -5, 20, 15))]),
        }];
        let m = classify(&classes, 100, 100).unwrap();
        let regions = map_regions(&m, 1);
        let rect = regions.get(0, FieldKind::Name).unwrap();
        assert_eq!(rect.left, 0);
        assert_eq!(rect.top, 0);
    }

    #[test]
    fn test_fallback_scales_boxes() {
        let classes = default_classes();
        let m = classify(&classes, 3840, 2160).unwrap();
        let regions = map_regions(&m, 1);
        let rect = regions.get(0, FieldKind::Name).unwrap();
        // 1920x1080 Name box doubled
        assert_eq!(rect.left, 260);
        assert_eq!(rect.top, 400);
        assert_eq!(rect.right, 720);
        assert_eq!(rect.bottom, 460);
    }

    #[test]
    fn test_overlay_matches_image_dimensions() {
        let classes = default_classes();
        let m = classify(&classes, 1280, 800).unwrap();
        let regions = map_regions(&m, 2);
        let img = RgbaImage::new(1280, 800);
        let overlay = draw_region_overlay(&img, &regions);
        assert_eq!(overlay.dimensions(), (1280, 800));
        let name = regions.get(0, FieldKind::Name).unwrap();
        assert_eq!(overlay.get_pixel(name.left, name.top)[0], 255);
    }
}
