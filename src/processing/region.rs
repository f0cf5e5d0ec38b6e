use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};

use crate::models::{BoundingBox, LineCriteria, LocatorConfig, MrzBitmap, MrzRegion, RegionResult};
use crate::processing::image::ImageProcessor;

/// Finds the MRZ band near the bottom of a document photo.
///
/// Dark glyphs are isolated with a blackhat transform, their vertical
/// edges picked up with a horizontal Scharr gradient, and a closing with
/// the same wide rectangle fuses each text line into one solid blob. The
/// two lowest wide blobs in the bottom half are taken as the two TD3 lines.
pub struct RegionLocator {
    config: LocatorConfig,
}

impl RegionLocator {
    pub fn new(config: LocatorConfig) -> Self {
        RegionLocator { config }
    }

    pub fn locate(&self, gray: &GrayImage) -> RegionResult {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return RegionResult::NotFound;
        }

        let mask = self.line_mask(gray);
        let mut boxes = Self::external_boxes(&mask);
        // MRZ sits at the bottom edge: lowest first
        boxes.sort_by(|a, b| b.y.cmp(&a.y));
        log::debug!("Found {} contours in {}x{} image", boxes.len(), width, height);

        let lines = match self.select_lines(&boxes, width, height) {
            Some(lines) => lines,
            None => {
                log::debug!("No MRZ lines matched any relaxation tier");
                return RegionResult::NotFound;
            }
        };

        let mrz_box = match lines.as_slice() {
            [first, second, ..] => first.union(second),
            [single] => *single,
            [] => return RegionResult::NotFound,
        };

        let pad_x = (mrz_box.w as f64 * self.config.pad_width_fraction) as u32;
        let pad_y = (mrz_box.h as f64 * self.config.pad_height_fraction) as u32;
        let bbox = mrz_box.padded(pad_x, pad_y, width, height);
        if bbox.w == 0 || bbox.h == 0 {
            return RegionResult::NotFound;
        }

        // Re-extract from the untouched grayscale, not the gradient mask
        let roi = ImageProcessor::crop(gray, &bbox);
        let bitmap = MrzBitmap {
            image: ImageProcessor::otsu_binarize(&roi),
        };
        log::debug!(
            "MRZ box {}x{} at ({},{}) from {} line(s)",
            bbox.w,
            bbox.h,
            bbox.x,
            bbox.y,
            lines.len()
        );

        RegionResult::Found(MrzRegion { bbox, bitmap })
    }

    /// Binary mask in which each MRZ text line is one solid horizontal band.
    fn line_mask(&self, gray: &GrayImage) -> GrayImage {
        let (kw, kh) = self.config.kernel_size(gray.width());
        let blurred = ImageProcessor::blur(gray, self.config.blur_sigma as f32);
        let blackhat = ImageProcessor::blackhat(&blurred, kw, kh);
        let gradient = ImageProcessor::horizontal_gradient(&blackhat);
        let fused = ImageProcessor::close_rect(&gradient, kw, kh);
        ImageProcessor::otsu_binarize(&fused)
    }

    /// Bounding boxes of outermost foreground contours.
    fn external_boxes(mask: &GrayImage) -> Vec<BoundingBox> {
        find_contours::<u32>(mask)
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter_map(Self::bounding_rect)
            .collect()
    }

    fn bounding_rect(contour: &Contour<u32>) -> Option<BoundingBox> {
        let min_x = contour.points.iter().map(|p| p.x).min()?;
        let max_x = contour.points.iter().map(|p| p.x).max()?;
        let min_y = contour.points.iter().map(|p| p.y).min()?;
        let max_y = contour.points.iter().map(|p| p.y).max()?;
        Some(BoundingBox::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    /// Up to two lowest boxes passing the first relaxation tier that
    /// yields anything.
    fn select_lines(&self, boxes: &[BoundingBox], width: u32, height: u32) -> Option<Vec<BoundingBox>> {
        for (tier, criteria) in self.config.relaxation_tiers.iter().enumerate() {
            let lines: Vec<BoundingBox> = boxes
                .iter()
                .filter(|b| Self::is_line_candidate(b, criteria, width, height))
                .take(2)
                .copied()
                .collect();
            if !lines.is_empty() {
                if tier > 0 {
                    log::debug!(
                        "Using relaxed criteria: width > {}, height > {}",
                        criteria.min_width_fraction,
                        criteria.min_height_fraction
                    );
                }
                return Some(lines);
            }
        }
        None
    }

    fn is_line_candidate(b: &BoundingBox, criteria: &LineCriteria, width: u32, height: u32) -> bool {
        let width_fraction = b.w as f64 / width as f64;
        let height_fraction = b.h as f64 / height as f64;
        let in_bottom_half = b.center_y() > height as f32 / 2.0;
        width_fraction > criteria.min_width_fraction
            && height_fraction > criteria.min_height_fraction
            && in_bottom_half
    }
}

impl Default for RegionLocator {
    fn default() -> Self {
        RegionLocator::new(LocatorConfig::default())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Luma;
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    /// A light page with two rows of small dark "glyphs" in its lower part,
    /// the way an MRZ looks before OCR.
    pub(crate) fn synthetic_document(width: u32, height: u32) -> GrayImage {
        let mut img = GrayImage::from_pixel(width, height, Luma([235u8]));
        let rows = [height * 70 / 100, height * 82 / 100];
        for &top in &rows {
            let mut x = width / 20;
            while x + 8 < width - width / 20 {
                draw_filled_rect_mut(&mut img, Rect::at(x as i32, top as i32).of_size(7, 12), Luma([20u8]));
                x += 12;
            }
        }
        img
    }

    /// Glyph rows centred horizontally, spanning `span` of the width, one
    /// per entry of `row_tops` (fractions of the height).
    fn centred_rows(width: u32, height: u32, span: f64, row_tops: &[f64]) -> GrayImage {
        let mut img = GrayImage::from_pixel(width, height, Luma([235u8]));
        let row_width = (width as f64 * span) as u32;
        let start = (width - row_width) / 2;
        for &fraction in row_tops {
            let top = (height as f64 * fraction) as i32;
            let mut x = start;
            while x + 7 <= start + row_width {
                draw_filled_rect_mut(&mut img, Rect::at(x as i32, top).of_size(7, 12), Luma([20u8]));
                x += 12;
            }
        }
        img
    }

    fn strict_only() -> RegionLocator {
        RegionLocator::new(LocatorConfig {
            relaxation_tiers: vec![LineCriteria::new(0.7, 0.02)],
            ..LocatorConfig::default()
        })
    }

    #[test]
    fn test_plain_page_has_no_mrz() {
        let img = GrayImage::from_pixel(600, 400, Luma([240u8]));
        assert!(!RegionLocator::default().locate(&img).is_found());
    }

    #[test]
    fn test_large_dark_blocks_are_not_mrz() {
        let mut img = GrayImage::from_pixel(600, 400, Luma([240u8]));
        draw_filled_rect_mut(&mut img, Rect::at(40, 60).of_size(200, 150), Luma([10u8]));
        assert!(!RegionLocator::default().locate(&img).is_found());
    }

    #[test]
    fn test_finds_two_glyph_rows_at_bottom() {
        let img = synthetic_document(600, 400);
        match RegionLocator::default().locate(&img) {
            RegionResult::Found(region) => {
                assert!(region.bbox.fits_within(600, 400));
                assert!(region.bbox.center_y() > 200.0);
                assert!(region.bbox.w as f32 > 600.0 * 0.7);
                // top row starts at y=280, bottom row ends at y=340
                assert!(region.bbox.y <= 290);
                assert!(region.bbox.bottom() >= 335);
                assert_eq!(region.bitmap.width(), region.bbox.w);
                assert_eq!(region.bitmap.height(), region.bbox.h);
                assert!(region.bitmap.image.pixels().all(|p| p[0] == 0 || p[0] == 255));
            }
            RegionResult::NotFound => panic!("MRZ rows not located"),
        }
    }

    #[test]
    fn test_rows_in_top_half_are_rejected() {
        let img = synthetic_document(600, 400);
        let flipped = image::imageops::flip_vertical(&img);
        assert!(!RegionLocator::default().locate(&flipped).is_found());
    }

    #[test]
    fn test_narrower_rows_need_the_second_tier() {
        let img = centred_rows(600, 400, 0.65, &[0.70, 0.82]);
        assert!(!strict_only().locate(&img).is_found());
        match RegionLocator::default().locate(&img) {
            RegionResult::Found(region) => {
                assert!(region.bbox.w as f64 > 600.0 * 0.6);
                assert!((region.bbox.w as f64) < 600.0 * 0.7 * 1.1);
                assert!(region.bbox.bottom() >= 335);
            }
            RegionResult::NotFound => panic!("second tier should accept 65% rows"),
        }
    }

    #[test]
    fn test_half_width_rows_need_the_last_tier() {
        let img = centred_rows(600, 400, 0.55, &[0.70, 0.82]);
        assert!(!strict_only().locate(&img).is_found());
        let two_tiers = RegionLocator::new(LocatorConfig {
            relaxation_tiers: vec![LineCriteria::new(0.7, 0.02), LineCriteria::new(0.6, 0.015)],
            ..LocatorConfig::default()
        });
        assert!(!two_tiers.locate(&img).is_found());
        assert!(RegionLocator::default().locate(&img).is_found());
    }

    #[test]
    fn test_rows_below_every_tier_are_not_found() {
        let img = centred_rows(600, 400, 0.45, &[0.70, 0.82]);
        assert!(!RegionLocator::default().locate(&img).is_found());
    }

    #[test]
    fn test_single_row_is_used_alone() {
        // one row with its top at y=320
        let img = centred_rows(600, 400, 0.9, &[0.80]);
        match RegionLocator::default().locate(&img) {
            RegionResult::Found(region) => {
                assert!(region.bbox.w as f64 > 600.0 * 0.7);
                assert!(region.bbox.y >= 300 && region.bbox.y <= 330, "y {}", region.bbox.y);
                assert!(region.bbox.bottom() >= 322 && region.bbox.bottom() <= 350);
                // two rows would be ~60 px tall
                assert!(region.bbox.h < 40, "h {}", region.bbox.h);
            }
            RegionResult::NotFound => panic!("single row not located"),
        }
    }

    #[test]
    fn test_large_blank_photo_is_rejected_quickly() {
        let img = GrayImage::from_pixel(1600, 1200, Luma([200u8]));
        let started = std::time::Instant::now();
        assert!(!RegionLocator::default().locate(&img).is_found());
        let elapsed = started.elapsed();
        assert!(elapsed < std::time::Duration::from_secs(20), "took {:?}", elapsed);
    }

    #[test]
    fn test_empty_image_is_not_found() {
        assert!(!RegionLocator::default().locate(&GrayImage::new(0, 0)).is_found());
    }
}
