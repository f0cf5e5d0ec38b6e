use std::borrow::Cow;

use image::imageops::{rotate180, rotate270, rotate90};
use image::GrayImage;

use crate::models::{MrzRegion, RegionResult};
use crate::processing::region::RegionLocator;
use crate::utils::PassportError;

/// Clockwise rotation applied to the source before locating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [
        Orientation::Deg0,
        Orientation::Deg90,
        Orientation::Deg180,
        Orientation::Deg270,
    ];

    pub fn degrees(&self) -> u16 {
        match self {
            Orientation::Deg0 => 0,
            Orientation::Deg90 => 90,
            Orientation::Deg180 => 180,
            Orientation::Deg270 => 270,
        }
    }

    pub fn apply<'a>(&self, img: &'a GrayImage) -> Cow<'a, GrayImage> {
        match self {
            Orientation::Deg0 => Cow::Borrowed(img),
            Orientation::Deg90 => Cow::Owned(rotate90(img)),
            Orientation::Deg180 => Cow::Owned(rotate180(img)),
            Orientation::Deg270 => Cow::Owned(rotate270(img)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocatedMrz {
    pub orientation: Orientation,
    pub region: MrzRegion,
}

/// Retries the locator on the four right-angle rotations of the source,
/// stopping at the first hit. Rotations happen in memory.
pub struct OrientationSearcher {
    locator: RegionLocator,
}

impl OrientationSearcher {
    pub fn new(locator: RegionLocator) -> Self {
        OrientationSearcher { locator }
    }

    pub fn search(&self, gray: &GrayImage) -> Result<LocatedMrz, PassportError> {
        for orientation in Orientation::ALL {
            let rotated = orientation.apply(gray);
            match self.locator.locate(&rotated) {
                RegionResult::Found(region) => {
                    log::info!("MRZ found at {} degrees", orientation.degrees());
                    return Ok(LocatedMrz { orientation, region });
                }
                RegionResult::NotFound => {
                    log::debug!("No MRZ at {} degrees", orientation.degrees());
                }
            }
        }

        Err(PassportError::MrzNotFound(format!(
            "no MRZ located at 0, 90, 180 or 270 degrees in {}x{} image",
            gray.width(),
            gray.height()
        )))
    }
}

impl Default for OrientationSearcher {
    fn default() -> Self {
        OrientationSearcher::new(RegionLocator::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::region::tests::synthetic_document;
    use image::Luma;

    #[test]
    fn test_upright_document_found_without_rotation() {
        let img = synthetic_document(600, 400);
        let located = OrientationSearcher::default().search(&img).unwrap();
        assert_eq!(located.orientation, Orientation::Deg0);
    }

    #[test]
    fn test_sideways_document_is_turned_back() {
        // MRZ ends up along the left edge
        let sideways = rotate90(&synthetic_document(600, 400));
        let located = OrientationSearcher::default().search(&sideways).unwrap();
        assert_eq!(located.orientation, Orientation::Deg270);
        assert!(located.region.bbox.fits_within(600, 400));
    }

    #[test]
    fn test_upside_down_document_is_turned_back() {
        let upside_down = rotate180(&synthetic_document(600, 400));
        let located = OrientationSearcher::default().search(&upside_down).unwrap();
        assert_eq!(located.orientation, Orientation::Deg180);
    }

    #[test]
    fn test_blank_image_exhausts_all_orientations() {
        let img = GrayImage::from_pixel(300, 200, Luma([250u8]));
        let err = OrientationSearcher::default().search(&img).unwrap_err();
        assert!(matches!(err, PassportError::MrzNotFound(_)));
    }

    #[test]
    fn test_rotation_swaps_dimensions() {
        let img = GrayImage::new(30, 10);
        assert_eq!(Orientation::Deg90.apply(&img).dimensions(), (10, 30));
        assert_eq!(Orientation::Deg180.apply(&img).dimensions(), (30, 10));
        assert!(matches!(Orientation::Deg0.apply(&img), Cow::Borrowed(_)));
    }
}
