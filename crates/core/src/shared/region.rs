use crate::detection::domain::face_detector::DetectedFace;

/// An axis-aligned face rectangle in raster pixel coordinates.
///
/// Always non-empty and, once built through [`FaceRegion::clamped`], fully
/// inside the raster it was clamped against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FaceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersects a detector box with a `raster_width` x `raster_height` raster.
    ///
    /// Returns `None` when nothing of the box remains inside the raster
    /// (negative size, zero size, or entirely off-image).
    pub fn clamped(face: &DetectedFace, raster_width: u32, raster_height: u32) -> Option<Self> {
        let max_x = i64::from(raster_width);
        let max_y = i64::from(raster_height);

        let x0 = face.x.clamp(0, max_x);
        let y0 = face.y.clamp(0, max_y);
        let x1 = face.x.saturating_add(face.w).clamp(0, max_x);
        let y1 = face.y.saturating_add(face.h).clamp(0, max_y);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(Self {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn fits_within(&self, raster_width: u32, raster_height: u32) -> bool {
        !self.is_empty()
            && u64::from(self.x) + u64::from(self.width) <= u64::from(raster_width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(raster_height)
    }

    pub fn iou(&self, other: &FaceRegion) -> f64 {
        let inter = self.intersection_area(other);
        if inter == 0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter;
        inter as f64 / union as f64
    }

    pub fn overlaps(&self, other: &FaceRegion) -> bool {
        self.intersection_area(other) > 0
    }

    fn intersection_area(&self, other: &FaceRegion) -> u64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = self.right().min(other.right());
        let iy2 = self.bottom().min(other.bottom());
        u64::from(ix2.saturating_sub(ix1)) * u64::from(iy2.saturating_sub(iy1))
    }
}
