use crate::common::*;

/// A COCO object annotation. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// `[x, y, w, h]` in pixels with `(x, y)` the top-left corner.
    pub bbox: [f64; 4],
    /// The 1-based COCO paper category id.
    pub category_id: usize,
}

impl Annotation {
    /// The box in pixel corners, or `None` if its size is negative or not finite.
    pub fn rect(&self) -> Option<TLBR<f64>> {
        if !self.bbox.iter().all(|value| value.is_finite()) {
            return None;
        }
        TLBR::try_from_xywh(self.bbox).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_coco_record() {
        let text = r#"{
            "id": 1768,
            "image_id": 289343,
            "bbox": [473.07, 395.93, 38.65, 28.67],
            "area": 702.1057499999998,
            "iscrowd": 0,
            "category_id": 18
        }"#;
        let annotation: Annotation = json5::from_str(text).unwrap();
        assert_eq!(annotation.category_id, 18);

        let rect = annotation.rect().unwrap();
        approx::assert_abs_diff_eq!(rect.r(), 473.07 + 38.65, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(rect.b(), 395.93 + 28.67, epsilon = 1e-9);
    }

    #[test]
    fn negative_size_has_no_rect() {
        let annotation = Annotation {
            bbox: [10.0, 10.0, -1.0, 5.0],
            category_id: 1,
        };
        assert!(annotation.rect().is_none());
    }
}
