//! Merging of overlapping detections into regions.
//!
//! [`merge_rectangles`] joins overlapping rectangles until none overlap, and [`aggregate`] collects
//! the text of every detection touching each merged rectangle.

use crate::detection::Detection;
use crate::geometry::{GeometryError, Rect};

/// A merged rectangle and the text of every detection inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedRegion {
    pub rect: Rect,
    pub text: String,
}

/// Replace overlapping rectangles by their bounding rectangle until no two overlap.
///
/// Pairs are scanned as `(i, j)` with `i < j` in the current order. The first overlapping pair
/// found is merged into slot `i`, `j` is removed, and the scan starts over. The order of
/// merges decides the shape of the result when several overlaps exist, so it must stay as is.
pub fn merge_rectangles(rects: &[Rect]) -> Vec<Rect> {
    let mut merged = rects.to_vec();

    while let Some((i, j)) = first_overlap(&merged) {
        merged[i] = merged[i].union(&merged[j]);
        merged.remove(j);
    }

    merged
}

fn first_overlap(rects: &[Rect]) -> Option<(usize, usize)> {
    for (i, a) in rects.iter().enumerate() {
        for (j, b) in rects.iter().enumerate().skip(i + 1) {
            if a.overlaps(b) {
                return Some((i, j));
            }
        }
    }
    None
}

/// Join, for each merged rectangle, the text of every overlapping detection in detection order.
///
/// Fails with [`GeometryError::OverlappingRegions`] if two of the merged rectangles overlap, since
/// a detection would then be counted in both.
pub fn aggregate(
    merged: &[Rect],
    detections: &[Detection],
) -> Result<Vec<MergedRegion>, GeometryError> {
    if let Some((i, j)) = first_overlap(merged) {
        return Err(GeometryError::OverlappingRegions {
            first: merged[i],
            second: merged[j],
        });
    }

    Ok(merged
        .iter()
        .map(|rect| {
            let mut text = String::new();
            for detection in detections.iter().filter(|d| d.rect.overlaps(rect)) {
                text.push_str(&detection.text);
                text.push(' ');
            }
            MergedRegion {
                rect: *rect,
                text: text.trim().to_owned(),
            }
        })
        .collect())
}

/// Merge the detections' rectangles and aggregate their text.
pub fn consolidate(detections: &[Detection]) -> Result<Vec<MergedRegion>, GeometryError> {
    let rects: Vec<Rect> = detections.iter().map(|d| d.rect).collect();
    aggregate(&merge_rectangles(&rects), detections)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x1: i32, y1: i32, x2: i32, y2: i32) -> Rect {
        Rect::new((x1, y1), (x2, y2)).unwrap()
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(merge_rectangles(&[]).is_empty());
        assert!(consolidate(&[]).unwrap().is_empty());
    }

    #[test]
    fn single_rectangle_is_unchanged() {
        let r = rect(3, 4, 30, 40);
        assert_eq!(merge_rectangles(&[r]), vec![r]);
    }

    #[test]
    fn overlapping_pair_merges() {
        let merged = merge_rectangles(&[rect(0, 0, 10, 10), rect(5, 5, 15, 15)]);
        assert_eq!(merged, vec![rect(0, 0, 15, 15)]);
    }

    #[test]
    fn disjoint_pair_is_kept() {
        let input = [rect(0, 0, 5, 5), rect(100, 100, 105, 105)];
        assert_eq!(merge_rectangles(&input), input.to_vec());
    }

    #[test]
    fn chained_overlaps_merge_transitively() {
        let a = rect(0, 0, 10, 10);
        let b = rect(8, 0, 20, 10);
        let c = rect(18, 0, 30, 10);
        assert!(!a.overlaps(&c));
        assert_eq!(merge_rectangles(&[a, c, b]), vec![rect(0, 0, 30, 10)]);
    }

    #[test]
    fn merge_grows_into_new_overlaps() {
        // the union of the first three reaches c, which none of them touched on its own.
        let a = rect(0, 0, 10, 2);
        let b = rect(0, 8, 2, 10);
        let c = rect(8, 8, 12, 12);
        assert!(!a.overlaps(&c) && !b.overlaps(&c));
        let merged = merge_rectangles(&[a, rect(0, 0, 1, 10), b, c]);
        assert_eq!(merged, vec![rect(0, 0, 12, 12)]);
    }

    #[test]
    fn merged_rectangle_takes_first_slot() {
        let far = rect(100, 100, 110, 110);
        let merged = merge_rectangles(&[rect(0, 0, 4, 4), far, rect(4, 4, 8, 8)]);
        assert_eq!(merged, vec![rect(0, 0, 8, 8), far]);
    }

    #[test]
    fn aggregate_joins_text_in_detection_order() {
        let detections = [
            Detection::new(rect(50, 0, 60, 10), "World"),
            Detection::new(rect(0, 0, 50, 10), "Hello"),
            Detection::new(rect(200, 200, 210, 210), "apart"),
        ];
        let regions = consolidate(&detections).unwrap();
        assert_eq!(
            regions,
            vec![
                MergedRegion {
                    rect: rect(0, 0, 60, 10),
                    text: "World Hello".to_owned(),
                },
                MergedRegion {
                    rect: rect(200, 200, 210, 210),
                    text: "apart".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn aggregate_trims_trailing_whitespace() {
        let detections = [Detection::new(rect(0, 0, 5, 5), "tail  ")];
        let regions = aggregate(&[rect(0, 0, 5, 5)], &detections).unwrap();
        assert_eq!(regions[0].text, "tail");
    }

    #[test]
    fn region_without_detections_has_empty_text() {
        let regions = aggregate(&[rect(0, 0, 5, 5)], &[]).unwrap();
        assert_eq!(regions[0].text, "");
    }

    #[test]
    fn aggregate_rejects_overlapping_merged_set() {
        let err = aggregate(&[rect(0, 0, 10, 10), rect(10, 10, 20, 20)], &[]).unwrap_err();
        assert_eq!(
            err,
            GeometryError::OverlappingRegions {
                first: rect(0, 0, 10, 10),
                second: rect(10, 10, 20, 20),
            }
        );
    }
}
