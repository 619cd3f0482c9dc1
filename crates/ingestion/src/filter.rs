//! Frame selection policy
//!
//! Pure decisions over (absolute frame index, time). The end-of-interval
//! check runs before validity and stops the whole run.

use contracts::SelectionRange;

/// Selection policy evaluated by the Frame Source
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameFilter {
    range: SelectionRange,
}

impl FrameFilter {
    pub fn new(range: SelectionRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> &SelectionRange {
        &self.range
    }

    /// True if the frame passes the lower bounds and the subsampling stride
    ///
    /// A stride below 1 disables subsampling.
    pub fn is_frame_valid(&self, frame_index: u64, time: f64) -> bool {
        let r = &self.range;
        r.first_frame.is_none_or(|first| frame_index >= first)
            && r.first_time.is_none_or(|first| time >= first)
            && r.stride().is_none_or(|stride| frame_index % stride == 0)
    }

    /// True once the frame lies past either upper bound
    pub fn is_end_of_interval(&self, frame_index: u64, time: f64) -> bool {
        let r = &self.range;
        r.last_frame.is_some_and(|last| frame_index > last)
            || r.last_time.is_some_and(|last| time > last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn filter(range: SelectionRange) -> FrameFilter {
        FrameFilter::new(range)
    }

    #[test]
    fn test_unset_accepts_everything() {
        let f = FrameFilter::default();
        for i in 0..50 {
            assert!(f.is_frame_valid(i, i as f64 * 0.5));
            assert!(!f.is_end_of_interval(i, i as f64 * 0.5));
        }
    }

    #[test]
    fn test_first_frame_and_time() {
        let f = filter(SelectionRange {
            first_frame: Some(3),
            first_time: Some(10.0),
            ..Default::default()
        });
        assert!(!f.is_frame_valid(2, 20.0));
        assert!(!f.is_frame_valid(5, 9.5));
        assert!(f.is_frame_valid(3, 10.0));
    }

    #[test]
    fn test_skip_stride() {
        let f = filter(SelectionRange {
            skip: Some(3),
            ..Default::default()
        });
        let accepted: Vec<u64> = (0..10).filter(|&i| f.is_frame_valid(i, 0.0)).collect();
        assert_eq!(accepted, vec![0, 3, 6, 9]);
    }

    #[test]
    fn test_skip_below_one_never_rejects() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let skip = rng.random_range(-1000..1);
            let f = filter(SelectionRange {
                skip: Some(skip),
                ..Default::default()
            });
            let index = rng.random_range(0..1_000_000u64);
            let time = rng.random_range(0.0..1.0e6);
            assert!(f.is_frame_valid(index, time), "skip={skip} index={index}");
        }
    }

    #[test]
    fn test_end_of_interval() {
        let f = filter(SelectionRange {
            last_frame: Some(5),
            last_time: Some(100.0),
            ..Default::default()
        });
        assert!(!f.is_end_of_interval(5, 100.0));
        assert!(f.is_end_of_interval(6, 0.0));
        assert!(f.is_end_of_interval(0, 100.5));
    }
}
