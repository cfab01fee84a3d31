/// Default upper bound of points handed to a chart series.
pub const MAX_CHART_POINTS: usize = 500;

/// Reduces `data` to at most `max_points` elements by uniform stride sampling.
///
/// Keeps every element whose index is a multiple of `ceil(len / max_points)`
/// and always keeps the last element, so both ends of the time range survive.
/// When appending the last element would exceed the budget it replaces the
/// final stride sample instead. Order is preserved and nothing is
/// interpolated. Budgets below 2 are raised to 2.
pub fn downsample<T: Clone>(data: &[T], max_points: usize) -> Vec<T> {
    let max_points = max_points.max(2);
    if data.len() <= max_points {
        return data.to_vec();
    }

    let stride = data.len().div_ceil(max_points);
    let last = data.len() - 1;
    let mut sampled = data
        .iter()
        .step_by(stride)
        .cloned()
        .collect::<Vec<_>>();

    if last % stride != 0 {
        if sampled.len() == max_points {
            sampled.pop();
        }
        sampled.push(data[last].clone());
    }

    sampled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_return_input_unchanged_when_within_budget() {
        let data = vec![1, 2, 3];
        assert_eq!(downsample(&data, 3), data);
        assert_eq!(downsample::<u32>(&[], 10), Vec::<u32>::new());
    }

    #[test]
    fn should_keep_stride_samples_and_last_element() {
        let data = (0..1000).collect::<Vec<_>>();
        let sampled = downsample(&data, 300);

        // stride = ceil(1000 / 300) = 4
        assert_eq!(sampled[..3], [0, 4, 8]);
        assert_eq!(*sampled.last().unwrap(), 999);
        assert_eq!(sampled.len(), 251);
    }

    #[test]
    fn should_replace_final_sample_with_last_when_budget_is_full() {
        let data = (0..10).collect::<Vec<_>>();
        assert_eq!(downsample(&data, 3), vec![0, 4, 9]);
    }

    #[test]
    fn should_not_duplicate_last_element_on_stride_boundary() {
        let data = (0..7).collect::<Vec<_>>();
        assert_eq!(downsample(&data, 3), vec![0, 3, 6]);
    }

    #[test]
    fn should_hold_invariants_for_many_sizes() {
        for len in 0..200usize {
            let data = (0..len).collect::<Vec<_>>();
            for max_points in 2..40usize {
                let sampled = downsample(&data, max_points);
                assert!(sampled.len() <= max_points);
                assert!(sampled.windows(2).all(|w| w[0] < w[1]));
                if len > 0 {
                    assert_eq!(sampled.first(), data.first());
                    assert_eq!(sampled.last(), data.last());
                }
            }
        }
    }
}
