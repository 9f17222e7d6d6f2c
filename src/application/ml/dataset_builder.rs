use crate::application::indicators::{IndicatorFrame, IndicatorParams};
use crate::domain::errors::IndicatorError;
use crate::domain::market::TimeSeries;
use crate::domain::ml::{Dataset, DatasetRow, Direction, FeatureSchema};
use tracing::{debug, info};

/// Bars between a row and the close that decides its label.
pub const LABEL_HORIZON: usize = 5;

/// Smallest series that yields at least one complete row.
pub const MIN_HISTORY: usize = IndicatorParams::STANDARD.longest_warmup() + LABEL_HORIZON;

/// `Up` when the close `horizon` bars ahead is strictly higher, `None` for the final `horizon` bars.
pub fn forward_labels(close: &[f64], horizon: usize) -> Vec<Option<Direction>> {
    (0..close.len())
        .map(|i| {
            close.get(i + horizon).map(|&future| {
                if future > close[i] {
                    Direction::Up
                } else {
                    Direction::Down
                }
            })
        })
        .collect()
}

/// Builds the labeled dataset with the standard schema.
pub fn build_dataset(series: &TimeSeries) -> Result<Dataset, IndicatorError> {
    build_dataset_with_schema(series, &FeatureSchema::standard())
}

/// Builds the labeled dataset, emitting features in `schema` order.
///
/// Rows with any undefined feature or an undefined label are dropped, so a
/// series shorter than [`MIN_HISTORY`] produces an empty dataset.
pub fn build_dataset_with_schema(
    series: &TimeSeries,
    schema: &FeatureSchema,
) -> Result<Dataset, IndicatorError> {
    let frame = IndicatorFrame::compute(series)?;
    let labels = forward_labels(&frame.close, LABEL_HORIZON);

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (index, label) in labels.into_iter().enumerate() {
        let Some(label) = label else {
            skipped += 1;
            continue;
        };
        match schema.extract(&frame, index) {
            Ok(vector) => rows.push(DatasetRow {
                date: frame.dates[index],
                index,
                features: vector.values(),
                label,
            }),
            Err(_) => skipped += 1,
        }
    }

    let dataset = Dataset::new(schema.clone(), rows);
    if dataset.is_empty() {
        debug!(
            "Dataset for {} is empty ({} bars, {} needed)",
            series.symbol(),
            series.len(),
            MIN_HISTORY
        );
    } else {
        info!(
            "Built dataset for {}: {} rows x {} features ({} bars dropped), {:.1}% UP",
            series.symbol(),
            dataset.len(),
            schema.len(),
            skipped,
            dataset.up_ratio() * 100.0
        );
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ml::FeatureName;
    use crate::infrastructure::mock::{linear_series, sine_series};

    #[test]
    fn test_forward_labels() {
        let close = [1.0, 2.0, 1.5, 3.0, 3.0];
        let labels = forward_labels(&close, 2);
        assert_eq!(
            labels,
            vec![
                Some(Direction::Up),
                Some(Direction::Up),
                Some(Direction::Up),
                None,
                None
            ]
        );
        // equal future close is Down
        assert_eq!(forward_labels(&[3.0, 3.0], 1)[0], Some(Direction::Down));
    }

    #[test]
    fn test_min_history() {
        assert_eq!(MIN_HISTORY, 205);
    }

    #[test]
    fn test_rows_span_first_complete_index_to_horizon() {
        let series = linear_series("UPTREND", 260, 100.0, 0.5);
        let dataset = build_dataset(&series).unwrap();

        assert_eq!(dataset.len(), 56);
        assert_eq!(dataset.rows().first().unwrap().index, 199);
        assert_eq!(dataset.rows().last().unwrap().index, 254);
        assert!(dataset.rows().iter().all(|r| r.label == Direction::Up));
        assert!(
            dataset
                .rows()
                .iter()
                .all(|r| r.features.len() == 8 && r.features.iter().all(|v| v.is_finite()))
        );
    }

    #[test]
    fn test_last_horizon_bars_never_included() {
        let series = sine_series("OSC", 300, 100.0, 5.0, 23.0);
        let dataset = build_dataset(&series).unwrap();
        let last_allowed = series.len() - 1 - LABEL_HORIZON;
        assert!(dataset.rows().iter().all(|r| r.index <= last_allowed));
        assert_eq!(dataset.rows().last().unwrap().index, last_allowed);
    }

    #[test]
    fn test_short_series_gives_empty_dataset() {
        let series = linear_series("SHORT", MIN_HISTORY - 1, 10.0, 0.1);
        assert!(build_dataset(&series).unwrap().is_empty());

        let series = linear_series("EXACT", MIN_HISTORY, 10.0, 0.1);
        assert_eq!(build_dataset(&series).unwrap().len(), 1);
    }

    #[test]
    fn test_custom_schema_controls_column_order() {
        let series = sine_series("OSC", 260, 50.0, 3.0, 19.0);
        let schema =
            FeatureSchema::new(7, vec![FeatureName::Rsi, FeatureName::Close]).unwrap();
        let dataset = build_dataset_with_schema(&series, &schema).unwrap();

        assert_eq!(dataset.schema(), &schema);
        let row = &dataset.rows()[0];
        assert_eq!(row.features.len(), 2);
        assert_eq!(row.features[1], series.bars()[row.index].close);
    }

    #[test]
    fn test_non_finite_bar_does_not_poison_dataset() {
        let mut bars = sine_series("OSC", 400, 100.0, 5.0, 23.0).bars().to_vec();
        bars[10].close = f64::NAN;
        let series = TimeSeries::from_unsorted("OSC", bars);
        assert_eq!(series.len(), 399);

        let dataset = build_dataset(&series).unwrap();
        assert_eq!(dataset.len(), 399 - MIN_HISTORY + 1);
        assert!(
            dataset
                .rows()
                .iter()
                .all(|r| r.features.iter().all(|v| v.is_finite()))
        );
    }
}
