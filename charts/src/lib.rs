use std::path::Path;

use common::record::{MetricRecord, ResultTable};
use eyre::{Result, bail};
use itertools::Itertools;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::debug;

/// Output raster size, a 6.4 x 4.8 inch canvas at 150 dpi.
pub const IMAGE_SIZE: (u32, u32) = (960, 720);
/// Y-axis extension leaving room for the value labels above the bars.
pub const HEADROOM_FACTOR: f64 = 1.15;
pub const X_LABEL: &str = "Concurrency";

/// The four report metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Throughput,
    Ttft,
    Itl,
    E2e,
}

impl Metric {
    pub fn value(&self, record: &MetricRecord) -> f64 {
        match self {
            Metric::Throughput => record.throughput,
            Metric::Ttft => record.ttft_ms,
            Metric::Itl => record.itl_ms,
            Metric::E2e => record.e2e_ms,
        }
    }
}

/// One chart definition: the metric it reads, how the chart is titled and
/// labeled, and the fixed file it is written to.
#[derive(Debug, Clone, Copy)]
pub struct ChartSpec {
    pub metric: Metric,
    pub title: &'static str,
    pub y_label: &'static str,
    pub filename: &'static str,
}

/// The full report, one entry per metric. Never mutated at runtime.
pub const CHART_SPECS: [ChartSpec; 4] = [
    ChartSpec {
        metric: Metric::Throughput,
        title: "Throughput",
        y_label: "tokens/sec",
        filename: "throughput.png",
    },
    ChartSpec {
        metric: Metric::Ttft,
        title: "Time To First Token",
        y_label: "ms",
        filename: "ttft_ms.png",
    },
    ChartSpec {
        metric: Metric::Itl,
        title: "Inter Token Latency",
        y_label: "ms",
        filename: "itl_ms.png",
    },
    ChartSpec {
        metric: Metric::E2e,
        title: "End-to-End Latency",
        y_label: "ms",
        filename: "e2e_ms.png",
    },
];

/// One bar of a chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// Index into [`BarChartData::categories`].
    pub slot: usize,
    pub height: f64,
    pub label: String,
}

/// The chart layout, computed before any drawing happens. Unchanged input
/// tables produce identical layouts, only the rasterization lives outside
/// this struct.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChartData {
    /// Distinct concurrency levels, ascending; one x-axis segment each.
    pub categories: Vec<u32>,
    pub bars: Vec<Bar>,
}

/// Builds the layout for one metric. Records sharing a concurrency level map
/// to the same segment, so their bars overlap at that x-position.
pub fn chart_data(table: &ResultTable, metric: Metric) -> BarChartData {
    let categories: Vec<u32> = table
        .records()
        .iter()
        .map(|r| r.concurrency)
        .dedup()
        .collect();
    let bars = table
        .records()
        .iter()
        .map(|record| {
            let height = metric.value(record);
            Bar {
                slot: categories
                    .iter()
                    .position(|c| *c == record.concurrency)
                    .unwrap(),
                height,
                label: format!("{height:.2}"),
            }
        })
        .collect();
    BarChartData { categories, bars }
}

/// Upper bound of the y-axis. Falls back to a unit range when every bar is
/// zero so the axis stays valid.
pub fn y_axis_max(data: &BarChartData, headroom: bool) -> f64 {
    let max = data.bars.iter().map(|b| b.height).fold(0.0f64, f64::max);
    let max = if headroom { max * HEADROOM_FACTOR } else { max };
    if max > 0.0 { max } else { 1.0 }
}

/// Draws one labeled bar chart and writes it to `path`, overwriting any
/// existing file. The backend is scoped to this call.
pub fn render_bar_chart(
    path: &Path,
    data: &BarChartData,
    spec: &ChartSpec,
    headroom: bool,
) -> Result<()> {
    if data.bars.is_empty() {
        bail!("No bars to render for {}", spec.filename);
    }

    let y_max = y_axis_max(data, headroom);
    let segments = data.categories.len() as i32;
    let categories = &data.categories;

    let root = BitMapBackend::new(path, IMAGE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(spec.title, ("sans-serif", 32))
        .margin(16)
        .set_label_area_size(LabelAreaPosition::Left, 80)
        .set_label_area_size(LabelAreaPosition::Bottom, 56)
        .build_cartesian_2d((0..segments).into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(categories.len())
        .x_label_formatter(&|segment| match segment {
            SegmentValue::CenterOf(i) => categories
                .get(*i as usize)
                .map(|c| c.to_string())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .x_desc(X_LABEL)
        .y_desc(spec.y_label)
        .axis_desc_style(("sans-serif", 20))
        .draw()?;

    chart.draw_series(data.bars.iter().map(|bar| {
        let slot = bar.slot as i32;
        let mut rect = Rectangle::new(
            [
                (SegmentValue::Exact(slot), 0.0),
                (SegmentValue::Exact(slot + 1), bar.height),
            ],
            BLUE.filled(),
        );
        rect.set_margin(0, 0, 14, 14);
        rect
    }))?;

    let label_style = TextStyle::from(("sans-serif", 18).into_font())
        .pos(Pos::new(HPos::Center, VPos::Bottom))
        .color(&BLACK);
    chart.draw_series(data.bars.iter().map(|bar| {
        Text::new(
            bar.label.clone(),
            (SegmentValue::CenterOf(bar.slot as i32), bar.height),
            label_style.clone(),
        )
    }))?;

    root.present()?;
    debug!("Rendered {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn scaled_record(concurrency: u32) -> MetricRecord {
        let scale = concurrency as f64;
        MetricRecord {
            concurrency,
            throughput: 100.0 * scale,
            ttft_ms: 50.0 * scale,
            itl_ms: 10.0 * scale,
            e2e_ms: 500.0 * scale,
        }
    }

    #[test]
    fn chart_table_has_one_entry_per_metric_with_unique_filenames() {
        assert_eq!(CHART_SPECS.len(), 4);
        let filenames: HashSet<&str> = CHART_SPECS.iter().map(|s| s.filename).collect();
        assert_eq!(filenames.len(), 4);
        let metrics: HashSet<Metric> = CHART_SPECS.iter().map(|s| s.metric).collect();
        assert_eq!(metrics.len(), 4);
    }

    #[test]
    fn metric_reads_its_own_record_field() {
        let record = scaled_record(2);
        assert_eq!(Metric::Throughput.value(&record), 200.0);
        assert_eq!(Metric::Ttft.value(&record), 100.0);
        assert_eq!(Metric::Itl.value(&record), 20.0);
        assert_eq!(Metric::E2e.value(&record), 1000.0);
    }

    #[test]
    fn throughput_chart_bars_and_labels_scale_with_concurrency() {
        let table = ResultTable::from_records(vec![
            scaled_record(16),
            scaled_record(1),
            scaled_record(4),
        ]);
        let data = chart_data(&table, Metric::Throughput);

        assert_eq!(data.categories, vec![1, 4, 16]);
        let heights: Vec<f64> = data.bars.iter().map(|b| b.height).collect();
        assert_eq!(heights, vec![100.0, 400.0, 1600.0]);
        let labels: Vec<&str> = data.bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["100.00", "400.00", "1600.00"]);
        let slots: Vec<usize> = data.bars.iter().map(|b| b.slot).collect();
        assert_eq!(slots, vec![0, 1, 2]);
    }

    #[test]
    fn duplicate_concurrency_shares_one_segment() {
        let mut second = scaled_record(8);
        second.throughput = 790.0;
        let table = ResultTable::from_records(vec![scaled_record(8), second]);
        let data = chart_data(&table, Metric::Throughput);

        assert_eq!(data.categories, vec![8]);
        assert_eq!(data.bars.len(), 2, "both rows stay on the chart");
        assert!(data.bars.iter().all(|b| b.slot == 0));
    }

    #[test]
    fn layout_is_identical_across_reruns() {
        let table = ResultTable::from_records(vec![scaled_record(1), scaled_record(4)]);
        assert_eq!(
            chart_data(&table, Metric::E2e),
            chart_data(&table, Metric::E2e)
        );
    }

    #[test]
    fn headroom_extends_the_y_axis_by_fifteen_percent() {
        let table = ResultTable::from_records(vec![scaled_record(16)]);
        let data = chart_data(&table, Metric::Throughput);
        assert!((y_axis_max(&data, true) - 1840.0).abs() < 1e-9);
        assert_eq!(y_axis_max(&data, false), 1600.0);
    }

    #[test]
    fn all_zero_bars_still_give_a_valid_axis() {
        let table = ResultTable::from_records(vec![MetricRecord {
            concurrency: 1,
            ..MetricRecord::default()
        }]);
        let data = chart_data(&table, Metric::Throughput);
        assert_eq!(y_axis_max(&data, true), 1.0);
    }
}
