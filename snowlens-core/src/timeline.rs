//! Text timeline layout for query-history records.
//!
//! Lays each query of a batch out as a horizontal bar scaled to the
//! observation window, one row per query, grouped by warehouse session.
//! Pure layout: the CLI decides where the lines go.

use crate::history::{QueryRecord, TimeWindow};

/// Bar glyph used for query spans
const BAR: char = '\u{2588}';

/// Minimum label column width
const MIN_LABEL_WIDTH: usize = 12;

/// One laid-out bar: a label plus a span in chart columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineSpan {
    /// Row label (session and query identifiers)
    pub label: String,
    /// First chart column covered by the bar
    pub offset: usize,
    /// Bar width in chart columns, at least one
    pub length: usize,
}

/// A rendered-ready timeline chart
#[derive(Debug, Clone)]
pub struct Timeline {
    window: TimeWindow,
    chart_width: usize,
    label_width: usize,
    spans: Vec<TimelineSpan>,
}

impl Timeline {
    /// Lays out query records against the window at the given chart width
    ///
    /// Records outside the window are clamped to its edges; every
    /// visible record gets a bar of at least one column so short
    /// queries do not vanish.
    #[must_use]
    pub fn layout(window: TimeWindow, records: &[QueryRecord], chart_width: usize) -> Self {
        let chart_width = chart_width.max(10);
        let total = window.duration_secs().max(1) as f64;
        let start = window.start();

        let spans: Vec<TimelineSpan> = records
            .iter()
            .map(|record| {
                let begin = (record.start_time - start).num_seconds().clamp(0, i64::MAX) as f64;
                let finish = (record.end_time - start)
                    .num_seconds()
                    .clamp(0, window.duration_secs()) as f64;
                let offset =
                    (((begin / total) * chart_width as f64) as usize).min(chart_width - 1);
                let end_col = (((finish / total) * chart_width as f64).ceil() as usize)
                    .clamp(offset + 1, chart_width);
                TimelineSpan {
                    label: format!("{}/{}", record.session_id, record.query_id),
                    offset,
                    length: end_col - offset,
                }
            })
            .collect();

        let label_width = spans
            .iter()
            .map(|s| s.label.len())
            .max()
            .unwrap_or(0)
            .max(MIN_LABEL_WIDTH);

        Self {
            window,
            chart_width,
            label_width,
            spans,
        }
    }

    /// Returns the laid-out spans
    #[must_use]
    pub fn spans(&self) -> &[TimelineSpan] {
        &self.spans
    }

    /// Renders the chart as text lines: one bar row per query plus a
    /// time axis at the bottom
    #[must_use]
    pub fn render(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.spans.len() + 2);
        for span in &self.spans {
            let mut line = format!("{:<width$} |", span.label, width = self.label_width);
            line.extend(std::iter::repeat_n(' ', span.offset));
            line.extend(std::iter::repeat_n(BAR, span.length));
            lines.push(line);
        }
        lines.push(self.axis_line());
        lines.push(self.tick_line());
        lines
    }

    /// Horizontal rule under the bars
    fn axis_line(&self) -> String {
        let mut line = format!("{:<width$} +", "", width = self.label_width);
        line.extend(std::iter::repeat_n('-', self.chart_width));
        line
    }

    /// Start and end timestamps under the rule
    fn tick_line(&self) -> String {
        let start = self.window.start().format("%H:%M:%S").to_string();
        let end = self.window.end().format("%H:%M:%S").to_string();
        let gap = self
            .chart_width
            .saturating_sub(start.len() + end.len())
            .max(1);
        format!(
            "{:<width$}  {start}{:gap$}{end}",
            "",
            "",
            width = self.label_width,
            gap = gap
        )
    }
}
