#![deny(warnings)]

//! Chart renderer: EV per run against number of trials, one line per seed.
//!
//! Writes SVG by default and PNG when the output path ends in `.png`.

use ev_pipeline::{ChartRequest, ChartSink, Series};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const DEFAULT_SIZE: (u32, u32) = (1024, 640);

#[derive(Debug, Error)]
pub enum RenderError {
    /// No point can be placed on the requested axes.
    #[error("nothing to plot")]
    Empty,
    #[error("drawing failed: {0}")]
    Draw(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

/// Axis ranges for a chart.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlotBounds {
    pub x: (f64, f64),
    pub y: (f64, f64),
}

fn drawable(trials: f64, log_x: bool) -> bool {
    !log_x || trials > 0.0
}

/// Ranges covering every drawable point. The y range always contains 0 so
/// the reference line is visible. On a log axis points with `trials <= 0`
/// are left out.
pub fn plot_bounds(series: &[Series], log_x: bool) -> Result<PlotBounds, RenderError> {
    let points = series
        .iter()
        .flat_map(|s| s.points.iter())
        .filter(|p| drawable(p.trials, log_x));
    let mut x = (f64::INFINITY, f64::NEG_INFINITY);
    let mut y = (0.0f64, 0.0f64);
    let mut any = false;
    for p in points {
        any = true;
        x = (x.0.min(p.trials), x.1.max(p.trials));
        y = (y.0.min(p.ev), y.1.max(p.ev));
    }
    if !any {
        return Err(RenderError::Empty);
    }

    let x = if log_x {
        if x.0 == x.1 {
            (x.0 / 2.0, x.1 * 2.0)
        } else {
            (x.0 / 1.2, x.1 * 1.2)
        }
    } else {
        let span = x.1 - x.0;
        let pad = if span > 0.0 {
            span * 0.05
        } else {
            (x.0.abs() * 0.1).max(1.0)
        };
        (x.0 - pad, x.1 + pad)
    };
    let span = y.1 - y.0;
    let pad = if span > 0.0 { span * 0.05 } else { 0.5 };
    Ok(PlotBounds {
        x,
        y: (y.0 - pad, y.1 + pad),
    })
}

/// File-backed [`ChartSink`].
#[derive(Clone, Debug)]
pub struct PlotRenderer {
    path: PathBuf,
    size: (u32, u32),
}

impl PlotRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            size: DEFAULT_SIZE,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    fn is_bitmap(&self) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"))
    }
}

impl ChartSink for PlotRenderer {
    type Error = RenderError;

    fn render(&mut self, request: &ChartRequest<'_>) -> Result<(), RenderError> {
        let bounds = plot_bounds(request.series, request.log_x)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        if self.is_bitmap() {
            let root = BitMapBackend::new(&self.path, self.size).into_drawing_area();
            draw_chart(root, request, bounds)?;
        } else {
            let root = SVGBackend::new(&self.path, self.size).into_drawing_area();
            draw_chart(root, request, bounds)?;
        }
        info!(
            path = %self.path.display(),
            series = request.series.len(),
            "rendered chart"
        );
        Ok(())
    }
}

fn draw_chart<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    request: &ChartRequest<'_>,
    bounds: PlotBounds,
) -> Result<(), RenderError> {
    root.fill(&WHITE).map_err(draw_err)?;
    let mut builder = ChartBuilder::on(&root);
    builder
        .caption(request.title, ("sans-serif", 22))
        .margin(20)
        .x_label_area_size(45)
        .y_label_area_size(60);
    let (x0, x1) = bounds.x;
    let (y0, y1) = bounds.y;

    if request.log_x {
        let mut chart = builder
            .build_cartesian_2d((x0..x1).log_scale(), y0..y1)
            .map_err(draw_err)?;
        chart
            .configure_mesh()
            .x_desc(request.x_label)
            .y_desc(request.y_label)
            .draw()
            .map_err(draw_err)?;
        draw_series(&mut chart, request, bounds)?;
    } else {
        let mut chart = builder
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(draw_err)?;
        chart
            .configure_mesh()
            .x_desc(request.x_label)
            .y_desc(request.y_label)
            .draw()
            .map_err(draw_err)?;
        draw_series(&mut chart, request, bounds)?;
    }
    root.present().map_err(draw_err)?;
    Ok(())
}

fn draw_series<'a, DB, X, Y>(
    chart: &mut ChartContext<'a, DB, Cartesian2d<X, Y>>,
    request: &ChartRequest<'_>,
    bounds: PlotBounds,
) -> Result<(), RenderError>
where
    DB: DrawingBackend + 'a,
    X: Ranged<ValueType = f64>,
    Y: Ranged<ValueType = f64>,
{
    chart
        .draw_series(LineSeries::new(
            [
                (bounds.x.0, request.reference_ev),
                (bounds.x.1, request.reference_ev),
            ],
            BLACK.mix(0.5).stroke_width(1),
        ))
        .map_err(draw_err)?;

    if request.show_legend {
        // Empty series whose only purpose is the legend heading.
        chart
            .draw_series(std::iter::empty::<Circle<(f64, f64), i32>>())
            .map_err(draw_err)?
            .label(request.legend_title)
            .legend(|(x, y)| Circle::new((x, y), 0, TRANSPARENT.filled()));
    }

    for (idx, series) in request.series.iter().enumerate() {
        let points: Vec<(f64, f64)> = series
            .points
            .iter()
            .filter(|p| drawable(p.trials, request.log_x))
            .map(|p| (p.trials, p.ev))
            .collect();
        if points.is_empty() {
            continue;
        }
        let color = Palette99::pick(idx).to_rgba();
        let line_style = color.stroke_width(2);
        if points.len() > 1 {
            chart
                .draw_series(LineSeries::new(points.iter().copied(), line_style))
                .map_err(draw_err)?;
        }
        let markers = chart
            .draw_series(points.iter().map(|&p| Circle::new(p, 3, color.filled())))
            .map_err(draw_err)?;
        if request.show_legend {
            markers
                .label(series.label())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line_style));
        }
    }

    if request.show_legend {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()
            .map_err(draw_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ev_pipeline::{ChartOptions, Point};

    fn series(seed: u64, points: &[(f64, f64)]) -> Series {
        Series {
            seed,
            points: points
                .iter()
                .map(|&(trials, ev)| Point { trials, ev })
                .collect(),
        }
    }

    #[test]
    fn linear_bounds_pad_and_include_zero() {
        let s = [
            series(1, &[(10.0, 0.5), (100.0, 0.2)]),
            series(2, &[(50.0, 0.1)]),
        ];
        let b = plot_bounds(&s, false).unwrap();
        assert!(b.x.0 < 10.0 && b.x.1 > 100.0);
        assert!(b.y.0 < 0.0, "zero must be inside {:?}", b.y);
        assert!(b.y.1 > 0.5);
    }

    #[test]
    fn single_point_bounds_are_not_degenerate() {
        let s = [series(1, &[(50.0, 0.0)])];
        let b = plot_bounds(&s, false).unwrap();
        assert!(b.x.0 < b.x.1);
        assert!(b.y.0 < b.y.1);
        let b = plot_bounds(&s, true).unwrap();
        assert_eq!(b.x, (25.0, 100.0));
    }

    #[test]
    fn log_bounds_skip_non_positive_trials() {
        let s = [series(1, &[(0.0, 1.0), (10.0, 0.1), (1000.0, -0.2)])];
        let b = plot_bounds(&s, true).unwrap();
        assert!(b.x.0 > 0.0);
        assert!(b.x.0 < 10.0 && b.x.1 > 1000.0);

        let only_zero = [series(1, &[(0.0, 1.0)])];
        assert!(matches!(plot_bounds(&only_zero, true), Err(RenderError::Empty)));
        assert!(plot_bounds(&only_zero, false).is_ok());
    }

    #[test]
    fn backend_follows_extension() {
        assert!(PlotRenderer::new("out/chart.PNG").is_bitmap());
        assert!(!PlotRenderer::new("out/chart.svg").is_bitmap());
        assert!(!PlotRenderer::new("chart").is_bitmap());
        assert_eq!(PlotRenderer::new("c.svg").with_size(800, 600).size(), (800, 600));
    }

    fn two_seeds() -> Vec<Series> {
        vec![
            series(1, &[(10.0, 0.5), (100.0, 0.2)]),
            series(2, &[(50.0, -0.1)]),
        ]
    }

    fn render_to(path: &Path, log_x: bool, show_legend: bool) -> Result<(), RenderError> {
        let options = ChartOptions {
            log_x,
            show_legend,
            ..ChartOptions::default()
        };
        let data = two_seeds();
        PlotRenderer::new(path).render(&ChartRequest::new(&options, &data))
    }

    #[test]
    fn renders_lines_and_single_point_markers() {
        let dir = tempfile::tempdir().unwrap();
        for (name, log_x, legend) in [
            ("linear.svg", false, true),
            ("log.svg", true, true),
            ("bare.svg", false, false),
            ("nested/chart.png", true, true),
        ] {
            let path = dir.path().join(name);
            render_to(&path, log_x, legend).unwrap();
            assert!(path.exists(), "{name} not written");
            assert!(std::fs::metadata(&path).unwrap().len() > 0);
        }
    }

    #[test]
    fn svg_carries_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.svg");
        render_to(&path, false, true).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("Number of Trials"));
        assert!(svg.contains("EV per play"));
        assert!(svg.contains("Seed"));
    }

    #[test]
    fn empty_request_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chart.svg");
        let mut renderer = PlotRenderer::new(&path);
        let options = ChartOptions::default();
        let request = ChartRequest::new(&options, &[]);
        assert!(matches!(renderer.render(&request), Err(RenderError::Empty)));
        assert!(!path.exists());
    }
}
