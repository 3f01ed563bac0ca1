use plotters::prelude::*;

pub struct PlottersPlotter{}

impl PlottersPlotter {
    pub fn create() -> anyhow::Result<PlottersPlotter> {
        Ok(PlottersPlotter{})
    }

    fn line_color(i : usize) -> RGBColor {
        match i {
            0 => BLUE,
            1 => RED,
            2 => GREEN,
            3 => CYAN,
            4 => YELLOW,
            _ => MAGENTA
        }
    }
}

impl forecast_lib::Plotter for PlottersPlotter {
    fn plot_lines(&mut self, y_points_list : &Vec<(String, Vec<f64>)>, title : &str, filename : &str) -> anyhow::Result<()> {
        if y_points_list.iter().all(|(_, y)| y.is_empty()) {
            anyhow::bail!("nothing to plot for '{}'", title);
        }

        let png_filename = format!("{}.png", filename);
        if let Some(parent) = std::path::Path::new(&png_filename).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let root_area = BitMapBackend::new(&png_filename, (1920, 1080)).into_drawing_area();
        root_area.fill(&WHITE)?;
        let root_area = root_area.titled(title, ("sans-serif", 18))?;

        let max_len = y_points_list.iter().map(|(_, y)| y.len()).max().unwrap_or(0);
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for (_name, y_points) in y_points_list {
            for &y in y_points {
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }

        let mut chart = ChartBuilder::on(&root_area)
            .margin(5)
            .set_all_label_area_size(50)
            .build_cartesian_2d(0.0..max_len as f64, min_y..max_y)?;

        chart.configure_mesh()
            .x_labels(20)
            .y_labels(10)
            .draw()?;

        for (i, (label, y_points)) in y_points_list.iter().enumerate() {
            let color = PlottersPlotter::line_color(i);
            chart.draw_series(LineSeries::new(
                    y_points.iter().enumerate().map(|(x, &y)| (x as f64, y)), &color))?
                .label(label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        }

        chart.configure_series_labels().border_style(&BLACK).draw()?;

        Ok(())
    }
}
