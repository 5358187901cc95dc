//! Text strip plots: one row per category, points placed on a shared
//! price axis and told apart by hue.
use console::Style;

const HUE_MARKERS: [char; 8] = ['◆', '●', '▲', '■', '★', '✚', '◼', '▼'];
const COLLISION_MARKER: char = '*';

#[derive(Debug, Clone, PartialEq)]
struct StripPoint {
    category: String,
    hue: String,
    value: f64,
}

#[derive(Debug, Clone, Default)]
pub struct StripPlot {
    title: String,
    categories: Vec<String>,
    hues: Vec<String>,
    points: Vec<StripPoint>,
}

impl StripPlot {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    /// Adds a point. Categories and hues keep their first-seen order.
    pub fn add_point(&mut self, category: &str, hue: &str, value: f64) {
        if !self.categories.iter().any(|c| c == category) {
            self.categories.push(category.to_string());
        }
        if !self.hues.iter().any(|h| h == hue) {
            self.hues.push(hue.to_string());
        }
        self.points.push(StripPoint {
            category: category.to_string(),
            hue: hue.to_string(),
            value,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn hue_index(&self, hue: &str) -> usize {
        self.hues.iter().position(|h| h == hue).unwrap_or(0)
    }

    fn hue_style(index: usize) -> Style {
        let style = Style::new();
        match index % 6 {
            0 => style.cyan(),
            1 => style.magenta(),
            2 => style.yellow(),
            3 => style.green(),
            4 => style.blue(),
            _ => style.red(),
        }
    }

    fn marker(index: usize) -> char {
        HUE_MARKERS[index % HUE_MARKERS.len()]
    }

    /// Renders the plot into `width` columns.
    pub fn render(&self, width: usize) -> String {
        let mut output = format!("{}\n", self.title);
        if self.points.is_empty() {
            output.push_str("  No data for the current selection\n");
            return output;
        }

        let label_width = self
            .categories
            .iter()
            .map(|c| c.chars().count())
            .max()
            .unwrap_or(0)
            .min(28);
        let plot_width = width.saturating_sub(label_width + 4).max(12);
        let max_value = self
            .points
            .iter()
            .map(|p| p.value)
            .fold(0.0_f64, f64::max);
        let column = |value: f64| -> usize {
            if max_value <= 0.0 {
                0
            } else {
                ((value.max(0.0) / max_value) * (plot_width - 1) as f64).round() as usize
            }
        };

        output.push_str(&format!(
            "{:label_width$} {}\n",
            "",
            axis_labels(max_value, plot_width)
        ));

        for category in &self.categories {
            // Each cell holds the hue index of the point drawn there
            let mut cells: Vec<Option<usize>> = vec![None; plot_width];
            let mut collided = vec![false; plot_width];
            for point in self.points.iter().filter(|p| &p.category == category) {
                let col = column(point.value).min(plot_width - 1);
                let hue = self.hue_index(&point.hue);
                match cells[col] {
                    Some(existing) if existing != hue => collided[col] = true,
                    _ => cells[col] = Some(hue),
                }
            }

            let row: String = cells
                .iter()
                .zip(&collided)
                .map(|(cell, collided)| match (cell, collided) {
                    (_, true) => COLLISION_MARKER.to_string(),
                    (Some(hue), false) => Self::hue_style(*hue)
                        .apply_to(Self::marker(*hue))
                        .to_string(),
                    (None, false) => " ".to_string(),
                })
                .collect();
            output.push_str(&format!(
                "{:>label_width$} │{}│\n",
                truncate(category, label_width),
                row
            ));
        }

        let legend: Vec<String> = self
            .hues
            .iter()
            .enumerate()
            .map(|(i, hue)| {
                let marker = Self::hue_style(i).apply_to(Self::marker(i));
                format!("{marker} {hue}")
            })
            .collect();
        output.push_str(&format!("{:label_width$}  {}\n", "", legend.join("  ")));
        output
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
        short.push('…');
        short
    }
}

/// "0", the midpoint and the maximum spread over `plot_width` columns.
fn axis_labels(max_value: f64, plot_width: usize) -> String {
    let low = "0".to_string();
    let mid = format!("{:.0}", max_value / 2.0);
    let high = format!("{max_value:.0}");

    let mut line = vec![' '; plot_width + 2];
    let mut place = |start: usize, text: &str| {
        for (offset, ch) in text.chars().enumerate() {
            if let Some(slot) = line.get_mut(start + offset) {
                *slot = ch;
            }
        }
    };
    place(1, &low);
    let mid_start = (plot_width / 2 + 1).saturating_sub(mid.len() / 2);
    if mid_start > low.len() + 2 {
        place(mid_start, &mid);
    }
    place((plot_width + 1).saturating_sub(high.len()), &high);
    line.into_iter().collect::<String>().trim_end().to_string()
}
