use super::chart::StripPlot;
use super::ui;
use crate::core::config::AppConfig;
use crate::core::dashboard::{DashboardData, resolve_image};
use crate::core::filter::{AveragePrice, FilteredView};
use crate::core::{ExchangeRateMap, ImageLookup, ImageResolver, PriceTable};
use comfy_table::Cell;

pub struct RenderOptions {
    pub width: usize,
    pub show_images: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: ui::term_width(),
            show_images: true,
        }
    }
}

pub fn rates_table(rates: &ExchangeRateMap) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("currency"),
        ui::header_cell(&format!("rate (in {})", rates.base())),
    ]);
    for (currency, rate) in rates.iter() {
        table.add_row(vec![Cell::new(currency), ui::price_cell(rate)]);
    }
    table.to_string()
}

/// Selection state as checkbox lists plus the price range.
fn selection_summary(config: &AppConfig, view: &FilteredView) -> String {
    let mut output = ui::style_text("Selected Legos:", ui::StyleType::Header);
    output.push('\n');
    for (i, item) in config.catalog.iter().enumerate() {
        let checked = view.selection.items.contains(&item.name);
        output.push_str(&format!(
            "  {:>2}. {} {} ({})\n",
            i + 1,
            ui::checkbox(checked),
            item.name,
            item.id
        ));
    }

    output.push_str(&ui::style_text("Selected Websites:", ui::StyleType::Header));
    output.push('\n');
    if view.selectable_sources.is_empty() {
        output.push_str(&format!(
            "  {}\n",
            ui::style_text("(none available)", ui::StyleType::Subtle)
        ));
    }
    for (i, source) in view.selectable_sources.iter().enumerate() {
        let checked = view.selection.sources.contains(source);
        output.push_str(&format!("  {:>2}. {} {}\n", i + 1, ui::checkbox(checked), source));
    }

    output.push_str(&ui::style_text("Filtering by price:", ui::StyleType::Header));
    output.push('\n');
    output.push_str(&format!(
        "  Minimum Price: {:.2}  Maximum Price: {:.2}  (range 0.00 - {:.2})\n",
        view.selection.min_price, view.selection.max_price, view.price_ceiling
    ));
    output
}

fn average_plot(averages: &[AveragePrice], base: &str) -> StripPlot {
    let mut plot = StripPlot::new(&ui::style_text(
        &format!("Average Prices ({base}):"),
        ui::StyleType::Title,
    ));
    for average in averages {
        plot.add_point(&average.item_name, &average.source, average.price);
    }
    plot
}

fn distribution_plot(filtered: &PriceTable, base: &str) -> StripPlot {
    let mut plot = StripPlot::new(&ui::style_text(
        &format!("Distribution of prices ({base}):"),
        ui::StyleType::Title,
    ));
    for row in filtered.iter() {
        plot.add_point(&row.item_name, &row.source, row.price);
    }
    plot
}

/// Every filtered row except the image column.
pub fn prices_table(filtered: &PriceTable, base: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Set"),
        ui::header_cell("Id"),
        ui::header_cell("Source"),
        ui::header_cell(&format!("Price ({base})")),
        ui::header_cell("Listed"),
    ]);
    for (index, row) in filtered.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index),
            Cell::new(&row.item_name),
            Cell::new(row.item_id),
            Cell::new(&row.source),
            ui::price_cell(row.price),
            ui::format_optional_cell(Some(row.local_price), |p| {
                format!("{p:.2} {}", row.local_currency)
            }),
        ]);
    }
    table.to_string()
}

/// One panel per catalog set, resolved against the unfiltered table.
fn image_panels(
    config: &AppConfig,
    combined: &PriceTable,
    resolver: &(dyn ImageResolver + Send + Sync),
) -> String {
    let mut output = String::new();
    for item in &config.catalog {
        let line = match resolve_image(item.id, combined, resolver) {
            ImageLookup::Available(url) => url,
            ImageLookup::Unavailable => {
                ui::style_text("No image available", ui::StyleType::Subtle)
            }
        };
        output.push_str(&format!(
            "▸ {}\n    {}\n",
            ui::style_text(&item.name, ui::StyleType::TotalLabel),
            line
        ));
    }
    output
}

/// Renders the whole dashboard page for one filter state.
pub fn render_page(
    config: &AppConfig,
    data: &DashboardData,
    view: &FilteredView,
    resolver: &(dyn ImageResolver + Send + Sync),
    options: &RenderOptions,
) -> String {
    let base = data.rates.base();
    let mut output = format!(
        "{}\n{}\n\n",
        ui::style_text("Lego prices around the world", ui::StyleType::Title),
        ui::style_text(
            &format!(
                "Fetched {} ({} listings)",
                data.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"),
                data.combined.len()
            ),
            ui::StyleType::Subtle
        )
    );

    output.push_str(&ui::style_text("Exchange Rates:", ui::StyleType::Header));
    output.push('\n');
    output.push_str(&rates_table(&data.rates));
    output.push_str("\n\n");

    output.push_str(&selection_summary(config, view));

    if !data.warnings.is_empty() {
        output.push('\n');
        for warning in &data.warnings {
            output.push_str(&ui::style_text(&format!("⚠ {warning}"), ui::StyleType::Error));
            output.push('\n');
        }
    }

    output.push_str(&format!("\n{}\n\n", ui::separator(options.width)));
    output.push_str(&average_plot(&view.averages, base).render(options.width));
    output.push('\n');
    output.push_str(&distribution_plot(&view.filtered, base).render(options.width));
    output.push('\n');

    output.push_str(&ui::style_text("All prices:", ui::StyleType::Title));
    output.push('\n');
    if view.filtered.is_empty() {
        output.push_str("  No prices match the current selection\n");
    } else {
        output.push_str(&prices_table(&view.filtered, base));
        output.push('\n');
    }

    if options.show_images {
        output.push_str(&format!(
            "\n{}\n",
            ui::style_text("Pictures of Lego:", ui::StyleType::Title)
        ));
        output.push_str(&image_panels(config, &data.combined, resolver));
    }

    output
}
