use egui::{Color32, Context, RichText, ScrollArea, Ui};

use crate::citygml::{ExtractionStats, LoadStatus, Progress};
use crate::geometry::BoundingBox;
use crate::ui::state::UiState;
use crate::ui::theme::*;

#[derive(Default)]
pub struct UiActions {
    pub reset_view: bool,
}

/// Read-only snapshot of what the side panel shows for one frame.
pub struct PanelView<'a> {
    pub status: &'a LoadStatus,
    pub progress: Progress,
    pub stats: &'a ExtractionStats,
    pub bounds: &'a BoundingBox,
    pub camera_distance: f32,
    pub vertex_count: u32,
}

pub fn draw_side_panel(ctx: &Context, state: &mut UiState, view: &PanelView<'_>) -> UiActions {
    let mut actions = UiActions::default();

    egui::SidePanel::right("control_panel")
        .min_width(300.0)
        .max_width(420.0)
        .default_width(340.0)
        .frame(egui::Frame::default().fill(BG_PANEL).inner_margin(16.0))
        .show(ctx, |ui| {
            ScrollArea::vertical().show(ui, |ui| {
                ui.heading(RichText::new("CityGML 3D").strong());
                ui.add_space(4.0);
                ui.label(
                    RichText::new(&state.document_name)
                        .color(TEXT_MUTED)
                        .size(11.0),
                );
                ui.add_space(16.0);

                section_header(ui, "DOCUMENT");
                load_status(ui, view.status, view.progress);
                ui.add_space(16.0);

                ui.separator();
                ui.add_space(12.0);

                section_header(ui, "VIEW");
                ui.horizontal(|ui| {
                    ui.checkbox(&mut state.vsync_enabled, "VSync");
                    ui.checkbox(&mut state.show_stats, "Stats");
                    ui.checkbox(&mut state.show_help, "Help");
                });
                ui.add_space(4.0);
                if ui
                    .add_enabled(
                        matches!(view.status, LoadStatus::Finished | LoadStatus::Failed(_)),
                        egui::Button::new("Reset view").min_size(egui::vec2(120.0, 28.0)),
                    )
                    .clicked()
                {
                    actions.reset_view = true;
                }
                ui.add_space(16.0);

                if state.show_stats {
                    ui.separator();
                    ui.add_space(12.0);
                    stats_panel(ui, view, state.fps);
                    ui.add_space(16.0);
                    bounds_grid(ui, view.bounds);
                }
            });
        });

    actions
}

fn section_header(ui: &mut Ui, text: &str) {
    ui.label(RichText::new(text).color(TEXT_MUTED).size(11.0).strong());
    ui.add_space(4.0);
}

fn load_status(ui: &mut Ui, status: &LoadStatus, progress: Progress) {
    ui.add(
        egui::ProgressBar::new(progress.fraction())
            .desired_width(ui.available_width())
            .show_percentage(),
    );
    ui.add_space(4.0);

    let (text, color) = status_text(status, progress);
    ui.label(RichText::new(text).color(color).size(11.0));

    if let LoadStatus::Failed(message) = status {
        ui.add_space(6.0);
        egui::Frame::default()
            .fill(Color32::from_rgb(40, 15, 15))
            .stroke(egui::Stroke::new(1.0, ACCENT_RED))
            .rounding(4.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.label(RichText::new(message).color(ACCENT_RED).size(11.0));
            });
    }
}

fn status_text(status: &LoadStatus, progress: Progress) -> (String, Color32) {
    match status {
        LoadStatus::Loading(_) => (
            format!(
                "Loading {} / {}",
                fmt_bytes(progress.consumed),
                fmt_bytes(progress.total)
            ),
            ACCENT_ORANGE,
        ),
        LoadStatus::Finished => (format!("Loaded {}", fmt_bytes(progress.consumed)), ACCENT_GREEN),
        LoadStatus::Failed(_) => ("Stopped, partial mesh shown".to_string(), ACCENT_RED),
    }
}

fn stats_panel(ui: &mut Ui, view: &PanelView<'_>, fps: f32) {
    section_header(ui, "STATISTICS");
    egui::Frame::default()
        .fill(BG_WIDGET)
        .stroke(egui::Stroke::new(1.0, BORDER_SUBTLE))
        .rounding(6.0)
        .inner_margin(12.0)
        .show(ui, |ui| {
            ui.style_mut().override_font_id =
                Some(egui::FontId::new(11.0, egui::FontFamily::Monospace));

            let fps_color = if fps >= 60.0 {
                ACCENT_GREEN
            } else if fps >= 30.0 {
                ACCENT_ORANGE
            } else {
                ACCENT_RED
            };
            let stats = view.stats;

            egui::Grid::new("stats")
                .num_columns(2)
                .spacing([20.0, 4.0])
                .show(ui, |ui| {
                    stat_row(ui, "FPS", format!("{:.0}", fps), fps_color);
                    stat_row(ui, "Polygons", fmt_num(stats.polygons), TEXT_PRIMARY);
                    stat_row(ui, "Triangles", fmt_num(stats.triangles), ACCENT_BLUE);
                    stat_row(ui, "Roof", fmt_num(stats.roof_polygons), ROOF_RED);
                    stat_row(ui, "Wall", fmt_num(stats.wall_polygons), TEXT_PRIMARY);
                    stat_row(ui, "Floor", fmt_num(stats.floor_polygons), TEXT_PRIMARY);
                    stat_row(
                        ui,
                        "Degenerate",
                        fmt_num(stats.degenerate_polygons),
                        warn_color(stats.degenerate_polygons),
                    );
                    stat_row(
                        ui,
                        "Bad tokens",
                        fmt_num(stats.invalid_tokens),
                        warn_color(stats.invalid_tokens),
                    );
                    stat_row(ui, "Uploaded", fmt_num(view.vertex_count as usize), TEXT_PRIMARY);
                    stat_row(ui, "Distance", format!("{:.1}", view.camera_distance), TEXT_PRIMARY);
                });
        });
}

fn stat_row(ui: &mut Ui, label: &str, value: String, color: Color32) {
    ui.label(RichText::new(label).color(TEXT_MUTED));
    ui.label(RichText::new(value).color(color));
    ui.end_row();
}

fn warn_color(count: usize) -> Color32 {
    if count > 0 { ACCENT_ORANGE } else { TEXT_PRIMARY }
}

fn bounds_grid(ui: &mut Ui, bounds: &BoundingBox) {
    section_header(ui, "BOUNDS");
    if bounds.is_empty() {
        ui.label(RichText::new("no coordinates yet").color(TEXT_MUTED).size(11.0));
        return;
    }

    let (lower, upper, center) = (bounds.lower(), bounds.upper(), bounds.center());
    egui::Grid::new("bounds")
        .num_columns(4)
        .spacing([8.0, 4.0])
        .show(ui, |ui| {
            ui.label("");
            for heading in ["Min", "Max", "Center"] {
                ui.label(RichText::new(heading).color(TEXT_MUTED).size(10.0));
            }
            ui.end_row();

            for (i, label) in ["X", "Y", "Z"].iter().enumerate() {
                ui.label(*label);
                ui.label(format!("{:.2}", lower[i]));
                ui.label(format!("{:.2}", upper[i]));
                ui.label(format!("{:.2}", center[i]));
                ui.end_row();
            }
        });
}

pub fn draw_help_overlay(ctx: &Context, distance: f32, elevation: f32) {
    egui::Area::new(egui::Id::new("help_overlay"))
        .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(12.0, -12.0))
        .show(ctx, |ui| {
            egui::Frame::default()
                .fill(Color32::from_black_alpha(180))
                .rounding(6.0)
                .inner_margin(10.0)
                .show(ui, |ui| {
                    ui.style_mut().override_font_id =
                        Some(egui::FontId::new(11.0, egui::FontFamily::Monospace));
                    ui.label(
                        RichText::new("LMB+Drag - Orbit | RMB+Drag - Pan | Scroll - Dolly")
                            .color(TEXT_MUTED),
                    );
                    ui.label(
                        RichText::new(format!(
                            "Distance: {:.1} | Elevation: {:.1}°",
                            distance,
                            elevation.to_degrees()
                        ))
                        .color(TEXT_MUTED),
                    );
                });
        });
}

fn fmt_num(n: usize) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        format!("{}", n)
    }
}

fn fmt_bytes(n: u64) -> String {
    const KIB: f64 = 1024.0;
    let n = n as f64;
    if n >= KIB * KIB * KIB {
        format!("{:.2} GiB", n / (KIB * KIB * KIB))
    } else if n >= KIB * KIB {
        format!("{:.1} MiB", n / (KIB * KIB))
    } else if n >= KIB {
        format!("{:.1} KiB", n / KIB)
    } else {
        format!("{} B", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formatting() {
        assert_eq!(fmt_num(999), "999");
        assert_eq!(fmt_num(12_345), "12.3K");
        assert_eq!(fmt_num(2_500_000), "2.50M");
        assert_eq!(fmt_bytes(512), "512 B");
        assert_eq!(fmt_bytes(512 * 1024), "512.0 KiB");
        assert_eq!(fmt_bytes(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn test_status_text() {
        let progress = Progress {
            consumed: 1024,
            total: 4096,
        };
        let (text, _) = status_text(&LoadStatus::Loading(progress), progress);
        assert_eq!(text, "Loading 1.0 KiB / 4.0 KiB");

        let (_, color) = status_text(&LoadStatus::Failed("boom".into()), progress);
        assert_eq!(color, ACCENT_RED);
    }
}
