use egui::{Color32, FontFamily, FontId, Rounding, Stroke, Style, TextStyle, Visuals};

pub const BG_DEEP: Color32 = Color32::from_rgb(8, 10, 14);
pub const BG_PANEL: Color32 = Color32::from_rgb(14, 16, 22);
pub const BG_WIDGET: Color32 = Color32::from_rgb(24, 27, 36);
pub const BG_WIDGET_HOVER: Color32 = Color32::from_rgb(34, 38, 50);
pub const BG_WIDGET_ACTIVE: Color32 = Color32::from_rgb(44, 50, 66);

pub const TEXT_PRIMARY: Color32 = Color32::from_rgb(180, 182, 188);
pub const TEXT_MUTED: Color32 = Color32::from_rgb(110, 114, 124);
pub const TEXT_BRIGHT: Color32 = Color32::from_rgb(228, 230, 235);

pub const ACCENT_GREEN: Color32 = Color32::from_rgb(70, 170, 90);
pub const ACCENT_RED: Color32 = Color32::from_rgb(190, 60, 55);
pub const ACCENT_BLUE: Color32 = Color32::from_rgb(80, 140, 210);
pub const ACCENT_ORANGE: Color32 = Color32::from_rgb(200, 140, 50);

/// Same hue as the roof surfaces in the viewport.
pub const ROOF_RED: Color32 = Color32::from_rgb(220, 40, 40);

pub const BORDER_SUBTLE: Color32 = Color32::from_rgba_premultiplied(60, 70, 100, 77);
pub const BORDER_ACCENT: Color32 = ACCENT_BLUE;

fn widget(bg: Color32, stroke: Stroke, fg: Color32, expansion: f32) -> egui::style::WidgetVisuals {
    egui::style::WidgetVisuals {
        bg_fill: bg,
        weak_bg_fill: bg,
        bg_stroke: stroke,
        rounding: Rounding::same(4.0),
        fg_stroke: Stroke::new(1.0, fg),
        expansion,
    }
}

pub fn apply_theme(ctx: &egui::Context) {
    let mut style = Style::default();

    style.visuals = Visuals {
        dark_mode: true,
        override_text_color: Some(TEXT_PRIMARY),

        widgets: egui::style::Widgets {
            noninteractive: widget(BG_WIDGET, Stroke::new(1.0, BORDER_SUBTLE), TEXT_MUTED, 0.0),
            inactive: widget(BG_WIDGET, Stroke::new(1.0, BORDER_SUBTLE), TEXT_PRIMARY, 0.0),
            hovered: widget(BG_WIDGET_HOVER, Stroke::new(1.0, BORDER_ACCENT), TEXT_BRIGHT, 1.0),
            active: widget(BG_WIDGET_ACTIVE, Stroke::new(2.0, ACCENT_BLUE), TEXT_BRIGHT, 1.0),
            open: widget(BG_WIDGET_ACTIVE, Stroke::new(1.0, BORDER_ACCENT), TEXT_BRIGHT, 0.0),
        },

        selection: egui::style::Selection {
            bg_fill: ACCENT_BLUE.gamma_multiply(0.4),
            stroke: Stroke::new(1.0, ACCENT_BLUE),
        },

        hyperlink_color: ACCENT_BLUE,
        faint_bg_color: BG_PANEL,
        extreme_bg_color: BG_DEEP,
        code_bg_color: BG_DEEP,
        warn_fg_color: ACCENT_ORANGE,
        error_fg_color: ACCENT_RED,

        window_rounding: Rounding::same(6.0),
        window_fill: BG_PANEL,
        window_stroke: Stroke::new(1.0, BORDER_SUBTLE),
        panel_fill: BG_PANEL,

        slider_trailing_fill: true,
        menu_rounding: Rounding::same(4.0),
        ..Visuals::dark()
    };

    style.spacing.item_spacing = egui::vec2(8.0, 6.0);
    style.spacing.window_margin = egui::Margin::same(12.0);
    style.spacing.button_padding = egui::vec2(8.0, 4.0);

    style.text_styles = [
        (TextStyle::Small, FontId::new(11.0, FontFamily::Proportional)),
        (TextStyle::Body, FontId::new(14.0, FontFamily::Proportional)),
        (TextStyle::Button, FontId::new(14.0, FontFamily::Proportional)),
        (TextStyle::Heading, FontId::new(18.0, FontFamily::Proportional)),
        (TextStyle::Monospace, FontId::new(13.0, FontFamily::Monospace)),
    ]
    .into();

    ctx.set_style(style);
}
