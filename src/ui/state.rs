pub struct UiState {
    pub document_name: String,

    pub vsync_enabled: bool,
    pub show_stats: bool,
    pub show_help: bool,

    pub fps: f32,
}

impl UiState {
    pub fn new(document_name: impl Into<String>, vsync: bool) -> Self {
        Self {
            document_name: document_name.into(),
            vsync_enabled: vsync,
            ..Self::default()
        }
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            document_name: String::new(),

            vsync_enabled: false,
            show_stats: true,
            show_help: true,

            fps: 0.0,
        }
    }
}
