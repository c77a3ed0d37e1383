pub mod chart_panel;
pub mod chat_panel;
pub mod header;
pub mod help_overlay;
pub mod log_panel;
pub mod login_screen;
pub mod metrics_panel;
pub mod progress_panel;
pub mod prompt_panel;
pub mod results_panel;
pub mod upload_panel;
