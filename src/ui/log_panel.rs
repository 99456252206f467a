//! Scrolling progress pane

use eframe::egui::{self, Color32, RichText};

/// One line of the progress pane
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub text: String,
    pub level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl LogLine {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: LogLevel::Info,
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: LogLevel::Warning,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: LogLevel::Error,
        }
    }
}

/// Progress output, newest line kept in view
pub struct LogPanel;

impl LogPanel {
    pub fn show(ui: &mut egui::Ui, lines: &[LogLine]) {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            egui::ScrollArea::vertical()
                .id_salt("progress_log")
                .stick_to_bottom(true)
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for line in lines {
                        let text = RichText::new(&line.text).monospace();
                        let text = match line.level {
                            LogLevel::Info => text,
                            LogLevel::Warning => text.color(Color32::from_rgb(220, 160, 40)),
                            LogLevel::Error => text.color(Color32::from_rgb(220, 70, 70)),
                        };
                        ui.label(text);
                    }
                });
        });
    }
}
