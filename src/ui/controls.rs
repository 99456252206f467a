//! Destination picker and generation buttons

use std::path::Path;

use eframe::egui;

/// What the operator asked for this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    PickFolder,
    GenerateIndividual,
    GenerateConsolidated,
    OpenFolder,
}

/// Top section of the window
pub struct ControlsPanel;

impl ControlsPanel {
    /// Draw the controls. Generation buttons are disabled while `busy`.
    pub fn show(ui: &mut egui::Ui, output_dir: Option<&Path>, busy: bool) -> Option<ControlAction> {
        let mut action = None;

        ui.vertical_centered(|ui| {
            ui.heading("Student notification generator");
        });
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            if ui
                .add_enabled(!busy, egui::Button::new("Select destination folder"))
                .clicked()
            {
                action = Some(ControlAction::PickFolder);
            }
            match output_dir {
                Some(dir) => ui.label(dir.display().to_string()),
                None => ui.weak("No folder selected"),
            };
        });

        ui.add_space(8.0);
        let ready = !busy && output_dir.is_some();
        let button_size = egui::vec2(ui.available_width(), 28.0);
        if ui
            .add_enabled(ready, egui::Button::new("1. Generate individual files").min_size(button_size))
            .clicked()
        {
            action = Some(ControlAction::GenerateIndividual);
        }
        if ui
            .add_enabled(ready, egui::Button::new("2. Generate single document").min_size(button_size))
            .clicked()
        {
            action = Some(ControlAction::GenerateConsolidated);
        }

        ui.horizontal(|ui| {
            if busy {
                ui.spinner();
                ui.label("Generating...");
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let exists = output_dir.is_some_and(Path::is_dir);
                if ui.add_enabled(exists, egui::Button::new("Open folder")).clicked() {
                    action = Some(ControlAction::OpenFolder);
                }
            });
        });

        action
    }
}
