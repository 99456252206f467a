//! UI components for the notification generator

pub mod controls;
pub mod log_panel;
