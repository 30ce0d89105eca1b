use chrono::Local;
use eframe::egui;

use crate::common::{Identity, Message};
use crate::sync::{ERROR_LABEL, TranslationState, day_header, group_by_day};
use crate::ui::state::AppState;

/// Translate (or hide) click on a peer message.
pub struct TranslateClick {
    pub message_id: String,
    pub content: String,
}

pub fn render(ui: &mut egui::Ui, state: &AppState, identity: &Identity) -> Option<TranslateClick> {
    if state.is_loading {
        ui.centered_and_justified(|ui| {
            ui.label(egui::RichText::new("Loading messages...").weak());
        });
        return None;
    }

    if state.messages.is_empty() {
        ui.vertical_centered(|ui| {
            ui.add_space(80.0);
            ui.label(egui::RichText::new("No messages yet").weak());
            ui.label(egui::RichText::new("Send a message to start the conversation").small().weak());
        });
        return None;
    }

    let mut click = None;
    let today = Local::now().date_naive();

    egui::ScrollArea::vertical()
        .stick_to_bottom(true)
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for group in group_by_day(&state.messages, &Local) {
                ui.vertical_centered(|ui| {
                    ui.label(egui::RichText::new(day_header(group.date, today)).small().weak());
                });
                for message in group.messages {
                    if let Some(clicked) = render_message(ui, state, identity, message) {
                        click = Some(clicked);
                    }
                }
                ui.add_space(12.0);
            }
        });

    click
}

fn render_message(
    ui: &mut egui::Ui,
    state: &AppState,
    identity: &Identity,
    message: &Message,
) -> Option<TranslateClick> {
    let own = message.is_from(&identity.current);
    let align = if own { egui::Align::Max } else { egui::Align::Min };
    let bubble = if own {
        ui.visuals().selection.bg_fill
    } else {
        ui.visuals().faint_bg_color
    };
    let entry = state.translation(&message.id);
    let time = message.created_at.with_timezone(&Local).format("%H:%M").to_string();
    let mut click = None;

    ui.with_layout(egui::Layout::top_down(align), |ui| {
        egui::Frame::new()
            .fill(bubble)
            .corner_radius(12.0)
            .inner_margin(egui::Margin::symmetric(12, 8))
            .show(ui, |ui| {
                ui.label(message.content.as_str());
            });

        if let Some(text) = entry.visible_text() {
            egui::Frame::new()
                .stroke(ui.visuals().widgets.noninteractive.bg_stroke)
                .corner_radius(8.0)
                .inner_margin(egui::Margin::symmetric(12, 6))
                .show(ui, |ui| {
                    ui.label(egui::RichText::new(text).italics());
                });
        }

        if own {
            ui.label(egui::RichText::new(&time).small().weak());
            return;
        }

        // Translation is only offered on the peer's messages
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new(&time).small().weak());
            if entry.is_loading() {
                ui.spinner();
            } else if ui.small_button(format!("🌐 {}", entry.label())).clicked() {
                click = Some(TranslateClick {
                    message_id: message.id.clone(),
                    content: message.content.clone(),
                });
            }
            if entry.state() == TranslationState::Error {
                ui.colored_label(ui.visuals().error_fg_color, ERROR_LABEL);
            }
        });
    });
    ui.add_space(4.0);

    click
}
