use eframe::egui;

use crate::common::Identity;

/// Target languages offered in the header, `(code, label)`.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("English", "English"),
    ("Japanese", "日本語 (Japanese)"),
    ("French", "Français (French)"),
    ("Spanish", "Español (Spanish)"),
    ("German", "Deutsch (German)"),
    ("Korean", "한국어 (Korean)"),
    ("Chinese", "中文 (Chinese)"),
    ("Portuguese", "Português (Portuguese)"),
    ("Italian", "Italiano (Italian)"),
    ("Russian", "Русский (Russian)"),
];

#[derive(Default)]
pub struct HeaderActions {
    pub language: Option<String>,
    pub toggle_theme: bool,
    pub logout: bool,
}

pub fn render(
    ui: &mut egui::Ui,
    identity: &Identity,
    target_language: &str,
    dark_mode: bool,
) -> HeaderActions {
    let mut actions = HeaderActions::default();

    ui.horizontal(|ui| {
        let initial = identity
            .peer
            .chars()
            .next()
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_default();
        ui.label(egui::RichText::new(initial).strong().size(20.0));
        ui.vertical(|ui| {
            ui.label(egui::RichText::new(&identity.peer).strong());
            ui.colored_label(egui::Color32::GREEN, "● Online");
        });

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.menu_button("⚙", |ui| {
                ui.label(egui::RichText::new(&identity.current).strong());
                ui.label(egui::RichText::new("Logged in").small().weak());
                ui.separator();
                if ui.button("Sign out").clicked() {
                    actions.logout = true;
                }
            });

            if ui.button(if dark_mode { "☀" } else { "🌙" }).clicked() {
                actions.toggle_theme = true;
            }

            let mut selected = target_language.to_string();
            egui::ComboBox::from_id_salt("target_language")
                .selected_text(format!("🌐 Translate to: {target_language}"))
                .show_ui(ui, |ui| {
                    for (code, label) in LANGUAGES {
                        ui.selectable_value(&mut selected, code.to_string(), *label);
                    }
                });
            if selected != target_language {
                actions.language = Some(selected);
            }
        });
    });

    actions
}
