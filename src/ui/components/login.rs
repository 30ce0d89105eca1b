use eframe::egui;

use crate::ui::state::LoginForm;

/// Login screen. Returns `(username, password)` when the form is submitted.
pub fn render(ui: &mut egui::Ui, form: &mut LoginForm) -> Option<(String, String)> {
    let mut submit = false;

    ui.vertical_centered(|ui| {
        ui.add_space(60.0);
        ui.heading("Welcome back");
        ui.label(egui::RichText::new("Sign in to continue chatting").weak());
        ui.add_space(20.0);

        ui.label("Username");
        ui.add(egui::TextEdit::singleline(&mut form.username).desired_width(240.0));

        ui.label("Password");
        let response = ui.add(
            egui::TextEdit::singleline(&mut form.password)
                .password(!form.show_password)
                .desired_width(240.0),
        );
        ui.checkbox(&mut form.show_password, "Show password");

        if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            submit = true;
        }
        if ui.button("Sign in").clicked() {
            submit = true;
        }

        if let Some(error) = &form.error {
            ui.colored_label(ui.visuals().error_fg_color, error.as_str());
        }
    });

    if !submit {
        return None;
    }
    form.error = None;
    Some((form.username.trim().to_string(), form.password.clone()))
}
