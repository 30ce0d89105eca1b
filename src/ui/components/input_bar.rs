use eframe::egui;

const EMOJIS: &[&str] = &[
    "😀", "😂", "😊", "😍", "🥰", "😘", "😎", "🤔", "😢", "😭", "😡", "👍", "👎", "👏", "🙏",
    "❤️", "💕", "🔥", "✨", "🎉", "🌸", "🍣", "☕", "🌙",
];

/// Input row. Returns trimmed text to send when Enter or Send is pressed.
pub fn render(ui: &mut egui::Ui, input_text: &mut String, enabled: bool) -> Option<String> {
    let mut send = false;
    ui.add_enabled_ui(enabled, |ui| {
        ui.horizontal(|ui| {
            ui.menu_button("😊", |ui| {
                ui.horizontal_wrapped(|ui| {
                    for emoji in EMOJIS {
                        if ui.button(*emoji).clicked() {
                            input_text.push_str(emoji);
                        }
                    }
                });
            });

            let response = ui.add(
                egui::TextEdit::singleline(input_text)
                    .hint_text("Type a message...")
                    .desired_width(ui.available_width() - 60.0),
            );
            if ui.button("Send").clicked() {
                send = true;
            }

            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                send = true;
                response.request_focus();
            }
        });
    });

    let message = input_text.trim();
    if send && enabled && !message.is_empty() {
        let message = message.to_string();
        input_text.clear();
        return Some(message);
    }

    None
}
