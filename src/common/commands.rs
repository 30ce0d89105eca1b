/// Lệnh UI gửi xuống chat session.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    SendMessage(String),
    /// Translate a peer message, or flip the visibility of a cached translation.
    /// - message_id: id của tin nhắn cần dịch
    /// - content: nội dung gốc
    /// - target_language: ngôn ngữ đích đang chọn
    ToggleTranslation {
        message_id: String,
        content: String,
        target_language: String,
    },
    /// Logout / navigation away.
    Close,
}
