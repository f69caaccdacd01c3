//! Built-in bilingual texts
//!
//! Every assistant-facing string is written twice: Japanese first, Korean
//! second, one per line.

/// System instruction sent as the first message of every conversation.
pub const SYSTEM: &str = "You are Tomoni, a warm bilingual assistant for seniors. \
Always respond in two lines per paragraph: first Japanese, then Korean. \
Keep sentences short and friendly.";

/// First assistant turn shown before the user types anything.
pub const GREETING: &str = "こんにちは！Tomoni AIです。\n안녕하세요! Tomoni AI입니다.\nご用件をどうぞ。\n무엇을 도와드릴까요?";

const UNKNOWN_ERROR_JA: &str = "不明なエラー";
const UNKNOWN_ERROR_KO: &str = "알 수 없는 오류";

/// Assistant turn reported when an exchange fails.
pub fn connection_failed(detail: &str) -> String {
    let detail = detail.trim();
    let (ja, ko) = if detail.is_empty() {
        (UNKNOWN_ERROR_JA, UNKNOWN_ERROR_KO)
    } else {
        (detail, detail)
    };
    format!("接続に失敗: {ja}\n연결 실패: {ko}")
}
