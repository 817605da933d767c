use common::models::{Decision, MessageType};

const MAX_REASONS: usize = 3;
const MAX_DIGEST_LINES: usize = 10;

fn header(decision: &Decision) -> String {
    match decision.message_type() {
        MessageType::Combo => "[COMBO] 🧠 High-Quality Setup".to_string(),
        MessageType::Watchlist => "[IDEA] 🟡 Watchlist Setup".to_string(),
        MessageType::TradeFreigabe => "[TRADE] 🟢 Trade-Freigabe".to_string(),
        MessageType::FibAlert => "[FIB] 📐 Fibonacci Alert".to_string(),
        MessageType::ModuleAlert => {
            let module = decision.module_hint().unwrap_or("signal");
            format!("[{}] Setup", module.to_uppercase())
        }
    }
}

fn score_line(decision: &Decision) -> String {
    match decision.message_type() {
        MessageType::Combo => format!("Score: {}/400", decision.score_total),
        MessageType::Watchlist => format!("Score: {}/120", decision.score_total),
        MessageType::TradeFreigabe => format!("Score: {}/150", decision.score_total),
        _ => format!("Score: {}", decision.score_total),
    }
}

/// Plain-text Telegram rendering of a Decision. Presentation only, every
/// field comes from the decision itself.
pub fn build_message(decision: &Decision) -> String {
    let mut parts = vec![
        header(decision),
        format!("🪙 {} | TF: {}", decision.symbol, decision.timeframe),
        score_line(decision),
        format!("Direction: {}", decision.side.as_str().to_uppercase()),
    ];

    parts.push(String::new());
    parts.push("Reasons:".to_string());
    if decision.reasons.is_empty() {
        parts.push("No specific reasons".to_string());
    } else {
        for reason in decision.reasons.iter().take(MAX_REASONS) {
            parts.push(format!("• {}", reason));
        }
    }

    parts.join("\n")
}

/// One "market radar" summary for the unselected high scorers of a pass.
pub fn build_digest(candidates: &[Decision]) -> String {
    let mut lines = vec!["[RADAR] 📡 Good candidates this scan".to_string()];
    for decision in candidates.iter().take(MAX_DIGEST_LINES) {
        lines.push(format!(
            "• {} ({}) — {} {}",
            decision.symbol,
            decision.timeframe,
            decision.signal_type(),
            decision.score_total
        ));
    }
    if candidates.len() > MAX_DIGEST_LINES {
        lines.push(format!("… and {} more", candidates.len() - MAX_DIGEST_LINES));
    }
    lines.join("\n")
}
