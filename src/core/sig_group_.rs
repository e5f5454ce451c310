use crate::types::database::Database;
use crate::types::frame_id::CAN_EFF_MASK;
use crate::types::message::SignalGroup;

/// `SIG_GROUP_ <frame_id> <name> <repetitions> : <signal> <signal> ...;`
pub(crate) fn decode(db: &mut Database, line: &str) {
    let trimmed = line.trim().trim_end_matches(';');
    let mut split_colon = trimmed.splitn(2, ':');
    let left = split_colon.next().unwrap_or("");
    let right = split_colon.next().unwrap_or("");

    let mut parts = left.split_ascii_whitespace();
    match parts.next() {
        Some("SIG_GROUP_") => {}
        _ => return,
    }

    let Some(id) = parts.next().and_then(|token| token.parse::<u32>().ok()) else {
        return;
    };
    let Some(name) = parts.next() else {
        return;
    };
    let repetitions: u32 = parts
        .next()
        .and_then(|token| token.parse().ok())
        .unwrap_or(1);

    let signal_names: Vec<String> = right
        .split_ascii_whitespace()
        .map(str::to_string)
        .collect();

    let Some(key) = db.get_msg_key_by_id(id & CAN_EFF_MASK) else {
        return;
    };
    if let Some(message) = db.get_message_by_key_mut(key) {
        message.signal_groups.push(SignalGroup {
            name: name.to_string(),
            repetitions,
            signal_names,
        });
    }
}
