use std::collections::BTreeMap;

use crate::types::database::Database;
use crate::types::frame_id::CAN_EFF_MASK;

/// Parse a VAL_ line that defines a value table for a specific signal:
/// `VAL_ <MessageID> <SignalName> <value> "<desc>" ... ;`
pub(crate) fn decode(db: &mut Database, line: &str) {
    let mut tokens = line.trim_start().split_ascii_whitespace();
    if tokens.next() != Some("VAL_") {
        return;
    }
    let Some(message_id) = tokens.next().and_then(|token| token.parse::<u32>().ok()) else {
        return;
    };
    let Some(signal_name) = tokens.next() else {
        return;
    };

    // Collect pairs: numeric value followed by quoted description
    let mut table: BTreeMap<i64, String> = BTreeMap::new();
    let mut t = tokens.peekable();
    while let Some(val_tok) = t.next() {
        if val_tok.starts_with(';') {
            break;
        }
        let value = match val_tok.parse::<i64>() {
            Ok(value) => value,
            Err(_) => break,
        };
        // desc may be a multi-token quoted string
        let mut desc = String::new();
        if let Some(first) = t.next() {
            if first.starts_with('"') {
                desc.push_str(first);
                while !(desc.len() > 1 && desc.trim_end_matches(';').ends_with('"')) {
                    if let Some(next) = t.next() {
                        desc.push(' ');
                        desc.push_str(next);
                    } else {
                        break;
                    }
                }
                desc = desc
                    .trim_end_matches(';')
                    .trim_matches('"')
                    .to_string();
            } else {
                // unexpected token; stop
                break;
            }
        }
        table.insert(value, desc);
    }

    let Some(sig_key) = db.get_msg_key_by_id(message_id & CAN_EFF_MASK).and_then(|key| {
        db.get_message_by_key(key)?
            .signals
            .iter()
            .copied()
            .find(|&sig_key| {
                db.get_sig_by_key(sig_key)
                    .is_some_and(|signal| signal.name == signal_name)
            })
    }) else {
        return;
    };

    if let Some(signal) = db.get_sig_by_key_mut(sig_key) {
        signal.value_table = table;
    }
}
