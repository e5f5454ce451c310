use crate::types::database::Database;
use crate::types::frame_id::CAN_EFF_MASK;
use crate::types::signal::MuxRole;

/// `SG_MUL_VAL_ <frame_id> <signal> <mux_signal> <ranges>;`
///
/// Extended multiplexing: re-targets the signal's switch and replaces
/// its selector set with the expanded ranges (`1-3, 5-5, 7-9`).
pub(crate) fn decode(db: &mut Database, line: &str) {
    let trimmed = line.trim().trim_end_matches(';');
    let mut parts = trimmed.split_ascii_whitespace();

    match parts.next() {
        Some("SG_MUL_VAL_") => {}
        _ => return,
    }

    let Some(id) = parts.next().and_then(|token| token.parse::<u32>().ok()) else {
        return;
    };
    let Some(signal_name) = parts.next() else {
        return;
    };
    let Some(switch_name) = parts.next() else {
        return;
    };

    let ranges: String = parts.collect::<Vec<_>>().join(" ");
    let mut selectors: Vec<i64> = Vec::new();
    for range in ranges.split(',') {
        let range = range.trim();
        if range.is_empty() {
            continue;
        }
        let Some((low, high)) = range.split_once('-') else {
            continue;
        };
        let (Ok(low), Ok(high)) = (low.trim().parse::<i64>(), high.trim().parse::<i64>()) else {
            continue;
        };
        if low > high || high - low > u16::MAX as i64 {
            continue;
        }
        selectors.extend(low..=high);
    }
    if selectors.is_empty() {
        return;
    }

    let Some(msg_key) = db.get_msg_key_by_id(id & CAN_EFF_MASK) else {
        return;
    };
    let find_in_message = |db: &Database, name: &str| {
        db.get_message_by_key(msg_key)?
            .signals
            .iter()
            .copied()
            .find(|&key| db.get_sig_by_key(key).is_some_and(|signal| signal.name == name))
    };
    let Some(sig_key) = find_in_message(db, signal_name) else {
        return;
    };
    let Some(switch_key) = find_in_message(db, switch_name) else {
        return;
    };

    if let Some(switch) = db.get_sig_by_key_mut(switch_key)
        && !switch.mux_role.is_multiplexor()
    {
        switch.mux_role = match switch.mux_role {
            MuxRole::Multiplexed => MuxRole::MultiplexedMultiplexor,
            _ => MuxRole::Multiplexor,
        };
    }

    if let Some(signal) = db.get_sig_by_key_mut(sig_key) {
        signal.mux_switch = Some(switch_key);
        signal.mux_ids = selectors;
        if !signal.mux_role.is_multiplexed() {
            signal.mux_role = match signal.mux_role {
                MuxRole::Multiplexor => MuxRole::MultiplexedMultiplexor,
                _ => MuxRole::Multiplexed,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::signal::{Endianness, Signess};

    fn muxed_db() -> Database {
        let mut db = Database::default();
        db.add_message("Muxed", 0x200, 8, None);
        for (name, role, start) in [
            ("outer", MuxRole::Multiplexor, 7u16),
            ("inner", MuxRole::Multiplexed, 15),
            ("leaf", MuxRole::Multiplexed, 23),
        ] {
            db.add_signal(
                name,
                start,
                8,
                Endianness::Motorola,
                Signess::Unsigned,
                1.0,
                0.0,
                None,
                None,
                "",
                Vec::new(),
                role,
                vec![0],
            );
        }
        db
    }

    #[test]
    fn test_range_expansion() {
        let mut db = muxed_db();
        decode(&mut db, "SG_MUL_VAL_ 512 leaf outer 1-3, 5-5, 7-9;");

        let leaf = db.get_signal_by_name("leaf").unwrap();
        assert_eq!(leaf.mux_ids, vec![1, 2, 3, 5, 7, 8, 9]);
    }

    #[test]
    fn test_retarget_to_nested_switch() {
        let mut db = muxed_db();
        // leaf becomes gated by inner, which becomes a switch itself.
        decode(&mut db, "SG_MUL_VAL_ 512 leaf inner 4-4;");

        let inner_key = db.get_sig_key_by_name("inner").unwrap();
        let leaf = db.get_signal_by_name("leaf").unwrap();
        assert_eq!(leaf.mux_switch, Some(inner_key));
        assert_eq!(leaf.mux_ids, vec![4]);

        let inner = db.get_signal_by_name("inner").unwrap();
        assert_eq!(inner.mux_role, MuxRole::MultiplexedMultiplexor);
    }
}
