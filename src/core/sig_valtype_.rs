use crate::types::database::Database;
use crate::types::frame_id::CAN_EFF_MASK;
use crate::types::signal::Signess;

/// `SIG_VALTYPE_ <frame_id> <signal> : <type>;`
///
/// Type 1 promotes the signal to IEEE single precision, type 2 to
/// double precision; 0 reverts to an integer interpretation.
pub(crate) fn decode(db: &mut Database, line: &str) {
    let trimmed = line.trim().trim_end_matches(';');
    let mut split_colon = trimmed.splitn(2, ':');
    let left = split_colon.next().unwrap_or("");
    let right = split_colon.next().unwrap_or("").trim();

    let mut parts = left.split_ascii_whitespace();
    match parts.next() {
        Some("SIG_VALTYPE_") => {}
        _ => return,
    }

    let Some(id) = parts.next().and_then(|token| token.parse::<u32>().ok()) else {
        return;
    };
    let Some(signal_name) = parts.next() else {
        return;
    };
    let Ok(valtype) = right.parse::<u8>() else {
        return;
    };

    let Some(sig_key) = db.get_msg_key_by_id(id & CAN_EFF_MASK).and_then(|key| {
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
        signal.sign = match valtype {
            1 => Signess::IeeeFloat,
            2 => Signess::IeeeDouble,
            _ => signal.sign,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::signal::{Endianness, MuxRole};

    #[test]
    fn test_float_promotion() {
        let mut db = Database::default();
        db.add_message("Floats", 0x400, 8, None);
        db.add_signal(
            "ratio",
            7,
            32,
            Endianness::Motorola,
            Signess::Unsigned,
            1.0,
            0.0,
            None,
            None,
            "",
            Vec::new(),
            MuxRole::None,
            Vec::new(),
        );

        decode(&mut db, "SIG_VALTYPE_ 1024 ratio : 1;");
        assert_eq!(
            db.get_signal_by_name("ratio").unwrap().sign,
            Signess::IeeeFloat
        );
    }
}
