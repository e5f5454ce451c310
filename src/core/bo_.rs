use crate::types::database::Database;

/// `BO_ <ID> <MESSAGE_NAME>: <BYTE_LENGTH> <SENDER_NODE>`
///
/// The ID is the on-wire DBC value: bit 31 carries the extended-frame
/// flag.
pub(crate) fn decode(db: &mut Database, line: &str) {
    let parts: Vec<&str> = line.split_whitespace().collect();

    if parts.len() < 4 {
        // Too short lines are not considered.
        return;
    }

    let Ok(dbc_id) = parts[1].parse::<u32>() else {
        return;
    };
    let name: &str = parts[2].trim_end_matches(':');
    if name.is_empty() {
        return;
    }
    let byte_length: u16 = parts[3].parse().unwrap_or(0);
    let sender: Option<&str> = parts.get(4).copied();

    db.add_message(name, dbc_id, byte_length, sender);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::message::IdFormat;

    #[test]
    fn test_dbc_parse_messages() {
        let mut db = Database::default();

        decode(&mut db, "BO_ 960 Key_Status: 4 BCM");

        // Only one message must be added
        assert_eq!(db.iter_messages().count(), 1);

        let msg = db.get_message_by_name("Key_Status").unwrap();
        assert_eq!(msg.id, 960);
        assert_eq!(msg.id_hex, "0x3C0");
        assert_eq!(msg.byte_length, 4);
        assert_eq!(msg.id_format, IdFormat::Standard);
        assert!(msg.signals.is_empty());
        assert!(msg.comment.is_empty());

        let sender = msg.senders(&db).next().unwrap();
        assert_eq!(sender.name, "BCM");
    }

    #[test]
    fn test_extended_flag_on_wire() {
        let mut db = Database::default();
        decode(&mut db, "BO_ 2566806018 Diag_Response: 8 Motor");
        let msg = db.get_message_by_name("Diag_Response").unwrap();
        assert_eq!(msg.id, 2566806018 & 0x1FFF_FFFF);
        assert_eq!(msg.id_format, IdFormat::Extended);
    }
}
