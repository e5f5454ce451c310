use crate::core::strings::first_quoted;
use crate::types::database::Database;
use crate::types::frame_id::CAN_EFF_MASK;

/// Decode a (possibly pre-accumulated multi-line) `CM_` line:
///
/// - `CM_ "<comment>";` (database comment)
/// - `CM_ BU_ <node> "<comment>";`
/// - `CM_ BO_ <id> "<comment>";`
/// - `CM_ SG_ <id> <signal> "<comment>";`
/// - `CM_ EV_ <name> "<comment>";`
pub(crate) fn decode(db: &mut Database, line: &str) {
    let line = line.trim_start();
    let mut parts = line.split_ascii_whitespace();
    let _cm = parts.next(); // "CM_"

    let Some(target) = parts.next() else {
        return;
    };

    match target {
        "BU_" => {
            let Some(node_name) = parts.next() else {
                return;
            };
            let Some(comment) = first_quoted(line) else {
                return;
            };
            if let Some(node) = db.get_node_by_name_mut(node_name) {
                node.comment = comment;
            }
        }
        "BO_" => {
            let Some(id) = parts.next().and_then(|token| token.parse::<u32>().ok()) else {
                return;
            };
            let Some(comment) = first_quoted(line) else {
                return;
            };
            let Some(key) = db.get_msg_key_by_id(id & CAN_EFF_MASK) else {
                return;
            };
            if let Some(message) = db.get_message_by_key_mut(key) {
                message.comment = comment;
            }
        }
        "SG_" => {
            let Some(id) = parts.next().and_then(|token| token.parse::<u32>().ok()) else {
                return;
            };
            let Some(signal_name) = parts.next() else {
                return;
            };
            let Some(comment) = first_quoted(line) else {
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
                signal.comment = comment;
            }
        }
        "EV_" => {
            let Some(name) = parts.next() else {
                return;
            };
            let Some(comment) = first_quoted(line) else {
                return;
            };
            db.env_var_comments.insert(name.to_string(), comment);
        }
        _ => {
            // Network/global comment: CM_ "...";
            if target.starts_with('"')
                && let Some(comment) = first_quoted(line)
            {
                db.comment = comment;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_comment() {
        let mut db = Database::default();
        decode(&mut db, r#"CM_ "Vehicle network";"#);
        assert_eq!(db.comment, "Vehicle network");
    }

    #[test]
    fn test_message_comment() {
        let mut db = Database::default();
        db.add_message("TestMessage", 2549880610, 16, None);

        decode(&mut db, r#"CM_ BO_ 2549880610 "Example comment";"#);
        assert_eq!(
            db.get_message_by_name("TestMessage").unwrap().comment,
            "Example comment"
        );
    }

    #[test]
    fn test_message_comment_id_not_found() {
        let mut db = Database::default();
        decode(&mut db, r#"CM_ BO_ 999999 "Never assigned";"#);
        assert_eq!(db.iter_messages().count(), 0);
    }

    #[test]
    fn test_signal_comment_with_escapes() {
        let mut db = Database::default();
        db.add_message("M", 500, 8, None);
        db.add_signal(
            "speed",
            7,
            8,
            Default::default(),
            Default::default(),
            1.0,
            0.0,
            None,
            None,
            "",
            Vec::new(),
            Default::default(),
            Vec::new(),
        );

        decode(&mut db, r#"CM_ SG_ 500 speed "the \"real\" speed";"#);
        assert_eq!(
            db.get_signal_by_name("speed").unwrap().comment,
            "the \"real\" speed"
        );
    }

    #[test]
    fn test_env_var_comment() {
        let mut db = Database::default();
        decode(&mut db, r#"CM_ EV_ EngineTemp "simulated input";"#);
        assert_eq!(
            db.env_var_comments.get("EngineTemp").map(String::as_str),
            Some("simulated input")
        );
    }
}
