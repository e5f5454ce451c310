use crate::core::strings::first_quoted;
use crate::types::attributes::{AttrType, AttributeDef, AttributeValue};
use crate::types::database::Database;
use crate::types::frame_id::CAN_EFF_MASK;

/// `BA_ "<name>" [BU_ <node> | BO_ <id> | SG_ <id> <signal>] <value>;`
///
/// Assigns an attribute value to the database or to a specific entity.
pub(crate) fn decode(db: &mut Database, line: &str) {
    let trimmed = line.trim().trim_end_matches(';');
    let mut parts = trimmed.split_ascii_whitespace();

    match parts.next() {
        Some("BA_") => {}
        _ => return,
    }

    let Some(name_token) = parts.next() else {
        return;
    };
    let name = name_token.trim_matches('"').to_string();

    let scope = parts.clone().next();
    match scope {
        Some("BU_") => {
            parts.next();
            let Some(node_name) = parts.next().map(str::to_string) else {
                return;
            };
            let rest: String = parts.collect::<Vec<_>>().join(" ");
            let def = db.node_attr_spec.get(&name).and_then(|spec| spec.def.clone());
            let Some(value) = parse_value(&rest, def.as_ref()) else {
                return;
            };
            if let Some(node) = db.get_node_by_name_mut(&node_name) {
                node.attributes.insert(name, value);
            }
        }
        Some("BO_") => {
            parts.next();
            let Some(id) = parts.next().and_then(|token| token.parse::<u32>().ok()) else {
                return;
            };
            let rest: String = parts.collect::<Vec<_>>().join(" ");
            let def = db.msg_attr_spec.get(&name).and_then(|spec| spec.def.clone());
            let Some(value) = parse_value(&rest, def.as_ref()) else {
                return;
            };
            let Some(key) = db.get_msg_key_by_id(id & CAN_EFF_MASK) else {
                return;
            };
            if let Some(message) = db.get_message_by_key_mut(key) {
                message.attributes.insert(name, value);
            }
        }
        Some("SG_") => {
            parts.next();
            let Some(id) = parts.next().and_then(|token| token.parse::<u32>().ok()) else {
                return;
            };
            let Some(signal_name) = parts.next().map(str::to_string) else {
                return;
            };
            let rest: String = parts.collect::<Vec<_>>().join(" ");
            let def = db.sig_attr_spec.get(&name).and_then(|spec| spec.def.clone());
            let Some(value) = parse_value(&rest, def.as_ref()) else {
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
                signal.attributes.insert(name, value);
            }
        }
        _ => {
            let rest: String = parts.collect::<Vec<_>>().join(" ");
            let def = db.db_attr_spec.get(&name).and_then(|spec| spec.def.clone());
            let Some(value) = parse_value(&rest, def.as_ref()) else {
                return;
            };
            db.attributes.insert(name, value);
        }
    }
}

/// Types a raw attribute value through its `BA_DEF_` definition; with
/// no definition the shape of the token decides.
fn parse_value(raw: &str, def: Option<&AttributeDef>) -> Option<AttributeValue> {
    let raw = raw.trim();

    match def.map(|def| def.kind) {
        Some(AttrType::String) => Some(AttributeValue::Str(first_quoted(raw)?)),
        Some(AttrType::Int) => Some(AttributeValue::Int(raw.parse().ok()?)),
        Some(AttrType::Hex) => Some(AttributeValue::Hex(raw.parse().ok()?)),
        Some(AttrType::Float) => Some(AttributeValue::Float(raw.parse().ok()?)),
        Some(AttrType::Enum) => {
            if raw.starts_with('"') {
                return Some(AttributeValue::Enum(first_quoted(raw)?));
            }
            // Numeric assignment indexes the enum table.
            let index: usize = raw.parse().ok()?;
            let label = def?.enum_values.get(index)?.clone();
            Some(AttributeValue::Enum(label))
        }
        None => {
            if raw.starts_with('"') {
                Some(AttributeValue::Str(first_quoted(raw)?))
            } else if let Ok(value) = raw.parse::<i64>() {
                Some(AttributeValue::Int(value))
            } else if let Ok(value) = raw.parse::<f64>() {
                Some(AttributeValue::Float(value))
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ba_def_;

    #[test]
    fn test_database_attribute() {
        let mut db = Database::default();
        ba_def_::decode(&mut db, r#"BA_DEF_  "ProtocolType" STRING;"#);
        decode(&mut db, r#"BA_ "ProtocolType" "J1939";"#);
        assert_eq!(db.protocol_type(), Some("J1939"));
    }

    #[test]
    fn test_untyped_attribute_is_inferred() {
        let mut db = Database::default();
        decode(&mut db, r#"BA_ "Baudrate" 500000;"#);
        assert_eq!(
            db.attributes.get("Baudrate"),
            Some(&AttributeValue::Int(500_000))
        );
    }

    #[test]
    fn test_signal_attribute() {
        let mut db = Database::default();
        ba_def_::decode(&mut db, r#"BA_DEF_ SG_  "GenSigStartValue" INT 0 10000;"#);
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

        decode(&mut db, r#"BA_ "GenSigStartValue" SG_ 500 speed 42;"#);
        let signal = db.get_signal_by_name("speed").unwrap();
        assert_eq!(signal.gen_sig_start_value(&db), Some(42.0));
    }

    #[test]
    fn test_enum_attribute_by_index() {
        let mut db = Database::default();
        ba_def_::decode(&mut db, r#"BA_DEF_ "UseGMParameterIDs" ENUM "No", "Yes";"#);
        decode(&mut db, r#"BA_ "UseGMParameterIDs" 1;"#);
        assert!(db.use_gm_parameter_ids());
    }
}
