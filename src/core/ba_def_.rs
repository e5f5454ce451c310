use std::collections::BTreeMap;

use crate::core::strings::collect_all_quoted;
use crate::types::attributes::{AttrType, AttributeDef, AttributeSpec};
use crate::types::database::Database;

/// `BA_DEF_ [BU_|BO_|SG_] "<name>" <TYPE> [<min> <max> | "<enum>", ...];`
///
/// The optional second token scopes the definition to nodes, messages
/// or signals; without it the attribute applies to the database.
pub(crate) fn decode(db: &mut Database, line: &str) {
    // keep a copy to extract quoted strings for Enum
    let line_copy: &str = line.trim().trim_end_matches(';');

    let mut parts = line_copy.split_ascii_whitespace();

    match parts.next() {
        Some("BA_DEF_") => {}
        _ => return,
    }

    let mut scope: Option<&str> = None;
    let mut name_token = match parts.next() {
        Some(token) => token,
        None => return,
    };
    if matches!(name_token, "BU_" | "BO_" | "SG_" | "EV_") {
        scope = Some(name_token);
        name_token = match parts.next() {
            Some(token) => token,
            None => return,
        };
    }
    let name: &str = name_token.trim_matches('"');

    let attr_type: &str = match parts.next() {
        Some(token) => token,
        None => return,
    };

    let mut attr_def = AttributeDef {
        name: name.to_string(),
        ..Default::default()
    };

    match attr_type {
        "STRING" => {
            attr_def.kind = AttrType::String;
        }
        "INT" => {
            attr_def.kind = AttrType::Int;
            attr_def.int_min = match parts.next() {
                Some(token) => Some(token.parse::<i64>().unwrap_or_default()),
                None => return,
            };
            attr_def.int_max = match parts.next() {
                Some(token) => Some(token.parse::<i64>().unwrap_or_default()),
                None => return,
            };
        }
        "HEX" => {
            attr_def.kind = AttrType::Hex;
            attr_def.hex_min = match parts.next() {
                Some(token) => Some(token.parse::<u64>().unwrap_or_default()),
                None => return,
            };
            attr_def.hex_max = match parts.next() {
                Some(token) => Some(token.parse::<u64>().unwrap_or_default()),
                None => return,
            };
        }
        "FLOAT" => {
            attr_def.kind = AttrType::Float;
            attr_def.float_min = match parts.next() {
                Some(token) => Some(token.parse::<f64>().unwrap_or_default()),
                None => return,
            };
            attr_def.float_max = match parts.next() {
                Some(token) => Some(token.parse::<f64>().unwrap_or_default()),
                None => return,
            };
        }
        "ENUM" => {
            attr_def.kind = AttrType::Enum;
            let mut quoted: Vec<String> = collect_all_quoted(line_copy);
            if !quoted.is_empty() {
                quoted.remove(0); // remove attribute name
            }
            attr_def.enum_values = quoted;
        }
        _ => return,
    }

    let spec = AttributeSpec {
        def: Some(attr_def),
        default: None,
    };
    target_spec_map(db, scope).insert(name.to_string(), spec);
}

pub(crate) fn target_spec_map<'a>(
    db: &'a mut Database,
    scope: Option<&str>,
) -> &'a mut BTreeMap<String, AttributeSpec> {
    match scope {
        Some("BU_") => &mut db.node_attr_spec,
        Some("BO_") => &mut db.msg_attr_spec,
        Some("SG_") => &mut db.sig_attr_spec,
        _ => &mut db.db_attr_spec,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_level_definitions() {
        let mut db = Database::default();
        decode(&mut db, r#"BA_DEF_  "DBName" STRING;"#);
        decode(&mut db, r#"BA_DEF_  "Baudrate" INT 1 1000000;"#);
        decode(&mut db, r#"BA_DEF_ "UseGMParameterIDs" ENUM "No", "Yes";"#);

        assert_eq!(
            db.db_attr_spec["DBName"].def.as_ref().unwrap().kind,
            AttrType::String
        );
        let baudrate = db.db_attr_spec["Baudrate"].def.as_ref().unwrap();
        assert_eq!(baudrate.kind, AttrType::Int);
        assert_eq!(baudrate.int_max, Some(1_000_000));
        let gm = db.db_attr_spec["UseGMParameterIDs"].def.as_ref().unwrap();
        assert_eq!(gm.enum_values, vec!["No".to_string(), "Yes".to_string()]);
    }

    #[test]
    fn test_scoped_definitions() {
        let mut db = Database::default();
        decode(&mut db, r#"BA_DEF_ BO_  "GenMsgCycleTime" INT 0 2147483647;"#);
        decode(&mut db, r#"BA_DEF_ SG_  "GenSigStartValue" INT 0 2147483647;"#);
        decode(&mut db, r#"BA_DEF_ BU_  "TpTxIdentifier" HEX 0 134217727;"#);

        assert!(db.msg_attr_spec.contains_key("GenMsgCycleTime"));
        assert!(db.sig_attr_spec.contains_key("GenSigStartValue"));
        assert!(db.node_attr_spec.contains_key("TpTxIdentifier"));
        assert!(db.db_attr_spec.is_empty());
    }
}
