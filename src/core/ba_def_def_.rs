use crate::core::strings::first_quoted;
use crate::types::attributes::{AttrType, AttributeSpec, AttributeValue};
use crate::types::database::Database;

/// `BA_DEF_DEF_ "<name>" <value>;`
///
/// Attaches the default value to whichever entity scope declared the
/// attribute (database, node, message or signal).
pub(crate) fn decode(db: &mut Database, line: &str) {
    let trimmed = line.trim().trim_end_matches(';');
    let mut parts = trimmed.split_ascii_whitespace();

    match parts.next() {
        Some("BA_DEF_DEF_") => {}
        _ => return,
    }

    let Some(name_token) = parts.next() else {
        return;
    };
    let name = name_token.trim_matches('"').to_string();

    let rest = trimmed
        .strip_prefix("BA_DEF_DEF_")
        .unwrap_or(trimmed)
        .trim_start();
    let rest = rest.strip_prefix(name_token).unwrap_or(rest).trim();

    let Some(spec) = find_spec_mut(db, &name) else {
        return;
    };

    let kind = spec
        .def
        .as_ref()
        .map(|def| def.kind)
        .unwrap_or(AttrType::String);

    let value = if rest.starts_with('"') {
        let Some(text) = first_quoted(rest) else {
            return;
        };
        match kind {
            AttrType::Enum => AttributeValue::Enum(text),
            _ => AttributeValue::Str(text),
        }
    } else {
        match kind {
            AttrType::Int => match rest.parse::<i64>() {
                Ok(value) => AttributeValue::Int(value),
                Err(_) => return,
            },
            AttrType::Hex => match rest.parse::<u64>() {
                Ok(value) => AttributeValue::Hex(value),
                Err(_) => return,
            },
            AttrType::Float => match rest.parse::<f64>() {
                Ok(value) => AttributeValue::Float(value),
                Err(_) => return,
            },
            AttrType::Enum => {
                // Numeric default indexes the enum table.
                let Ok(index) = rest.parse::<usize>() else {
                    return;
                };
                let Some(label) = spec
                    .def
                    .as_ref()
                    .and_then(|def| def.enum_values.get(index))
                else {
                    return;
                };
                AttributeValue::Enum(label.clone())
            }
            AttrType::String => AttributeValue::Str(rest.to_string()),
        }
    };

    spec.default = Some(value);
}

fn find_spec_mut<'a>(db: &'a mut Database, name: &str) -> Option<&'a mut AttributeSpec> {
    if db.db_attr_spec.contains_key(name) {
        return db.db_attr_spec.get_mut(name);
    }
    if db.node_attr_spec.contains_key(name) {
        return db.node_attr_spec.get_mut(name);
    }
    if db.msg_attr_spec.contains_key(name) {
        return db.msg_attr_spec.get_mut(name);
    }
    db.sig_attr_spec.get_mut(name)
}
