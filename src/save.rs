use std::collections::BTreeMap;
use std::fmt::{self, Write as FmtWrite};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::types::attributes::{AttrType, AttributeDef, AttributeSpec, AttributeValue};
use crate::types::database::Database;
use crate::types::errors::SaveError;
use crate::types::signal::{Endianness, MuxRole, Signal, Signess};

const NS_KEYWORDS: &[&str] = &[
    "NS_DESC_",
    "CM_",
    "BA_DEF_",
    "BA_",
    "VAL_",
    "CAT_DEF_",
    "CAT_",
    "FILTER",
    "BA_DEF_DEF_",
    "EV_DATA_",
    "ENVVAR_DATA_",
    "SGTYPE_",
    "SGTYPE_VAL_",
    "BA_DEF_SGTYPE_",
    "BA_SGTYPE_",
    "SIG_TYPE_REF_",
    "VAL_TABLE_",
    "SIG_GROUP_",
    "SIG_VALTYPE_",
    "SIGTYPE_VALTYPE_",
    "BO_TX_BU_",
    "BA_DEF_REL_",
    "BA_REL_",
    "BA_DEF_DEF_REL_",
    "BU_SG_REL_",
    "BU_EV_REL_",
    "BU_BO_REL_",
    "SG_MUL_VAL_",
];

/// Serializes a `Database` into DBC text and writes it to `path`.
///
/// Ensures the destination has a `.dbc` extension and creates
/// intermediate directories when needed.
pub fn save_to_file(path: &str, database: &Database) -> Result<(), SaveError> {
    if !path.to_ascii_lowercase().ends_with(".dbc") {
        return Err(SaveError::InvalidExtension {
            path: path.to_string(),
        });
    }

    let serialized: String = to_dbc_string(database)?;

    let path_ref: &Path = Path::new(path);
    if let Some(parent) = path_ref.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| SaveError::CreateDirectory {
            path: parent.display().to_string(),
            source,
        })?;
    }

    let file = File::create(path_ref).map_err(|source| SaveError::CreateFile {
        path: path.to_string(),
        source,
    })?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(serialized.as_bytes())
        .map_err(|source| SaveError::Write {
            path: path.to_string(),
            source,
        })?;
    writer.flush().map_err(|source| SaveError::Write {
        path: path.to_string(),
        source,
    })?;
    Ok(())
}

/// Serializes the database as DBC text that round-trips through the
/// parser.
pub fn to_dbc_string(db: &Database) -> Result<String, SaveError> {
    let mut out = String::new();

    let version = escape_dbc_string(&db.version);
    write_fmt(&mut out, format_args!("VERSION \"{}\"\n\n", version))?;

    out.push_str("NS_ :\n");
    for keyword in NS_KEYWORDS {
        out.push('\t');
        out.push_str(keyword);
        out.push('\n');
    }
    out.push('\n');

    out.push_str("BS_:\n\n");

    out.push_str("BU_:");
    for node in db.iter_nodes() {
        out.push(' ');
        out.push_str(&node.name);
    }
    out.push('\n');
    out.push('\n');

    write_messages(db, &mut out)?;
    out.push('\n');

    write_bo_tx_bu(db, &mut out)?;
    out.push('\n');

    write_attribute_definitions(db, &mut out)?;
    write_attribute_defaults(db, &mut out)?;
    out.push('\n');

    write_attribute_assignments(db, &mut out)?;
    out.push('\n');

    write_comments(db, &mut out)?;
    out.push('\n');

    write_sig_valtype(db, &mut out)?;
    write_value_tables(db, &mut out)?;
    write_signal_groups(db, &mut out)?;
    write_extended_multiplexing(db, &mut out)?;

    Ok(out)
}

fn write_messages(db: &Database, out: &mut String) -> Result<(), SaveError> {
    for message in db.iter_messages() {
        let transmitter = message
            .sender_nodes
            .iter()
            .find_map(|&key| db.get_node_by_key(key).map(|node| node.name.as_str()))
            .unwrap_or("Vector__XXX");

        write_fmt(
            out,
            format_args!(
                "BO_ {} {}: {} {}\n",
                message.dbc_frame_id(),
                message.name,
                message.byte_length,
                transmitter
            ),
        )?;

        for signal in message.signals(db) {
            let mux_tag = format_mux_tag(signal);
            let endian = match signal.endian {
                Endianness::Motorola => '0',
                Endianness::Intel => '1',
            };
            let sign_char = match signal.sign {
                Signess::Signed => '-',
                _ => '+',
            };
            let receivers: Vec<String> = signal
                .receiver_nodes
                .iter()
                .filter_map(|&key| db.get_node_by_key(key).map(|node| node.name.clone()))
                .collect();
            let receivers_field = if receivers.is_empty() {
                "Vector__XXX".to_string()
            } else {
                receivers.join(",")
            };

            write_fmt(
                out,
                format_args!(
                    " SG_ {}{} : {}|{}@{}{} ({},{}) [{}|{}] \"{}\"  {}\n",
                    signal.name,
                    mux_tag,
                    signal.bit_start,
                    signal.bit_length,
                    endian,
                    sign_char,
                    format_f64(signal.factor),
                    format_f64(signal.offset),
                    format_f64(signal.min.unwrap_or(0.0)),
                    format_f64(signal.max.unwrap_or(0.0)),
                    escape_dbc_string(&signal.unit),
                    receivers_field
                ),
            )?;
        }

        out.push('\n');
    }

    Ok(())
}

fn write_bo_tx_bu(db: &Database, out: &mut String) -> Result<(), SaveError> {
    for message in db.iter_messages() {
        let mut transmitters: Vec<String> = Vec::new();
        for &key in &message.sender_nodes {
            if let Some(node) = db.get_node_by_key(key)
                && !transmitters.iter().any(|name| name == &node.name)
            {
                transmitters.push(node.name.clone());
            }
        }

        // A single sender is already carried by the BO_ line.
        if transmitters.len() < 2 {
            continue;
        }

        write_fmt(
            out,
            format_args!(
                "BO_TX_BU_ {} : {};\n",
                message.dbc_frame_id(),
                transmitters.join(",")
            ),
        )?;
    }

    Ok(())
}

fn write_attribute_definitions(db: &Database, out: &mut String) -> Result<(), SaveError> {
    for (scope, specs) in [
        ("", &db.db_attr_spec),
        ("BU_ ", &db.node_attr_spec),
        ("BO_ ", &db.msg_attr_spec),
        ("SG_ ", &db.sig_attr_spec),
    ] {
        for (name, spec) in specs {
            if let Some(def) = spec.def.as_ref() {
                write_fmt(
                    out,
                    format_args!(
                        "BA_DEF_ {}\"{}\" {};\n",
                        scope,
                        name,
                        format_attribute_def(def)
                    ),
                )?;
            }
        }
    }

    Ok(())
}

fn write_attribute_defaults(db: &Database, out: &mut String) -> Result<(), SaveError> {
    let mut defaults: BTreeMap<String, AttributeValue> = BTreeMap::new();

    collect_defaults(&db.db_attr_spec, &mut defaults);
    collect_defaults(&db.node_attr_spec, &mut defaults);
    collect_defaults(&db.msg_attr_spec, &mut defaults);
    collect_defaults(&db.sig_attr_spec, &mut defaults);

    for (name, value) in defaults {
        let spec = lookup_attr_spec(db, &name);
        let value_str = format_attribute_value(&value, spec);
        write_fmt(
            out,
            format_args!("BA_DEF_DEF_ \"{}\" {};\n", name, value_str),
        )?;
    }

    Ok(())
}

fn write_attribute_assignments(db: &Database, out: &mut String) -> Result<(), SaveError> {
    for (name, value) in &db.attributes {
        let spec = db.db_attr_spec.get(name);
        let value_str = format_attribute_value(value, spec);
        write_fmt(out, format_args!("BA_ \"{}\" {};\n", name, value_str))?;
    }

    for node in db.iter_nodes() {
        for (name, value) in &node.attributes {
            let spec = db.node_attr_spec.get(name);
            let value_str = format_attribute_value(value, spec);
            write_fmt(
                out,
                format_args!("BA_ \"{}\" BU_ {} {};\n", name, node.name, value_str),
            )?;
        }
    }

    for message in db.iter_messages() {
        for (name, value) in &message.attributes {
            let spec = db.msg_attr_spec.get(name);
            let value_str = format_attribute_value(value, spec);
            write_fmt(
                out,
                format_args!(
                    "BA_ \"{}\" BO_ {} {};\n",
                    name,
                    message.dbc_frame_id(),
                    value_str
                ),
            )?;
        }
    }

    for message in db.iter_messages() {
        for signal in message.signals(db) {
            for (name, value) in &signal.attributes {
                let spec = db.sig_attr_spec.get(name);
                let value_str = format_attribute_value(value, spec);
                write_fmt(
                    out,
                    format_args!(
                        "BA_ \"{}\" SG_ {} {} {};\n",
                        name,
                        message.dbc_frame_id(),
                        signal.name,
                        value_str
                    ),
                )?;
            }
        }
    }

    Ok(())
}

fn write_comments(db: &Database, out: &mut String) -> Result<(), SaveError> {
    if !db.comment.is_empty() {
        let comment = escape_dbc_string(&db.comment);
        write_fmt(out, format_args!("CM_ \"{}\";\n", comment))?;
    }

    for node in db.iter_nodes() {
        if node.comment.is_empty() {
            continue;
        }
        let comment = escape_dbc_string(&node.comment);
        write_fmt(
            out,
            format_args!("CM_ BU_ {} \"{}\";\n", node.name, comment),
        )?;
    }

    for message in db.iter_messages() {
        if message.comment.is_empty() {
            continue;
        }
        let comment = escape_dbc_string(&message.comment);
        write_fmt(
            out,
            format_args!("CM_ BO_ {} \"{}\";\n", message.dbc_frame_id(), comment),
        )?;
    }

    for message in db.iter_messages() {
        for signal in message.signals(db) {
            if signal.comment.is_empty() {
                continue;
            }
            let comment = escape_dbc_string(&signal.comment);
            write_fmt(
                out,
                format_args!(
                    "CM_ SG_ {} {} \"{}\";\n",
                    message.dbc_frame_id(),
                    signal.name,
                    comment
                ),
            )?;
        }
    }

    for (name, comment) in &db.env_var_comments {
        write_fmt(
            out,
            format_args!("CM_ EV_ {} \"{}\";\n", name, escape_dbc_string(comment)),
        )?;
    }

    Ok(())
}

fn write_sig_valtype(db: &Database, out: &mut String) -> Result<(), SaveError> {
    for message in db.iter_messages() {
        for signal in message.signals(db) {
            let code = match signal.sign {
                Signess::IeeeFloat => Some(1),
                Signess::IeeeDouble => Some(2),
                _ => None,
            };
            if let Some(code) = code {
                write_fmt(
                    out,
                    format_args!(
                        "SIG_VALTYPE_ {} {} : {};\n",
                        message.dbc_frame_id(),
                        signal.name,
                        code
                    ),
                )?;
            }
        }
    }

    Ok(())
}

fn write_value_tables(db: &Database, out: &mut String) -> Result<(), SaveError> {
    for message in db.iter_messages() {
        for signal in message.signals(db) {
            if signal.value_table.is_empty() {
                continue;
            }
            write_fmt(
                out,
                format_args!("VAL_ {} {}", message.dbc_frame_id(), signal.name),
            )?;
            for (value, description) in &signal.value_table {
                let desc = escape_dbc_string(description);
                write_fmt(out, format_args!(" {} \"{}\"", value, desc))?;
            }
            out.push_str(" ;\n");
        }
    }

    Ok(())
}

fn write_signal_groups(db: &Database, out: &mut String) -> Result<(), SaveError> {
    for message in db.iter_messages() {
        for group in &message.signal_groups {
            write_fmt(
                out,
                format_args!(
                    "SIG_GROUP_ {} {} {} : {};\n",
                    message.dbc_frame_id(),
                    group.name,
                    group.repetitions,
                    group.signal_names.join(" ")
                ),
            )?;
        }
    }

    Ok(())
}

fn write_extended_multiplexing(db: &Database, out: &mut String) -> Result<(), SaveError> {
    for message in db.iter_messages() {
        for signal in message.signals(db) {
            let Some(switch) = signal.mux_switch.and_then(|key| db.get_sig_by_key(key)) else {
                continue;
            };
            if signal.mux_ids.is_empty() {
                continue;
            }
            let ranges = compress_mux_ranges(&signal.mux_ids)
                .into_iter()
                .map(|(low, high)| format!("{}-{}", low, high))
                .collect::<Vec<_>>()
                .join(", ");
            write_fmt(
                out,
                format_args!(
                    "SG_MUL_VAL_ {} {} {} {};\n",
                    message.dbc_frame_id(),
                    signal.name,
                    switch.name,
                    ranges
                ),
            )?;
        }
    }

    Ok(())
}

/// Run-length compresses selector ids into ascending closed ranges:
/// `[1, 2, 3, 5, 7, 8, 9]` becomes `[(1,3), (5,5), (7,9)]`.
fn compress_mux_ranges(ids: &[i64]) -> Vec<(i64, i64)> {
    let mut ordered: Vec<i64> = ids.to_vec();
    ordered.sort_unstable();
    ordered.dedup();

    let mut ranges: Vec<(i64, i64)> = Vec::new();
    for value in ordered {
        match ranges.last_mut() {
            Some((_, high)) if *high + 1 == value => *high = value,
            _ => ranges.push((value, value)),
        }
    }
    ranges
}

fn format_mux_tag(signal: &Signal) -> String {
    match signal.mux_role {
        MuxRole::Multiplexor => " M".to_string(),
        MuxRole::Multiplexed => match signal.mux_ids.first() {
            Some(selector) => format!(" m{}", selector),
            None => String::new(),
        },
        MuxRole::MultiplexedMultiplexor => match signal.mux_ids.first() {
            Some(selector) => format!(" m{}M", selector),
            None => " M".to_string(),
        },
        MuxRole::None => String::new(),
    }
}

fn format_attribute_def(def: &AttributeDef) -> String {
    match def.kind {
        AttrType::String => "STRING".to_string(),
        AttrType::Int => format!(
            "INT {} {}",
            def.int_min.unwrap_or_default(),
            def.int_max.unwrap_or_default()
        ),
        AttrType::Hex => format!(
            "HEX {} {}",
            def.hex_min.unwrap_or_default(),
            def.hex_max.unwrap_or_default()
        ),
        AttrType::Float => format!(
            "FLOAT {} {}",
            format_f64(def.float_min.unwrap_or_default()),
            format_f64(def.float_max.unwrap_or_default())
        ),
        AttrType::Enum => {
            let joined = def
                .enum_values
                .iter()
                .map(|value| format!("\"{}\"", escape_dbc_string(value)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("ENUM {}", joined)
        }
    }
}

fn format_attribute_value(value: &AttributeValue, spec: Option<&AttributeSpec>) -> String {
    match value {
        AttributeValue::Str(text) => format!("\"{}\"", escape_dbc_string(text)),
        AttributeValue::Int(value) => value.to_string(),
        AttributeValue::Hex(value) => value.to_string(),
        AttributeValue::Float(value) => format_f64(*value),
        AttributeValue::Enum(selected) => {
            if let Some(def) = spec
                .and_then(|spec| spec.def.as_ref())
                .filter(|def| matches!(def.kind, AttrType::Enum))
                && let Some(index) = def.enum_values.iter().position(|entry| entry == selected)
            {
                return index.to_string();
            }
            format!("\"{}\"", escape_dbc_string(selected))
        }
    }
}

fn format_f64(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        let mut text = format!("{:.12}", value);
        while text.contains('.') && text.ends_with('0') {
            text.pop();
        }
        if text.ends_with('.') {
            text.push('0');
        }
        text
    }
}

fn escape_dbc_string(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn collect_defaults(
    source: &BTreeMap<String, AttributeSpec>,
    target: &mut BTreeMap<String, AttributeValue>,
) {
    for (name, spec) in source {
        if let Some(default) = spec.default.clone() {
            target.entry(name.clone()).or_insert(default);
        }
    }
}

fn lookup_attr_spec<'a>(db: &'a Database, name: &str) -> Option<&'a AttributeSpec> {
    db.db_attr_spec
        .get(name)
        .or_else(|| db.node_attr_spec.get(name))
        .or_else(|| db.msg_attr_spec.get(name))
        .or_else(|| db.sig_attr_spec.get(name))
}

fn write_fmt(out: &mut String, args: fmt::Arguments<'_>) -> Result<(), SaveError> {
    out.write_fmt(args).map_err(|_| SaveError::Format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_mux_ranges() {
        assert_eq!(
            compress_mux_ranges(&[1, 2, 3, 5, 7, 8, 9]),
            vec![(1, 3), (5, 5), (7, 9)]
        );
        assert_eq!(compress_mux_ranges(&[4]), vec![(4, 4)]);
        // Unsorted input is normalized first.
        assert_eq!(compress_mux_ranges(&[3, 1, 2]), vec![(1, 3)]);
    }

    #[test]
    fn test_format_f64() {
        assert_eq!(format_f64(1.0), "1");
        assert_eq!(format_f64(0.01), "0.01");
        assert_eq!(format_f64(-40.0), "-40");
        assert_eq!(format_f64(655.35), "655.35");
    }

    #[test]
    fn test_round_trip_through_parser() {
        let source = r#"VERSION "1.2"

BS_:

BU_: ECM TCM

BO_ 500 Engine: 8 ECM
 SG_ rpm : 7|16@0+ (0.25,0) [0|16383.75] "rpm"  TCM
 SG_ temp : 23|8@0- (1,-40) [-40|215] "C"  TCM

CM_ SG_ 500 temp "Coolant temperature";
BA_DEF_ SG_  "GenSigStartValue" INT 0 100000;
BA_DEF_DEF_ "GenSigStartValue" 0;
BA_ "GenSigStartValue" SG_ 500 rpm 800;
VAL_ 500 temp 215 "Overheat" ;
"#;
        let db = crate::types::database::Database::from_string(source).unwrap();
        let dumped = db.as_dbc_string().unwrap();
        let reparsed = crate::types::database::Database::from_string(&dumped).unwrap();

        assert_eq!(db.version, reparsed.version);
        let original = db.get_message_by_name("Engine").unwrap();
        let round_tripped = reparsed.get_message_by_name("Engine").unwrap();
        assert_eq!(original.id, round_tripped.id);
        assert_eq!(original.byte_length, round_tripped.byte_length);

        let rpm = round_tripped.get_signal_by_name(&reparsed, "rpm").unwrap();
        assert_eq!(rpm.factor, 0.25);
        assert_eq!(rpm.gen_sig_start_value(&reparsed), Some(800.0));

        let temp = round_tripped.get_signal_by_name(&reparsed, "temp").unwrap();
        assert_eq!(temp.comment, "Coolant temperature");
        assert_eq!(temp.offset, -40.0);
        assert_eq!(temp.value_table.get(&215).map(String::as_str), Some("Overheat"));
    }
}
