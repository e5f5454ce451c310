use crate::core;
use crate::types::database::Database;
use crate::types::errors::ParseError;

use std::fs::File;
use std::io::{BufReader, Read};

use encoding_rs::WINDOWS_1252;

/// Parses a DBC file and returns a populated [`Database`].
///
/// The file is decoded as WINDOWS-1252 (the code page CANdb++ writes),
/// parsed line by line, and finished with a [`Database::refresh`] so
/// frame-id variants and codec trees are ready.
///
/// Parsing is tolerant: malformed lines are skipped and result in
/// missing elements rather than an error. Only I/O failures and (in
/// strict mode) invalid signal layouts fail the load.
pub fn from_file(path: &str) -> Result<Database, ParseError> {
    if !path.to_ascii_lowercase().ends_with(".dbc") {
        return Err(ParseError::InvalidExtension {
            path: path.to_string(),
        });
    }

    let file: File = File::open(path).map_err(|source| ParseError::OpenFile {
        path: path.to_string(),
        source,
    })?;
    let mut reader: BufReader<File> = BufReader::new(file);

    // read raw bytes
    let mut bytes: Vec<u8> = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|source| ParseError::Read {
            path: path.to_string(),
            source,
        })?;

    // Decode in Windows-1252
    let (text, _, _) = WINDOWS_1252.decode(&bytes);

    let mut db = Database::default();
    parse_into(&mut db, &text);
    db.refresh()?;
    Ok(db)
}

/// Parses DBC text into an existing database. Does **not** refresh;
/// `Database::add_string` wraps this with the refresh.
pub(crate) fn parse_into(db: &mut Database, text: &str) {
    // split text in lines
    let lines: Vec<String> = text.lines().map(|line| line.to_string()).collect();

    let mut i: usize = 0;
    while i < lines.len() {
        // Work on a trimmed-start slice to preserve inner spaces
        let line: &str = lines[i].trim_start();

        // skip comments and empty lines
        if line.is_empty() || line.starts_with("//") {
            i += 1;
            continue;
        }

        // Extract first and second token from the line
        let mut parts = line.split_ascii_whitespace();
        let first: &str = parts.next().unwrap_or("");
        let second: &str = parts.next().unwrap_or("");

        match first {
            "VERSION" => {
                core::version::decode(db, line);
            }
            // The node list usually carries the colon glued to the
            // keyword ("BU_: A B C").
            "BU_" | "BU_:" => {
                core::bu_::decode(db, line);
            }
            "BO_" => {
                core::bo_::decode(db, line);
            }
            "SG_" => {
                core::sg_::decode(db, line);
            }
            "BO_TX_BU_" => {
                core::bo_tx_bu_::decode(db, line);
            }
            "CM_" => {
                // Comments may span lines; accumulate until the quoted
                // segment closes.
                let mut full_line: String = line.to_string();
                if !second.is_empty()
                    && !core::strings::has_complete_quoted_segment(&full_line)
                {
                    core::strings::accumulate_until_two_unescaped_quotes(
                        &mut full_line,
                        &lines,
                        &mut i,
                    );
                }
                core::cm_::decode(db, &full_line);
            }
            "BA_DEF_" => {
                core::ba_def_::decode(db, line);
            }
            "BA_DEF_DEF_" => {
                core::ba_def_def_::decode(db, line);
            }
            "BA_" => {
                core::ba_::decode(db, line);
            }
            "VAL_" => {
                core::val_::decode(db, line);
            }
            "SIG_VALTYPE_" => {
                core::sig_valtype_::decode(db, line);
            }
            "SIG_GROUP_" => {
                core::sig_group_::decode(db, line);
            }
            "SG_MUL_VAL_" => {
                core::sg_mul_val_::decode(db, line);
            }
            _ => {}
        }

        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_DBC: &str = r#"VERSION "1.0"

NS_ :
	CM_
	BA_DEF_
	BA_
	VAL_

BS_:

BU_: ABS Cluster

BO_ 1001 Speed: 8 ABS
 SG_ VehicleSpeed : 7|16@0+ (0.01,0) [0|655.35] "km/h"  Cluster
 SG_ Odometer : 23|32@0+ (1,0) [0|0] "m"  Cluster

CM_ BO_ 1001 "Wheel based speed";
CM_ SG_ 1001 VehicleSpeed "Filtered
vehicle speed";

BA_DEF_  "BusType" STRING;
BA_DEF_DEF_ "BusType" "CAN";
VAL_ 1001 VehicleSpeed 65535 "Invalid" ;
"#;

    #[test]
    fn test_parse_small_database() {
        let db = Database::from_string(SMALL_DBC).unwrap();

        assert_eq!(db.version, "1.0");
        assert_eq!(db.iter_nodes().count(), 2);

        let message = db.get_message_by_name("Speed").unwrap();
        assert_eq!(message.id, 1001);
        assert_eq!(message.byte_length, 8);
        assert_eq!(message.comment, "Wheel based speed");
        assert_eq!(message.signals.len(), 2);

        let speed = message.get_signal_by_name(&db, "VehicleSpeed").unwrap();
        assert_eq!(speed.factor, 0.01);
        assert_eq!(speed.comment, "Filtered\nvehicle speed");
        assert_eq!(
            speed.value_table.get(&65535).map(String::as_str),
            Some("Invalid")
        );

        assert_eq!(db.bus_type(), Some("CAN"));
    }

    #[test]
    fn test_from_file_rejects_other_extensions() {
        assert!(matches!(
            from_file("network.xml"),
            Err(ParseError::InvalidExtension { .. })
        ));
    }
}
