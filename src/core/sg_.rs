use crate::types::database::{Database, NodeKey};
use crate::types::signal::{Endianness, MuxRole, Signess};

/// Decode a `SG_` line belonging to the **current message** (the last parsed BO_).
/// Format (typical):
/// SG_ <name> [M|mX|mXM]: <bit_start>|<bit_length>@<endian><sign> (<factor>,<offset>) [<min>|<max>] "<unit>" <receivers...>
pub(crate) fn decode(db: &mut Database, line: &str) {
    if db.messages.is_empty() {
        return;
    }

    let line: &str = line.trim_start().trim_end_matches(';');
    let mut split_colon = line.splitn(2, ':');
    let left: &str = split_colon.next().unwrap_or("").trim(); // "SG_ NAME [M|mX]"
    let right: &str = split_colon.next().unwrap_or("").trim();

    // Left part analysis: SG_ NAME [M|mX|mXM]
    let mut left_it = left.split_ascii_whitespace();
    let _sg: &str = left_it.next().unwrap_or(""); // "SG_"
    let name: &str = left_it.next().unwrap_or("");
    let after_name: &str = left_it.next().unwrap_or(""); // "", "M", "m0", "m2M", ...

    if name.is_empty() {
        return;
    }

    // multiplexing tag decoding (if present)
    let mut mux_role: MuxRole = MuxRole::None;
    let mut mux_ids: Vec<i64> = Vec::new();
    if !after_name.is_empty() {
        let tag: &str = after_name.trim_end_matches(':');
        if tag == "M" {
            mux_role = MuxRole::Multiplexor;
        } else if let Some(rest) = tag.strip_prefix('m') {
            let (digits, also_switch) = match rest.strip_suffix('M') {
                Some(digits) => (digits, true),
                None => (rest, false),
            };
            if let Ok(selector) = digits.parse::<i64>() {
                mux_role = if also_switch {
                    MuxRole::MultiplexedMultiplexor
                } else {
                    MuxRole::Multiplexed
                };
                mux_ids.push(selector);
            }
        }
    }

    // Right part analysis:
    // <bit_start>|<bit_length>@<endian><sign> (<factor>,<offset>) [<min>|<max>] "<unit>" <receivers...>
    let mut it = right.split_ascii_whitespace();

    // 1) bit info: "63|1@1+"
    let bit_info: &str = it.next().unwrap_or("");
    let mut bit_and_rest = bit_info.split('@');
    let bit_pos_len: &str = bit_and_rest.next().unwrap_or(""); // "63|1"
    let es: &str = bit_and_rest.next().unwrap_or(""); // "1+"
    let mut pos_len = bit_pos_len.split('|');
    let bit_start: u16 = pos_len.next().unwrap_or("0").parse().unwrap_or(0);
    let bit_length: u16 = pos_len.next().unwrap_or("0").parse().unwrap_or(0);

    let endian = if es.chars().next().unwrap_or('1') == '0' {
        Endianness::Motorola
    } else {
        Endianness::Intel
    };
    let sign = if es.chars().nth(1).unwrap_or('+') == '-' {
        Signess::Signed
    } else {
        Signess::Unsigned
    };

    // 2) "(factor,offset)"
    let mut factor: f64 = 1.0;
    let mut offset: f64 = 0.0;
    if let Some(paren) = it.next()
        && paren.starts_with('(')
    {
        let mut acc = String::from(paren);
        // Might be split across tokens; gather until ')'
        while !acc.ends_with(')') {
            if let Some(tok) = it.next() {
                acc.push(' ');
                acc.push_str(tok);
            } else {
                break;
            }
        }
        let inner: &str = acc.trim_start_matches('(').trim_end_matches(')');
        let mut nums = inner.split(',').map(|token| token.trim());
        factor = nums.next().unwrap_or("1").parse().unwrap_or(1.0);
        offset = nums.next().unwrap_or("0").parse().unwrap_or(0.0);
    }

    // 3) "[min|max]"
    let mut min: Option<f64> = None;
    let mut max: Option<f64> = None;
    let bounds_token = it.next().unwrap_or("");
    let (mut seen_bounds, mut next_tok_cache) = (false, String::new());
    if bounds_token.starts_with('[') && bounds_token.contains('|') {
        seen_bounds = true;
        let mut acc = String::from(bounds_token);
        while !acc.ends_with(']') {
            if let Some(tok) = it.next() {
                acc.push(' ');
                acc.push_str(tok);
            } else {
                break;
            }
        }
        let inner: &str = acc.trim_start_matches('[').trim_end_matches(']');
        let mut nums = inner.split('|').map(|token| token.trim());
        min = nums.next().and_then(|token| token.parse().ok());
        max = nums.next().and_then(|token| token.parse().ok());

        // "[0|0]" means no declared range.
        if min == Some(0.0) && max == Some(0.0) {
            min = None;
            max = None;
        }
    } else {
        next_tok_cache = bounds_token.to_string();
    }

    // 4) "unit"
    let unit_token: Option<&str> = if seen_bounds {
        it.next()
    } else {
        Some(next_tok_cache.as_str())
    };
    let unit_raw: &str = unit_token.unwrap_or("").trim();
    let unit: String = if unit_raw.starts_with('"') {
        // gather full quoted
        let mut acc: String = String::from(unit_raw);
        while !(acc.len() > 1 && acc.ends_with('"')) {
            if let Some(tok) = it.next() {
                acc.push(' ');
                acc.push_str(tok);
            } else {
                break;
            }
        }
        acc.trim_matches('"').to_string()
    } else {
        unit_raw.trim_matches('"').to_string()
    };

    // 5) receivers (comma-separated)
    let mut receiver_nodes: Vec<NodeKey> = Vec::new();
    if let Some(recv) = it.next() {
        for node_name in recv.split(',') {
            if let Some(key) = db.get_node_key_by_name(node_name.trim()) {
                receiver_nodes.push(key);
            }
        }
    }

    db.add_signal(
        name,
        bit_start,
        bit_length,
        endian,
        sign,
        factor,
        offset,
        min,
        max,
        &unit,
        receiver_nodes,
        mux_role,
        mux_ids,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_signal() {
        let mut db = Database::default();
        db.add_node("Cluster");
        db.add_message("Speed", 0x3E9, 8, Some("ABS"));

        decode(
            &mut db,
            r#" SG_ VehicleSpeed : 7|16@0+ (0.01,0) [0|655.35] "km/h"  Cluster"#,
        );

        let sig = db.get_signal_by_name("VehicleSpeed").unwrap();
        assert_eq!(sig.bit_start, 7);
        assert_eq!(sig.bit_length, 16);
        assert_eq!(sig.endian, Endianness::Motorola);
        assert_eq!(sig.sign, Signess::Unsigned);
        assert_eq!(sig.factor, 0.01);
        assert_eq!(sig.offset, 0.0);
        assert_eq!(sig.min, Some(0.0));
        assert_eq!(sig.max, Some(655.35));
        assert_eq!(sig.unit, "km/h");
        assert_eq!(sig.receiver_nodes.len(), 1);
    }

    #[test]
    fn test_signed_intel_signal_without_range() {
        let mut db = Database::default();
        db.add_message("Temp", 0x3EA, 8, None);

        decode(&mut db, r#" SG_ OilTemp : 0|12@1- (0.1,-40) [0|0] "C"  Vector__XXX"#);

        let sig = db.get_signal_by_name("OilTemp").unwrap();
        assert_eq!(sig.endian, Endianness::Intel);
        assert_eq!(sig.sign, Signess::Signed);
        assert_eq!(sig.offset, -40.0);
        // [0|0] declares no range.
        assert_eq!(sig.min, None);
        assert_eq!(sig.max, None);
        assert!(sig.receiver_nodes.is_empty());
    }

    #[test]
    fn test_multiplex_tags() {
        let mut db = Database::default();
        db.add_message("Muxed", 0x3EB, 8, None);

        decode(&mut db, r#" SG_ Selector M : 7|8@0+ (1,0) [0|0] ""  Vector__XXX"#);
        decode(&mut db, r#" SG_ SigA m0 : 15|8@0+ (1,0) [0|0] ""  Vector__XXX"#);
        decode(&mut db, r#" SG_ Nested m1M : 15|4@0+ (1,0) [0|0] ""  Vector__XXX"#);

        assert_eq!(
            db.get_signal_by_name("Selector").unwrap().mux_role,
            MuxRole::Multiplexor
        );
        let sig_a = db.get_signal_by_name("SigA").unwrap();
        assert_eq!(sig_a.mux_role, MuxRole::Multiplexed);
        assert_eq!(sig_a.mux_ids, vec![0]);
        let nested = db.get_signal_by_name("Nested").unwrap();
        assert_eq!(nested.mux_role, MuxRole::MultiplexedMultiplexor);
        assert_eq!(nested.mux_ids, vec![1]);
    }
}
