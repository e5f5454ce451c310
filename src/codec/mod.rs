//! The signal codec: bit layout planning, multiplex tree construction,
//! layout validation and the encode/decode pipelines.

pub(crate) mod decode;
pub(crate) mod encode;
pub(crate) mod layout;
pub(crate) mod scaling;
pub(crate) mod validate;

use std::collections::BTreeMap;

use crate::codec::layout::{Formats, create_formats};
use crate::types::database::{Database, SignalKey};
use crate::types::message::Message;

/// One node of the multiplex codec tree.
///
/// The root node holds the always-present signals; every multiplexer at
/// a node owns one child per selector value. Each node carries the
/// packing programs of its own signals against the full message length.
#[derive(Clone, Debug, Default)]
pub(crate) struct CodecNode {
    pub(crate) signals: Vec<SignalKey>,
    pub(crate) formats: Formats,
    pub(crate) multiplexers: Vec<(SignalKey, BTreeMap<i64, CodecNode>)>,
}

impl CodecNode {
    pub(crate) fn is_multiplexed(&self) -> bool {
        !self.multiplexers.is_empty()
    }
}

/// Builds the codec tree for a message from its flat signal list.
pub(crate) fn create_codec(db: &Database, message: &Message) -> CodecNode {
    create_node(db, message, None, None)
}

fn create_node(
    db: &Database,
    message: &Message,
    parent: Option<SignalKey>,
    mux_id: Option<i64>,
) -> CodecNode {
    let mut signals: Vec<SignalKey> = Vec::new();
    let mut multiplexers: Vec<(SignalKey, BTreeMap<i64, CodecNode>)> = Vec::new();

    // Collect the signals gated by this parent/selector pair. Root
    // signals have no switch and no selector.
    for &sig_key in &message.signals {
        let Some(signal) = db.get_sig_by_key(sig_key) else {
            continue;
        };
        if signal.mux_switch != parent {
            continue;
        }
        if let Some(mux_id) = mux_id
            && !signal.mux_ids.contains(&mux_id)
        {
            continue;
        }

        if signal.mux_role.is_multiplexor() {
            let mut children_ids: Vec<i64> = Vec::new();
            for &child_key in &message.signals {
                if let Some(child) = db.get_sig_by_key(child_key)
                    && child.mux_switch == Some(sig_key)
                {
                    children_ids.extend(child.mux_ids.iter().copied());
                }
            }
            // A multiplexer may name branches through its value table
            // without placing any signal in them; keep those selectable.
            children_ids.extend(signal.value_table.keys().copied());

            children_ids.sort_unstable();
            children_ids.dedup();

            let mut children = BTreeMap::new();
            for child_id in children_ids {
                children.insert(
                    child_id,
                    create_node(db, message, Some(sig_key), Some(child_id)),
                );
            }
            multiplexers.push((sig_key, children));
        }

        signals.push(sig_key);
    }

    let resolved: Vec<(SignalKey, &crate::types::signal::Signal)> = signals
        .iter()
        .filter_map(|&key| db.get_sig_by_key(key).map(|signal| (key, signal)))
        .collect();

    CodecNode {
        formats: create_formats(&resolved, message.byte_length),
        signals,
        multiplexers,
    }
}

/// Formats selector lists for multiplexer diagnostics: "1, 2 or 3".
pub(crate) fn format_or<I: IntoIterator<Item = i64>>(items: I) -> String {
    let items: Vec<String> = items.into_iter().map(|item| item.to_string()).collect();
    match items.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use proptest::prelude::*;

    use crate::types::frame_data::Value;

    #[test]
    fn test_format_or() {
        assert_eq!(format_or([1]), "1");
        assert_eq!(format_or([1, 2]), "1 or 2");
        assert_eq!(format_or([0, 1, 2]), "0, 1 or 2");
    }

    // Mixed-endianness fixture: one Motorola byte, one signed Intel
    // 12-bit field and one scaled Motorola byte, all disjoint.
    const MIXED_DBC: &str = r#"VERSION ""

BS_:

BU_: N

BO_ 291 Mixed: 8 N
 SG_ alpha : 7|8@0+ (1,0) [0|0] ""  Vector__XXX
 SG_ beta : 16|12@1- (1,0) [0|0] ""  Vector__XXX
 SG_ gamma : 39|8@0+ (0.5,-10) [-10|117.5] ""  Vector__XXX
"#;

    fn mixed_input(alpha: u8, beta: i64, gamma_raw: u8) -> BTreeMap<String, Value> {
        let mut data = BTreeMap::new();
        data.insert("alpha".to_string(), Value::Integer(alpha as i64));
        data.insert("beta".to_string(), Value::Integer(beta));
        data.insert(
            "gamma".to_string(),
            Value::Float(gamma_raw as f64 * 0.5 - 10.0),
        );
        data
    }

    proptest! {
        // Strict scaled encode followed by decode reproduces the input
        // exactly: integers bit for bit, scaled values through the
        // exact-decimal conversion.
        #[test]
        fn round_trip_scaled(alpha in 0u8..=255, beta in -2048i64..=2047, gamma_raw in 0u8..=255) {
            let db = crate::Database::from_string(MIXED_DBC).unwrap();
            let input = mixed_input(alpha, beta, gamma_raw);

            let frame = db.encode_message("Mixed", &input, true, false, true).unwrap();
            let decoded = db.decode_message("Mixed", &frame.data, false, true).unwrap();

            prop_assert_eq!(&decoded["alpha"], &input["alpha"]);
            prop_assert_eq!(&decoded["beta"], &input["beta"]);
            prop_assert_eq!(&decoded["gamma"], &input["gamma"]);
        }

        // The padded frame is exactly the plain frame with a constant
        // mask ORed in: padding never disturbs signal bits and is
        // idempotent across inputs.
        #[test]
        fn padding_is_a_constant_mask(alpha in 0u8..=255, beta in -2048i64..=2047, gamma_raw in 0u8..=255) {
            let db = crate::Database::from_string(MIXED_DBC).unwrap();
            let input = mixed_input(alpha, beta, gamma_raw);

            let plain = db.encode_message("Mixed", &input, true, false, true).unwrap();
            let padded = db.encode_message("Mixed", &input, true, true, true).unwrap();

            let zero_frame = db
                .encode_message("Mixed", &mixed_input(0, 0, 20), true, true, true)
                .unwrap();
            let zero_plain = db
                .encode_message("Mixed", &mixed_input(0, 0, 20), true, false, true)
                .unwrap();

            for i in 0..plain.data.len() {
                // plain ⊆ padded
                prop_assert_eq!(plain.data[i] | padded.data[i], padded.data[i]);
                // the mask does not depend on the input
                prop_assert_eq!(
                    padded.data[i] ^ plain.data[i],
                    zero_frame.data[i] ^ zero_plain.data[i]
                );
            }
        }
    }

    #[test]
    fn test_encode_order_does_not_matter() {
        // The same layout declared in the opposite SG_ order encodes to
        // identical bytes: each endianness program is position-pinned.
        let swapped = r#"VERSION ""

BS_:

BU_: N

BO_ 291 Mixed: 8 N
 SG_ gamma : 39|8@0+ (0.5,-10) [-10|117.5] ""  Vector__XXX
 SG_ beta : 16|12@1- (1,0) [0|0] ""  Vector__XXX
 SG_ alpha : 7|8@0+ (1,0) [0|0] ""  Vector__XXX
"#;
        let db_a = crate::Database::from_string(MIXED_DBC).unwrap();
        let db_b = crate::Database::from_string(swapped).unwrap();
        let input = mixed_input(0xA5, -7, 99);

        let frame_a = db_a.encode_message("Mixed", &input, true, false, true).unwrap();
        let frame_b = db_b.encode_message("Mixed", &input, true, false, true).unwrap();
        assert_eq!(frame_a.data, frame_b.data);
    }

    #[test]
    fn test_simultaneous_signals_claim_disjoint_bits() {
        // Any message that passes strict validation has pairwise
        // disjoint bit claims among simultaneously present signals;
        // flipping one signal's bits must change exactly that signal.
        let db = crate::Database::from_string(MIXED_DBC).unwrap();
        let input = mixed_input(0, 0, 20);
        let frame = db.encode_message("Mixed", &input, true, false, true).unwrap();

        let mut flipped = frame.data.clone();
        flipped[0] ^= 0xFF; // alpha's byte
        let decoded = db.decode_message("Mixed", &flipped, false, true).unwrap();
        assert_eq!(decoded["alpha"], Value::Integer(0xFF));
        assert_eq!(&decoded["beta"], &input["beta"]);
        assert_eq!(&decoded["gamma"], &input["gamma"]);
    }

    #[test]
    fn test_float_signal_round_trip() {
        let float_dbc = r#"VERSION ""

BS_:

BU_: N

BO_ 292 Floats: 8 N
 SG_ ratio : 7|32@0+ (1,0) [0|0] ""  Vector__XXX
 SG_ wide : 39|32@0- (1,0) [0|0] ""  Vector__XXX

SIG_VALTYPE_ 292 ratio : 1;
"#;
        let db = crate::Database::from_string(float_dbc).unwrap();
        let mut input = BTreeMap::new();
        input.insert("ratio".to_string(), Value::Float(-2.5));
        input.insert("wide".to_string(), Value::Integer(-123456));

        let frame = db.encode_message("Floats", &input, true, false, true).unwrap();
        let decoded = db.decode_message("Floats", &frame.data, false, true).unwrap();
        assert_eq!(decoded["ratio"], Value::Float(-2.5));
        assert_eq!(decoded["wide"], Value::Integer(-123456));
    }
}
