use crate::codec::layout::Raw;
use crate::codec::{CodecNode, format_or, scaling};
use crate::types::database::Database;
use crate::types::errors::DecodeError;
use crate::types::frame_data::{RxFrame, Value};
use crate::types::message::Message;
use crate::types::signal::Signal;

/// Decodes a message payload into named signal values.
///
/// The caller has already clamped `data` to the message length.
pub(crate) fn decode_message(
    db: &Database,
    message: &Message,
    codec: &CodecNode,
    data: &[u8],
    decode_choices: bool,
    scaling: bool,
    out: &mut RxFrame,
) -> Result<(), DecodeError> {
    decode_node(db, message, codec, data, decode_choices, scaling, out)
}

fn decode_node(
    db: &Database,
    message: &Message,
    node: &CodecNode,
    data: &[u8],
    decode_choices: bool,
    scaling: bool,
    out: &mut RxFrame,
) -> Result<(), DecodeError> {
    let mut reversed = data.to_vec();
    reversed.reverse();

    let mut raws = node.formats.big.unpack(data);
    raws.extend(node.formats.little.unpack(&reversed));

    // Materialize in layout order, not unpack order.
    for &sig_key in &node.signals {
        let Some(signal) = db.get_sig_by_key(sig_key) else {
            continue;
        };
        if let Some(&(_, raw)) = raws.iter().find(|(key, _)| *key == sig_key) {
            out.insert(
                signal.name.clone(),
                decode_field(signal, raw, decode_choices, scaling),
            );
        }
    }

    for (mux_key, children) in &node.multiplexers {
        let Some(switch) = db.get_sig_by_key(*mux_key) else {
            continue;
        };
        let selector = mux_selector(switch, out);
        let child = children
            .get(&selector)
            .ok_or_else(|| DecodeError::BadMultiplexerId {
                expected: format_or(children.keys().copied()),
                got: selector,
            })?;
        decode_node(db, message, child, data, decode_choices, scaling, out)?;
    }

    Ok(())
}

/// The decoded selector value of a multiplexer switch; a choice label
/// produced by `decode_choices` is resolved back to its raw value.
fn mux_selector(switch: &Signal, decoded: &RxFrame) -> i64 {
    match decoded.get(&switch.name) {
        Some(Value::Label(label)) => switch.choice_to_number(label).unwrap_or(i64::MIN),
        Some(Value::Integer(selector)) => *selector,
        Some(Value::Float(selector)) => *selector as i64,
        Some(Value::Bool(selector)) => *selector as i64,
        None => i64::MIN,
    }
}

fn decode_field(signal: &Signal, raw: Raw, decode_choices: bool, scaling: bool) -> Value {
    if decode_choices
        && let Raw::Int(raw) = raw
        && let Some(label) = signal.value_table.get(&raw)
    {
        return Value::Label(label.clone());
    }

    match raw {
        Raw::Float(raw) => {
            if scaling {
                Value::Float(signal.factor * raw + signal.offset)
            } else {
                Value::Float(raw)
            }
        }
        Raw::Int(raw) => {
            if !scaling {
                Value::Integer(raw)
            } else if scaling::is_integral(signal.factor) && scaling::is_integral(signal.offset) {
                // Integer factor and offset keep integer fields integral.
                Value::Integer(raw * signal.factor as i64 + signal.offset as i64)
            } else {
                Value::Float(signal.factor * raw as f64 + signal.offset)
            }
        }
    }
}
