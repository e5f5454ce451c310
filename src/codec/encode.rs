use std::collections::{BTreeMap, HashMap};

use crate::codec::layout::Raw;
use crate::codec::{CodecNode, format_or, scaling};
use crate::types::database::Database;
use crate::types::errors::EncodeError;
use crate::types::frame_data::Value;
use crate::types::message::Message;
use crate::types::signal::Signal;

/// Encodes a signal dictionary into the message payload.
///
/// The big-endian and little-endian programs each pack their own
/// buffer; ORing the two (the little one byte-reversed) composes the
/// frame because the programs never claim the same bits. Multiplexer
/// children contribute the same way, one level at a time.
pub(crate) fn encode_message(
    db: &Database,
    message: &Message,
    codec: &CodecNode,
    data: &BTreeMap<String, Value>,
    scaling: bool,
    padding: bool,
    strict: bool,
) -> Result<Vec<u8>, EncodeError> {
    let mut work = data.clone();
    let (mut buffer, padding_mask) =
        encode_node(db, message, codec, &mut work, scaling, strict)?;

    if padding {
        for (byte, mask) in buffer.iter_mut().zip(padding_mask) {
            *byte |= mask;
        }
    }

    Ok(buffer)
}

fn encode_node(
    db: &Database,
    message: &Message,
    node: &CodecNode,
    work: &mut BTreeMap<String, Value>,
    scaling: bool,
    strict: bool,
) -> Result<(Vec<u8>, Vec<u8>), EncodeError> {
    if strict {
        check_signals(db, message, node, work, scaling)?;
    }

    let mut raws: HashMap<_, Raw> = HashMap::with_capacity(node.signals.len());
    for &sig_key in &node.signals {
        let Some(signal) = db.get_sig_by_key(sig_key) else {
            continue;
        };
        let value = work
            .get(&signal.name)
            .ok_or_else(|| EncodeError::MissingSignal {
                signal: signal.name.clone(),
                message: message.name.clone(),
            })?;
        raws.insert(sig_key, encode_field(signal, value, scaling)?);
    }

    let mut buffer = node.formats.big.pack(&raws);
    let mut little = node.formats.little.pack(&raws);
    little.reverse();
    for (byte, other) in buffer.iter_mut().zip(little) {
        *byte |= other;
    }
    let mut padding_mask = node.formats.padding_mask.clone();

    for (mux_key, children) in &node.multiplexers {
        let Some(switch) = db.get_sig_by_key(*mux_key) else {
            continue;
        };
        let selector = mux_selector(switch, work, message)?;
        let child = children
            .get(&selector)
            .ok_or_else(|| EncodeError::BadMultiplexerId {
                expected: format_or(children.keys().copied()),
                got: selector,
            })?;

        let (child_buffer, child_mask) =
            encode_node(db, message, child, work, scaling, strict)?;
        for (byte, other) in buffer.iter_mut().zip(child_buffer) {
            *byte |= other;
        }
        for (mask, other) in padding_mask.iter_mut().zip(child_mask) {
            *mask &= other;
        }
    }

    Ok((buffer, padding_mask))
}

/// The encoded selector value of a multiplexer switch, with choice
/// labels resolved back through the value table.
fn mux_selector(
    switch: &Signal,
    work: &BTreeMap<String, Value>,
    message: &Message,
) -> Result<i64, EncodeError> {
    let value = work
        .get(&switch.name)
        .ok_or_else(|| EncodeError::MissingSignal {
            signal: switch.name.clone(),
            message: message.name.clone(),
        })?;

    match value {
        Value::Label(label) => {
            switch
                .choice_to_number(label)
                .ok_or_else(|| EncodeError::BadChoice {
                    signal: switch.name.clone(),
                    choice: label.clone(),
                })
        }
        Value::Integer(selector) => Ok(*selector),
        Value::Bool(selector) => Ok(*selector as i64),
        Value::Float(selector) => Ok(*selector as i64),
    }
}

/// Strict-mode pass: fill absent signals from their start values and
/// validate declared ranges.
fn check_signals(
    db: &Database,
    message: &Message,
    node: &CodecNode,
    work: &mut BTreeMap<String, Value>,
    scaling: bool,
) -> Result<(), EncodeError> {
    for &sig_key in &node.signals {
        let Some(signal) = db.get_sig_by_key(sig_key) else {
            continue;
        };
        if !work.contains_key(&signal.name) {
            let Some(start) = signal.gen_sig_start_value(db) else {
                return Err(EncodeError::MissingSignal {
                    signal: signal.name.clone(),
                    message: message.name.clone(),
                });
            };
            work.insert(
                signal.name.clone(),
                Value::Float(start + signal.offset),
            );
        }
    }

    if !scaling {
        return Ok(());
    }

    for &sig_key in &node.signals {
        let Some(signal) = db.get_sig_by_key(sig_key) else {
            continue;
        };
        // Choices are checked later, during field encoding.
        let Some(value) = work.get(&signal.name).and_then(Value::as_f64) else {
            continue;
        };
        if let Some(minimum) = signal.min
            && value < minimum
        {
            return Err(EncodeError::BelowMinimum {
                signal: signal.name.clone(),
                message: message.name.clone(),
                minimum,
                value,
            });
        }
        if let Some(maximum) = signal.max
            && value > maximum
        {
            return Err(EncodeError::AboveMaximum {
                signal: signal.name.clone(),
                message: message.name.clone(),
                maximum,
                value,
            });
        }
    }

    Ok(())
}

fn encode_field(signal: &Signal, value: &Value, scaling: bool) -> Result<Raw, EncodeError> {
    if let Value::Label(label) = value {
        let number =
            signal
                .choice_to_number(label)
                .ok_or_else(|| EncodeError::BadChoice {
                    signal: signal.name.clone(),
                    choice: label.clone(),
                })?;
        return Ok(Raw::Int(number));
    }

    if signal.is_float() {
        let value = value.as_f64().unwrap_or_default();
        return Ok(if scaling {
            Raw::Float((value - signal.offset) / signal.factor)
        } else {
            Raw::Float(value)
        });
    }

    let raw = match value {
        Value::Integer(value) if scaling => {
            scaling::int_to_raw(*value, signal.offset, signal.factor)
        }
        Value::Integer(value) => *value,
        Value::Bool(value) if scaling => {
            scaling::int_to_raw(*value as i64, signal.offset, signal.factor)
        }
        Value::Bool(value) => *value as i64,
        Value::Float(value) if scaling => {
            scaling::float_to_raw(*value, signal.offset, signal.factor)
        }
        Value::Float(value) => *value as i64,
        Value::Label(_) => unreachable!(),
    };

    Ok(Raw::Int(raw))
}
