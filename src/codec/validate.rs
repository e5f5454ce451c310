use crate::codec::CodecNode;
use crate::types::database::{Database, SignalKey};
use crate::types::errors::Error;
use crate::types::message::Message;
use crate::types::signal::{Endianness, Signal};

/// Checks that the signals of a message fit the frame and do not
/// overlap, walking the codec tree so that sibling multiplexer branches
/// may share bits while ancestors may not.
///
/// `strict` turns every finding into a hard error; otherwise findings
/// are logged and the walk continues.
pub(crate) fn check_message(
    db: &Database,
    message: &Message,
    codec: &CodecNode,
    strict: bool,
) -> Result<(), Error> {
    let mut bits: Vec<Option<SignalKey>> = vec![None; 8 * message.byte_length as usize];
    check_node(db, message, codec, &mut bits, strict)
}

fn check_node(
    db: &Database,
    message: &Message,
    node: &CodecNode,
    bits: &mut Vec<Option<SignalKey>>,
    strict: bool,
) -> Result<(), Error> {
    for &sig_key in &node.signals {
        if let Some(signal) = db.get_sig_by_key(sig_key) {
            check_signal(db, message, sig_key, signal, bits, strict)?;
        }
    }

    for (_, children) in &node.multiplexers {
        // Branches of one multiplexer may collide with each other, but
        // not with anything already claimed by ancestors.
        let base = bits.clone();
        for child in children.values() {
            let mut child_bits = base.clone();
            check_node(db, message, child, &mut child_bits, strict)?;

            for (slot, child_slot) in bits.iter_mut().zip(child_bits) {
                if child_slot.is_some() {
                    *slot = child_slot;
                }
            }
        }
    }

    Ok(())
}

/// Stream positions claimed by a signal, in claim order.
fn signal_positions(signal: &Signal) -> Vec<usize> {
    match signal.endian {
        Endianness::Motorola => {
            let start = signal.start_bit() as usize;
            (start..start + signal.bit_length as usize).collect()
        }
        Endianness::Intel => {
            let start = signal.bit_start as usize;
            (start..start + signal.bit_length as usize)
                .map(|linear| 8 * (linear / 8) + (7 - linear % 8))
                .collect()
        }
    }
}

fn check_signal(
    db: &Database,
    message: &Message,
    sig_key: SignalKey,
    signal: &Signal,
    bits: &mut [Option<SignalKey>],
    strict: bool,
) -> Result<(), Error> {
    let positions = signal_positions(signal);

    if positions.iter().any(|&pos| pos >= bits.len()) {
        if strict {
            return Err(Error::SignalDoesNotFit {
                signal: signal.name.clone(),
                message: message.name.clone(),
            });
        }
        tracing::warn!(
            "The signal {} does not fit in message {}.",
            signal.name,
            message.name
        );
        return Ok(());
    }

    for (claimed, &pos) in positions.iter().enumerate() {
        if let Some(other_key) = bits[pos] {
            let other = db
                .get_sig_by_key(other_key)
                .map(|other| other.name.clone())
                .unwrap_or_default();
            // Retract the partial claim so one bad signal does not
            // cascade into reports against every later one.
            for &undo in &positions[..claimed] {
                bits[undo] = None;
            }
            if strict {
                return Err(Error::SignalOverlap {
                    signal: signal.name.clone(),
                    other,
                    message: message.name.clone(),
                });
            }
            tracing::warn!(
                "The signals {} and {} are overlapping in message {}.",
                signal.name,
                other,
                message.name
            );
            return Ok(());
        }
        bits[pos] = Some(sig_key);
    }

    Ok(())
}
