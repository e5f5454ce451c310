use std::collections::HashMap;

use crate::types::database::SignalKey;
use crate::types::signal::{Endianness, Signal, Signess};

/// Raw (unscaled) value of a single field on the wire.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Raw {
    Int(i64),
    Float(f64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FieldKind {
    Unsigned,
    Signed,
    Float,
}

/// One field of a pack program, pinned to its position on the MSB-first
/// bit stream of the program's buffer.
#[derive(Clone, Debug)]
pub(crate) struct FieldSpec {
    pub(crate) key: SignalKey,
    pub(crate) kind: FieldKind,
    pub(crate) pos: usize,
    pub(crate) bits: u16,
}

/// A one-endianness packing program over a `byte_length`-sized buffer.
///
/// The little-endian program operates on the byte-reversed frame: its
/// packed buffer is reversed on emit and its unpack consumes a reversed
/// frame.
#[derive(Clone, Debug, Default)]
pub(crate) struct PackProgram {
    pub(crate) fields: Vec<FieldSpec>,
    pub(crate) byte_length: usize,
}

/// The two packing programs of a codec node plus the combined padding
/// mask (bits claimed by no signal, in frame byte order).
#[derive(Clone, Debug, Default)]
pub(crate) struct Formats {
    pub(crate) big: PackProgram,
    pub(crate) little: PackProgram,
    pub(crate) padding_mask: Vec<u8>,
}

impl PackProgram {
    pub(crate) fn pack(&self, raws: &HashMap<SignalKey, Raw>) -> Vec<u8> {
        let mut buffer = vec![0u8; self.byte_length];
        for field in &self.fields {
            if let Some(raw) = raws.get(&field.key) {
                write_bits(&mut buffer, field.pos, field.bits, field.to_bits(*raw));
            }
        }
        buffer
    }

    pub(crate) fn unpack(&self, data: &[u8]) -> Vec<(SignalKey, Raw)> {
        self.fields
            .iter()
            .map(|field| (field.key, field.from_bits(read_bits(data, field.pos, field.bits))))
            .collect()
    }
}

impl FieldSpec {
    fn to_bits(&self, raw: Raw) -> u64 {
        match self.kind {
            FieldKind::Unsigned | FieldKind::Signed => {
                let value = match raw {
                    Raw::Int(value) => value,
                    Raw::Float(value) => value as i64,
                };
                (value as u64) & width_mask(self.bits)
            }
            FieldKind::Float => {
                let value = match raw {
                    Raw::Float(value) => value,
                    Raw::Int(value) => value as f64,
                };
                if self.bits == 64 {
                    value.to_bits()
                } else {
                    (value as f32).to_bits() as u64
                }
            }
        }
    }

    fn from_bits(&self, bits: u64) -> Raw {
        match self.kind {
            FieldKind::Unsigned => Raw::Int(bits as i64),
            FieldKind::Signed => Raw::Int(sign_extend(bits, self.bits)),
            FieldKind::Float => {
                if self.bits == 64 {
                    Raw::Float(f64::from_bits(bits))
                } else {
                    Raw::Float(f32::from_bits(bits as u32) as f64)
                }
            }
        }
    }
}

fn width_mask(bits: u16) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

fn sign_extend(raw: u64, bits: u16) -> i64 {
    let n = bits.min(64);
    if n == 0 || n == 64 {
        return raw as i64;
    }
    let sign_bit = 1u64 << (n - 1);
    if raw & sign_bit != 0 {
        (raw | !width_mask(n)) as i64
    } else {
        raw as i64
    }
}

/// Writes `bits` of `value` MSB-first at stream position `pos`.
/// Chunked per byte; positions past the buffer are dropped.
fn write_bits(buffer: &mut [u8], pos: usize, bits: u16, value: u64) {
    let mut remaining = bits as usize;
    let mut pos = pos;
    while remaining > 0 {
        let byte = pos / 8;
        let bit_off = pos % 8; // 0 = MSB of the byte
        let avail = 8 - bit_off;
        let take = avail.min(remaining);
        let chunk = ((value >> (remaining - take)) & ((1u64 << take) - 1)) as u8;
        if let Some(slot) = buffer.get_mut(byte) {
            *slot |= chunk << (avail - take);
        }
        pos += take;
        remaining -= take;
    }
}

/// Reads `bits` MSB-first from stream position `pos`. Positions past
/// the buffer read as zero.
fn read_bits(data: &[u8], pos: usize, bits: u16) -> u64 {
    let mut out: u64 = 0;
    let mut remaining = bits as usize;
    let mut pos = pos;
    while remaining > 0 {
        let byte = pos / 8;
        let bit_off = pos % 8;
        let avail = 8 - bit_off;
        let take = avail.min(remaining);
        let chunk = match data.get(byte) {
            Some(&value) => (value >> (avail - take)) & (((1u16 << take) - 1) as u8),
            None => 0,
        };
        out = (out << take) | chunk as u64;
        pos += take;
        remaining -= take;
    }
    out
}

fn clear_mask_bits(mask: &mut [u8], pos: usize, bits: u16) {
    let mut remaining = bits as usize;
    let mut pos = pos;
    while remaining > 0 {
        let byte = pos / 8;
        let bit_off = pos % 8;
        let avail = 8 - bit_off;
        let take = avail.min(remaining);
        let chunk = (((1u16 << take) - 1) as u8) << (avail - take);
        if let Some(slot) = mask.get_mut(byte) {
            *slot &= !chunk;
        }
        pos += take;
        remaining -= take;
    }
}

fn field_kind(signal: &Signal) -> FieldKind {
    match signal.sign {
        Signess::Unsigned => FieldKind::Unsigned,
        Signess::Signed => FieldKind::Signed,
        Signess::IeeeFloat | Signess::IeeeDouble => FieldKind::Float,
    }
}

/// Builds the two packing programs and the padding mask for a signal
/// set against the full message length.
///
/// `signals` must be ordered by linearized start bit; the caller
/// (`Database::refresh`) sorts the message before the codec is built.
pub(crate) fn create_formats(signals: &[(SignalKey, &Signal)], byte_length: u16) -> Formats {
    let byte_length = byte_length as usize;
    let total_bits = 8 * byte_length;

    let mut big = PackProgram {
        fields: Vec::new(),
        byte_length,
    };
    let mut little = PackProgram {
        fields: Vec::new(),
        byte_length,
    };
    let mut big_mask = vec![0xFFu8; byte_length];
    let mut little_mask = vec![0xFFu8; byte_length];

    for (key, signal) in signals {
        let span = signal.bit_start as usize + signal.bit_length as usize;
        match signal.endian {
            Endianness::Motorola => {
                let pos = signal.start_bit() as usize;
                if pos + signal.bit_length as usize > total_bits {
                    // Overflowing signals are diagnosed by the layout
                    // validator; packing them would corrupt neighbours.
                    continue;
                }
                big.fields.push(FieldSpec {
                    key: *key,
                    kind: field_kind(signal),
                    pos,
                    bits: signal.bit_length,
                });
                clear_mask_bits(&mut big_mask, pos, signal.bit_length);
            }
            Endianness::Intel => {
                if span > total_bits {
                    continue;
                }
                // Position on the MSB-first stream of the reversed frame.
                let pos = total_bits - span;
                little.fields.push(FieldSpec {
                    key: *key,
                    kind: field_kind(signal),
                    pos,
                    bits: signal.bit_length,
                });
                clear_mask_bits(&mut little_mask, pos, signal.bit_length);
            }
        }
    }

    little_mask.reverse();
    let padding_mask = big_mask
        .iter()
        .zip(little_mask.iter())
        .map(|(big, little)| big & little)
        .collect();

    Formats {
        big,
        little,
        padding_mask,
    }
}
