use std::io;
use thiserror::Error;

/// Structural errors: malformed frame identifiers, impossible signal
/// layouts, inconsistent multiplexing.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Expected priority 0..7, but got {value}")]
    PriorityOutOfRange { value: u32 },
    #[error("Expected reserved 0..1, but got {value}")]
    ReservedOutOfRange { value: u32 },
    #[error("Expected data page 0..1, but got {value}")]
    DataPageOutOfRange { value: u32 },
    #[error("Expected PDU format 0..255, but got {value}")]
    PduFormatOutOfRange { value: u32 },
    #[error("Expected PDU specific 0..255, but got {value}")]
    PduSpecificOutOfRange { value: u32 },
    #[error("Expected source address 0..255, but got {value}")]
    SourceAddressOutOfRange { value: u32 },
    #[error("Expected a frame id 0..0x1fffffff, but got {value:#x}")]
    FrameIdOutOfRange { value: u32 },
    #[error("Expected a parameter group number 0..0x3ffff, but got {value:#x}")]
    PgnOutOfRange { value: u32 },
    #[error("Expected PDU specific 0 when PDU format is 0..239, but got {pdu_specific}")]
    PduSpecificNotZero { pdu_specific: u8 },
    #[error("Standard frame id {id:#x} is more than 11 bits in message {message}")]
    StandardFrameIdTooWide { id: u32, message: String },
    #[error("Extended frame id {id:#x} is more than 29 bits in message {message}")]
    ExtendedFrameIdTooWide { id: u32, message: String },
    #[error("The signal {signal} length {length} is not greater than 0 in message {message}")]
    ZeroBitLength {
        signal: String,
        length: u16,
        message: String,
    },
    #[error("The signal {signal} does not fit in message {message}")]
    SignalDoesNotFit { signal: String, message: String },
    #[error("The signals {signal} and {other} are overlapping in message {message}")]
    SignalOverlap {
        signal: String,
        other: String,
        message: String,
    },
    #[error("Message {message} has more than one root multiplexer")]
    MultipleRootMultiplexers { message: String },
}

/// Errors raised while encoding a signal dictionary into frame bytes.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Expected signal value for '{signal}' in data for message '{message}'")]
    MissingSignal { signal: String, message: String },
    #[error(
        "Expected signal '{signal}' value greater than or equal to {minimum} in message '{message}', but got {value}"
    )]
    BelowMinimum {
        signal: String,
        message: String,
        minimum: f64,
        value: f64,
    },
    #[error(
        "Expected signal '{signal}' value less than or equal to {maximum} in message '{message}', but got {value}"
    )]
    AboveMaximum {
        signal: String,
        message: String,
        maximum: f64,
        value: f64,
    },
    #[error("expected multiplexer id {expected}, but got {got}")]
    BadMultiplexerId { expected: String, got: i64 },
    #[error("Choice '{choice}' is not defined for signal '{signal}'")]
    BadChoice { signal: String, choice: String },
    #[error("Signal '{signal}' is not attached to any message")]
    NotAttached { signal: String },
    #[error("Message '{message}' has no compiled codec, refresh the database first")]
    MissingCodec { message: String },
    #[error("No message named or numbered {message} in the database")]
    UnknownMessage { message: String },
}

/// Errors raised while decoding frame bytes back into signal values.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Message '{message}' expects {expected} data bytes, but got {got}")]
    ShortData {
        message: String,
        expected: usize,
        got: usize,
    },
    #[error("expected multiplexer id {expected}, but got {got}")]
    BadMultiplexerId { expected: String, got: i64 },
    #[error("Message '{message}' has no compiled codec, refresh the database first")]
    MissingCodec { message: String },
    #[error("No message named or numbered {message} in the database")]
    UnknownMessage { message: String },
}

/// Errors produced while loading a `.dbc` file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Not a valid .dbc file: {path}")]
    InvalidExtension { path: String },
    #[error("Failed to open '{path}'. \nError: {source}")]
    OpenFile {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed while reading '{path}'. \nError: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Invalid(#[from] Error),
}

/// Errors produced while serializing a database back to DBC text.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Not a valid .dbc destination: {path}")]
    InvalidExtension { path: String },
    #[error("Failed to create directory '{path}'. \nError: {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to create '{path}'. \nError: {source}")]
    CreateFile {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed while writing '{path}'. \nError: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Formatting failed while serializing the database")]
    Format,
}
