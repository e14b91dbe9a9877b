use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use codecstream_stream::SessionConfig;

use crate::exit::{io_error, CliResult};
use crate::output::OutputFormat;

/// Expand `$body` once per codec name with `$codec` bound to the matching
/// scalar codec.
macro_rules! with_codec {
    ($name:expr, |$codec:ident| $body:expr) => {{
        use codecstream_codec::codecs;
        match $name {
            $crate::cmd::CodecName::Int8 => { let $codec = codecs::int8(); $body }
            $crate::cmd::CodecName::Uint8 => { let $codec = codecs::uint8(); $body }
            $crate::cmd::CodecName::Int16 => { let $codec = codecs::int16(); $body }
            $crate::cmd::CodecName::Uint16 => { let $codec = codecs::uint16(); $body }
            $crate::cmd::CodecName::Int32 => { let $codec = codecs::int32(); $body }
            $crate::cmd::CodecName::Uint32 => { let $codec = codecs::uint32(); $body }
            $crate::cmd::CodecName::Int64 => { let $codec = codecs::int64(); $body }
            $crate::cmd::CodecName::Uint64 => { let $codec = codecs::uint64(); $body }
            $crate::cmd::CodecName::Int16Le => { let $codec = codecs::int16_le(); $body }
            $crate::cmd::CodecName::Uint16Le => { let $codec = codecs::uint16_le(); $body }
            $crate::cmd::CodecName::Int32Le => { let $codec = codecs::int32_le(); $body }
            $crate::cmd::CodecName::Uint32Le => { let $codec = codecs::uint32_le(); $body }
            $crate::cmd::CodecName::Int64Le => { let $codec = codecs::int64_le(); $body }
            $crate::cmd::CodecName::Uint64Le => { let $codec = codecs::uint64_le(); $body }
            $crate::cmd::CodecName::Utf8 => { let $codec = codecs::utf8_32(); $body }
        }
    }};
}

pub mod decode;
pub mod encode;
pub mod records;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode a sequence of values.
    Decode(DecodeArgs),
    /// Encode values and write the bytes.
    Encode(EncodeArgs),
    /// Decode a count-prefixed stream of id/length/payload records.
    Records(RecordsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Decode(args) => decode::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Records(args) => records::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Scalar codecs selectable from the command line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum CodecName {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Int16Le,
    Uint16Le,
    Int32Le,
    Uint32Le,
    Int64Le,
    Uint64Le,
    /// UTF-8 text with a 32-bit byte length prefix.
    Utf8,
}

impl CodecName {
    /// The name as typed on the command line.
    pub fn name(self) -> String {
        self.to_possible_value()
            .map(|value| value.get_name().to_string())
            .unwrap_or_default()
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Input file, or `-` for stdin.
    pub input: String,
    /// Codec for each value.
    #[arg(long)]
    pub codec: CodecName,
    /// Stop quietly at the first undecodable value instead of failing.
    #[arg(long = "try")]
    pub try_decode: bool,
    /// Decode only the first BITS bits of the input.
    #[arg(long, value_name = "BITS")]
    pub isolate: Option<u64>,
    /// Fail if the isolated region is not fully consumed.
    #[arg(long, requires = "isolate")]
    pub strict: bool,
    /// Bytes per read.
    #[arg(long, value_name = "N")]
    pub chunk_size: Option<usize>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Codec for each value.
    #[arg(long)]
    pub codec: CodecName,
    /// Values to encode (comma-separated).
    #[arg(long, value_delimiter = ',', required = true)]
    pub values: Vec<String>,
    /// Write bytes to FILE instead of printing them as hex.
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RecordsArgs {
    /// Input file, or `-` for stdin.
    pub input: String,
    /// Bytes per read.
    #[arg(long, value_name = "N")]
    pub chunk_size: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn open_input(input: &str) -> CliResult<Box<dyn Read>> {
    if input == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(input).map_err(|err| io_error(&format!("open {input}"), err))?;
    Ok(Box::new(BufReader::new(file)))
}

pub(crate) fn session_config(chunk_size: Option<usize>) -> SessionConfig {
    match chunk_size {
        Some(bytes) => SessionConfig::default().with_read_chunk_size(bytes),
        None => SessionConfig::default(),
    }
}
