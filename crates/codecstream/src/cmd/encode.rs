use std::fmt::Display;
use std::fs::File;
use std::io::Write;
use std::str::FromStr;

use codecstream_codec::Codec;
use codecstream_stream::{EncodeWriter, StreamEncoder};
use serde::Serialize;
use tracing::{debug, info};

use crate::cmd::EncodeArgs;
use crate::exit::{io_error, stream_error, CliError, CliResult, SUCCESS};
use crate::output::{hex, print_report, OutputFormat, Report};

#[derive(Serialize)]
struct EncodeReport {
    codec: String,
    values: usize,
    bits: u64,
    bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
}

impl Report for EncodeReport {
    fn headers(&self) -> Vec<&'static str> {
        vec!["CODEC", "VALUES", "BITS", "BYTES", "DATA"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let data = self
            .output
            .clone()
            .or_else(|| self.hex.clone())
            .unwrap_or_default();
        vec![vec![
            self.codec.clone(),
            self.values.to_string(),
            self.bits.to_string(),
            self.bytes.to_string(),
            data,
        ]]
    }
}

/// Parse every command-line value with the codec's value type.
pub fn parse_values<T>(raw: &[String]) -> CliResult<Vec<T>>
where
    T: FromStr,
    T::Err: Display,
{
    raw.iter()
        .map(|text| {
            text.trim()
                .parse::<T>()
                .map_err(|err| CliError::usage(format!("invalid value {text:?}: {err}")))
        })
        .collect()
}

/// Encode `values` through `writer`, returning the stream and the bit count.
pub fn encode_into<C, W>(codec: C, values: Vec<C::Value>, writer: W) -> CliResult<(W, u64)>
where
    C: Codec + 'static,
    C::Value: 'static,
    W: Write,
{
    let plan = StreamEncoder::many(codec);
    let mut writer = EncodeWriter::new(writer);
    let bits = writer
        .write_all_chunks(plan.encode(values))
        .map_err(|err| stream_error("encode", err))?;
    let inner = writer
        .finish()
        .map_err(|err| stream_error("flush output", err))?;
    Ok((inner, bits))
}

fn run_with<C>(codec: C, args: &EncodeArgs) -> CliResult<EncodeReport>
where
    C: Codec + 'static,
    C::Value: FromStr + 'static,
    <C::Value as FromStr>::Err: Display,
{
    let values = parse_values::<C::Value>(&args.values)?;
    let count = values.len();
    debug!(codec = ?args.codec, count, "encoding");

    let report = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|err| io_error(&format!("create {}", path.display()), err))?;
            let (_, bits) = encode_into(codec, values, file)?;
            EncodeReport {
                codec: args.codec.name(),
                values: count,
                bits,
                bytes: bits.div_ceil(8) as usize,
                hex: None,
                output: Some(path.display().to_string()),
            }
        }
        None => {
            let (bytes, bits) = encode_into(codec, values, Vec::new())?;
            EncodeReport {
                codec: args.codec.name(),
                values: count,
                bits,
                bytes: bytes.len(),
                hex: Some(hex(&bytes)),
                output: None,
            }
        }
    };
    Ok(report)
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let report = with_codec!(args.codec, |codec| run_with(codec, &args))?;
    info!(bits = report.bits, "encoded values");
    print_report(&report, format);
    Ok(SUCCESS)
}
