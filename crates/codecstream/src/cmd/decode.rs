use codecstream_codec::Codec;
use codecstream_stream::{many, try_many, Element, StreamDecoder};
use serde::Serialize;
use tracing::{debug, info};

use crate::cmd::{open_input, session_config, DecodeArgs};
use crate::exit::{stream_error, CliResult, SUCCESS};
use crate::output::{print_report, OutputFormat, Report};

/// A decoded scalar, whatever the codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DecodedValue {
    Int(i64),
    UInt(u64),
    Text(String),
}

macro_rules! decoded_from {
    ($variant:ident as $wide:ty: $($ty:ty),*) => {
        $(
            impl From<$ty> for DecodedValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(<$wide>::from(value))
                }
            }
        )*
    };
}

decoded_from!(Int as i64: i8, i16, i32, i64);
decoded_from!(UInt as u64: u8, u16, u32, u64);

impl From<String> for DecodedValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl std::fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v:?}"),
        }
    }
}

#[derive(Serialize)]
struct DecodeReport {
    codec: String,
    count: usize,
    values: Vec<DecodedValue>,
}

impl Report for DecodeReport {
    fn headers(&self) -> Vec<&'static str> {
        vec!["INDEX", "VALUE"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.values
            .iter()
            .enumerate()
            .map(|(index, value)| vec![index.to_string(), value.to_string()])
            .collect()
    }
}

/// The plan `decode` runs for one codec and set of flags.
pub fn plan_for<C>(codec: C, args: &DecodeArgs) -> StreamDecoder<DecodedValue>
where
    C: Codec + 'static,
    C::Value: Element + Into<DecodedValue>,
{
    let values = if args.try_decode {
        try_many(codec)
    } else {
        many(codec)
    };
    let plan = values.map(|value| -> DecodedValue { value.into() });
    match (args.isolate, args.strict) {
        (Some(bits), true) => plan.strict_isolate(bits),
        (Some(bits), false) => plan.isolate(bits),
        (None, _) => plan,
    }
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let plan = with_codec!(args.codec, |codec| plan_for(codec, &args));
    let config = session_config(args.chunk_size);
    debug!(
        input = %args.input,
        codec = ?args.codec,
        read_chunk = config.read_chunk_size,
        "decoding"
    );

    let reader = open_input(&args.input)?;
    let values = plan
        .decode_reader(reader, config)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| stream_error(&format!("decode {}", args.input), err))?;
    info!(count = values.len(), "decoded values");

    let report = DecodeReport {
        codec: args.codec.name(),
        count: values.len(),
        values,
    };
    print_report(&report, format);
    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use codecstream_bits::BitVector;
    use codecstream_codec::codecs::{int16, uint8, utf8_32};

    use super::*;
    use crate::cmd::CodecName;

    fn args(try_decode: bool, isolate: Option<u64>, strict: bool) -> DecodeArgs {
        DecodeArgs {
            input: "-".to_string(),
            codec: CodecName::Int16,
            try_decode,
            isolate,
            strict,
            chunk_size: None,
        }
    }

    #[test]
    fn widens_signed_values() {
        let plan = plan_for(int16(), &args(false, None, false));
        let values = plan
            .decode_all(BitVector::from_bytes(vec![0xFF, 0xFE, 0x00, 0x01]))
            .unwrap();
        assert_eq!(values, vec![DecodedValue::Int(-2), DecodedValue::Int(1)]);
    }

    #[test]
    fn isolate_flag_limits_input() {
        let plan = plan_for(uint8(), &args(false, Some(8), false));
        let values = plan.decode_all(BitVector::from_bytes(vec![4, 5])).unwrap();
        assert_eq!(values, vec![DecodedValue::UInt(4)]);
    }

    #[test]
    fn strict_flag_rejects_partial_region() {
        let plan = plan_for(int16(), &args(false, Some(24), true));
        let err = plan
            .decode_all(BitVector::from_bytes(vec![0, 1, 2]))
            .unwrap_err();
        assert!(err.codec().is_some());
    }

    #[test]
    fn text_values_serialize_untagged() {
        let plan = plan_for(utf8_32(), &args(true, None, false));
        let wire = utf8_32().encode(&"ok".to_string()).unwrap();
        let values = plan.decode_all(wire).unwrap();
        assert_eq!(
            serde_json::to_string(&values).unwrap(),
            "[\"ok\"]".to_string()
        );
    }
}
