use bytes::Bytes;
use codecstream_codec::codecs::{self, uint32};
use codecstream_stream::{once, StreamDecoder};
use serde::Serialize;
use tracing::{debug, info};

use crate::cmd::{open_input, session_config, RecordsArgs};
use crate::exit::{stream_error, CliResult, SUCCESS};
use crate::output::{payload_preview, print_report, OutputFormat, Report};

/// One `id | length | payload` record, all integers big-endian u32.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: u32,
    pub payload: Bytes,
}

/// A single record. The payload is read inside a strict region of exactly
/// `length` bytes.
pub fn record() -> StreamDecoder<Record> {
    once(uint32()).flat_map(|id| {
        once(uint32()).flat_map(move |len| {
            // `once` over an empty region yields nothing.
            if len == 0 {
                return StreamDecoder::emit_one(Record {
                    id,
                    payload: Bytes::new(),
                });
            }
            once(codecs::bytes(len as usize))
                .strict_isolate(u64::from(len) * 8)
                .map(move |payload| Record { id, payload })
        })
    })
}

/// A u32 record count followed by that many records.
pub fn counted_records() -> StreamDecoder<Record> {
    once(uint32()).flat_map(|count| {
        debug!(count, "record header");
        record().repeat_n(u64::from(count))
    })
}

#[derive(Serialize)]
struct RecordRow {
    id: u32,
    size: usize,
    payload: String,
}

#[derive(Serialize)]
struct RecordsReport {
    count: usize,
    records: Vec<RecordRow>,
}

impl Report for RecordsReport {
    fn headers(&self) -> Vec<&'static str> {
        vec!["ID", "SIZE", "PAYLOAD"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.records
            .iter()
            .map(|r| vec![r.id.to_string(), r.size.to_string(), r.payload.clone()])
            .collect()
    }
}

pub fn run(args: RecordsArgs, format: OutputFormat) -> CliResult<i32> {
    let config = session_config(args.chunk_size);
    let reader = open_input(&args.input)?;
    let records = counted_records()
        .decode_reader(reader, config)
        .map(|record| {
            record.map(|r| RecordRow {
                id: r.id,
                size: r.payload.len(),
                payload: payload_preview(&r.payload),
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| stream_error(&format!("records {}", args.input), err))?;
    info!(count = records.len(), "decoded records");

    let report = RecordsReport {
        count: records.len(),
        records,
    };
    print_report(&report, format);
    Ok(SUCCESS)
}
