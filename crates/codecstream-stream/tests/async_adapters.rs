#![cfg(feature = "async")]

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use codecstream_bits::BitVector;
use codecstream_codec::codecs::{int32, uint16, uint8};
use codecstream_codec::Codec;
use codecstream_stream::{
    many, once, AsyncPull, PlanCodec, Result, SessionConfig, StreamEncoder, StreamSource,
};
use futures_util::{stream, Stream, StreamExt};
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;

fn int32s(values: &[i32]) -> BitVector {
    values.iter().fold(BitVector::empty(), |acc, v| {
        acc.concat(&int32().encode(v).unwrap())
    })
}

type Chunk = std::result::Result<BitVector, Infallible>;

fn ready_chunks(bits: &BitVector, size: u64) -> StreamSource<impl Stream<Item = Chunk>> {
    let chunks: Vec<Chunk> = bits.chunks(size).map(Ok).collect();
    StreamSource::new(stream::iter(chunks))
}

/// Never yields; records cancellation and drop.
struct Stalled {
    polls: Arc<AtomicUsize>,
    cancelled: Arc<AtomicBool>,
    dropped: Arc<AtomicBool>,
}

impl AsyncPull for Stalled {
    fn poll_pull(&mut self, _cx: &mut Context<'_>) -> Poll<Result<Option<BitVector>>> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Poll::Pending
    }

    fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Drop for Stalled {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn decodes_from_chunked_stream() {
    let input = int32s(&[3, -4, 5]);
    for size in [1, 7, 32, 96] {
        let values: Vec<i32> = many(int32())
            .decode_stream(ready_chunks(&input, size))
            .map(|v| v.unwrap())
            .collect()
            .await;
        assert_eq!(values, vec![3, -4, 5], "chunk size {size}");
    }
}

#[tokio::test]
async fn decodes_from_delayed_chunks() {
    let input = int32s(&[10, 20]);
    let chunks: Vec<BitVector> = input.chunks(12).collect();
    let delayed = stream::iter(chunks).then(|chunk| async move {
        tokio::time::sleep(Duration::from_millis(2)).await;
        Ok::<_, Infallible>(chunk)
    });
    let values: Vec<i32> = many(int32())
        .decode_stream(StreamSource::new(delayed))
        .map(|v| v.unwrap())
        .collect()
        .await;
    assert_eq!(values, vec![10, 20]);
}

#[tokio::test]
async fn cancellation_releases_source() {
    let polls = Arc::new(AtomicUsize::new(0));
    let cancelled = Arc::new(AtomicBool::new(false));
    let dropped = Arc::new(AtomicBool::new(false));
    let source = Stalled {
        polls: Arc::clone(&polls),
        cancelled: Arc::clone(&cancelled),
        dropped: Arc::clone(&dropped),
    };
    let token = CancellationToken::new();
    let mut decoded = many(uint8())
        .decode_stream(source)
        .with_cancellation(token.clone());

    let canceller = tokio::spawn({
        let token = token.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        }
    });

    assert!(decoded.next().await.is_none());
    canceller.await.unwrap();
    assert!(cancelled.load(Ordering::SeqCst));
    assert!(dropped.load(Ordering::SeqCst));
    assert!(!decoded.has_source());

    let polls_at_cancel = polls.load(Ordering::SeqCst);
    assert!(decoded.next().await.is_none());
    assert_eq!(polls.load(Ordering::SeqCst), polls_at_cancel);
}

#[tokio::test]
async fn dropping_stream_drops_source() {
    let dropped = Arc::new(AtomicBool::new(false));
    let source = Stalled {
        polls: Arc::new(AtomicUsize::new(0)),
        cancelled: Arc::new(AtomicBool::new(false)),
        dropped: Arc::clone(&dropped),
    };
    let decoded = once(uint8()).decode_stream(source);
    drop(decoded);
    assert!(dropped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn decodes_async_reader() {
    let data = vec![0x00, 0x01, 0x00, 0x02, 0xFF];
    let config = SessionConfig::default().with_read_chunk_size(1);
    let values: Vec<u16> = many(uint16())
        .decode_async_reader(&data[..], config)
        .map(|v| v.unwrap())
        .collect()
        .await;
    assert_eq!(values, vec![1, 2]);
}

#[tokio::test]
async fn plan_codec_drives_framed_read() {
    let data = vec![0x12, 0x34, 0x56, 0x78];
    let values: Vec<u16> = FramedRead::new(&data[..], PlanCodec::new(many(uint16())))
        .map(|v| v.unwrap())
        .collect()
        .await;
    assert_eq!(values, vec![0x1234, 0x5678]);
}

#[tokio::test]
async fn plan_codec_surfaces_partial_value_at_eof() {
    let data = vec![0x12];
    let mut frames = FramedRead::new(&data[..], PlanCodec::new(once(uint16())));
    let err = frames.next().await.unwrap().unwrap_err();
    assert!(err.is_insufficient());
}

#[tokio::test]
async fn encodes_from_stream() {
    let plan = StreamEncoder::many(uint8()).concat(StreamEncoder::emit(vec![0xEE]));
    let chunks: Vec<BitVector> = plan
        .encode_stream(stream::iter(vec![1u8, 2]))
        .map(|c| c.unwrap())
        .collect()
        .await;
    let bytes: Vec<u8> = chunks.iter().flat_map(|c| c.to_bytes().to_vec()).collect();
    assert_eq!(bytes, vec![1, 2, 0xEE]);
}

#[tokio::test]
async fn encode_stream_stops_on_cancel() {
    let token = CancellationToken::new();
    token.cancel();
    let mut chunks = StreamEncoder::many(uint8())
        .encode_stream(stream::iter(vec![1u8, 2, 3]))
        .with_cancellation(token);
    assert!(chunks.next().await.is_none());
}
