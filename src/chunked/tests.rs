//! Tests for the chunk-size parser, the codec and the reader.

use std::io;

use as2relay_testing::encode_chunked;
use bytes::BytesMut;
use futures::TryStreamExt;
use proptest::prelude::*;
use rstest::rstest;
use tokio::io::{AsyncReadExt, BufReader};
use tokio_util::codec::FramedRead;

use super::*;

async fn read_all(input: &[u8]) -> io::Result<Vec<u8>> {
    let mut body = Vec::new();
    ChunkedReader::new(input).read_to_end(&mut body).await?;
    Ok(body)
}

fn chunked_error(err: &io::Error) -> &ChunkedError {
    ChunkedError::from_io(err).expect("chunked error inside io::Error")
}

#[rstest]
#[case::extension(b"1A;name=value\r\n", 26)]
#[case::bare_lf(b"1f\n", 31)]
#[case::empty_line(b"\n", 0)]
#[case::no_digits(b"zz\r\n", 0)]
#[case::digits_then_junk(b"10 junk\r\n", 16)]
#[tokio::test]
async fn size_lines_parse(#[case] input: &[u8], #[case] expected: usize) {
    let mut reader = input;
    assert_eq!(read_chunk_len(&mut reader).await.expect("size"), expected);
    assert!(reader.is_empty(), "terminator consumed");
}

#[rstest]
#[case::no_terminator(&b"1"[..])]
#[case::empty(&b""[..])]
#[case::cr_only(&b"1\r"[..])]
#[tokio::test]
async fn truncated_size_line_is_eof(#[case] input: &[u8]) {
    let mut reader = input;
    let err = read_chunk_len(&mut reader).await.expect_err("truncated");
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

#[rstest]
#[tokio::test]
async fn carriage_return_requires_line_feed() {
    let mut reader = &b"1\rx"[..];
    let err = read_chunk_len(&mut reader).await.expect_err("malformed");
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    assert_eq!(
        chunked_error(&err),
        &ChunkedError::BareCarriageReturn { found: b'x' }
    );
}

#[rstest]
fn oversized_chunk_length_is_rejected() {
    let digits = "f".repeat(usize::BITS as usize / 4 + 1);
    assert!(matches!(
        parse_chunk_len(digits.as_bytes()),
        Err(ChunkedError::SizeOverflow { .. })
    ));
    let max = "f".repeat(usize::BITS as usize / 4);
    assert_eq!(parse_chunk_len(max.as_bytes()), Ok(usize::MAX));
}

#[rstest]
#[tokio::test]
async fn reader_returns_body_then_end_of_stream() {
    let mut reader = ChunkedReader::new(&b"3\n123\r\n0\r\n"[..]);
    let mut buf = [0_u8; 16];
    let n = reader.read(&mut buf).await.expect("data");
    assert_eq!(&buf[..n], b"123");
    assert_eq!(reader.read(&mut buf).await.expect("end"), 0);
    assert_eq!(reader.read(&mut buf).await.expect("still end"), 0);
    assert!(reader.is_done());
}

#[rstest]
#[tokio::test]
async fn empty_stream_fails_on_first_read() {
    let err = read_all(b"").await.expect_err("no terminal chunk");
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

#[rstest]
#[case::inside_data(&b"5\r\nab"[..], ChunkEof::Data { remaining: 3 })]
#[case::before_terminator(&b"2\r\nab"[..], ChunkEof::Terminator)]
#[case::before_last_chunk(&b"2\r\nab\r\n"[..], ChunkEof::SizeLine)]
#[tokio::test]
async fn truncation_reports_where_it_happened(#[case] input: &[u8], #[case] eof: ChunkEof) {
    let err = read_all(input).await.expect_err("truncated");
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    assert_eq!(chunked_error(&err), &ChunkedError::Eof(eof));
}

#[rstest]
#[tokio::test]
async fn failed_reader_stays_failed() {
    let mut reader = ChunkedReader::new(&b"2\r\nabX"[..]);
    let mut body = Vec::new();
    let first = reader.read_to_end(&mut body).await.expect_err("bad terminator");
    assert_eq!(first.kind(), io::ErrorKind::InvalidData);
    assert_eq!(
        chunked_error(&first),
        &ChunkedError::MissingDataTerminator { found: b'X' }
    );
    let mut buf = [0_u8; 4];
    let again = reader.read(&mut buf).await.expect_err("still failed");
    assert_eq!(again.kind(), io::ErrorKind::InvalidData);
}

#[rstest]
#[tokio::test]
async fn trailers_are_left_unread() {
    let mut reader = ChunkedReader::new(&b"1\r\nx\r\n0\r\nExpires: never\r\n\r\n"[..]);
    let mut body = Vec::new();
    reader.read_to_end(&mut body).await.expect("body");
    assert_eq!(body, b"x");
    assert_eq!(reader.into_inner(), b"Expires: never\r\n\r\n");
}

#[rstest]
#[tokio::test]
async fn extensions_and_bare_line_feeds_mix() {
    let body = read_all(b"4;a=b\nWiki\n5\r\npedia\r\n0;last\n")
        .await
        .expect("body");
    assert_eq!(body, b"Wikipedia");
}

#[rstest]
#[tokio::test]
async fn decoder_yields_pieces_then_stops() {
    let input = encode_chunked(b"hello world", &[4]);
    let frames: Vec<_> = FramedRead::new(&input[..], ChunkDecoder::new())
        .try_collect()
        .await
        .expect("decoded");
    let body: Vec<u8> = frames.concat();
    assert_eq!(body, b"hello world");
}

#[rstest]
fn decoder_waits_for_more_input() {
    let mut decoder = ChunkDecoder::new();
    let mut buf = BytesMut::from(&b"a\r\n01234"[..]);
    assert_eq!(
        decoder.decode(&mut buf).expect("partial").as_deref(),
        Some(&b"01234"[..])
    );
    assert_eq!(decoder.decode(&mut buf).expect("needs more"), None);
    buf.extend_from_slice(b"56789\r\n0\r\n");
    assert_eq!(
        decoder.decode(&mut buf).expect("rest").as_deref(),
        Some(&b"56789"[..])
    );
    assert_eq!(decoder.decode(&mut buf).expect("end"), None);
    assert!(decoder.is_done());
}

#[rstest]
fn decoder_reports_truncation_at_eof() {
    let mut decoder = ChunkDecoder::new();
    let mut buf = BytesMut::from(&b"3\r\nab"[..]);
    assert!(decoder.decode(&mut buf).expect("partial").is_some());
    let err = decoder.decode_eof(&mut buf).expect_err("truncated");
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    let again = decoder.decode(&mut buf).expect_err("sticky");
    assert_eq!(again.kind(), io::ErrorKind::UnexpectedEof);
}

proptest! {
    #[test]
    fn round_trip_for_any_split(
        data in proptest::collection::vec(any::<u8>(), 0..2048),
        sizes in proptest::collection::vec(1_usize..300, 1..8),
        capacity in 1_usize..64,
        read_size in 1_usize..97,
    ) {
        let encoded = encode_chunked(&data, &sizes);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        let decoded = runtime.block_on(async {
            let mut reader = ChunkedReader::new(BufReader::with_capacity(capacity, &encoded[..]));
            let mut out = Vec::new();
            let mut buf = vec![0_u8; read_size];
            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                out.extend_from_slice(&buf[..n]);
            }
            io::Result::Ok(out)
        });
        prop_assert_eq!(decoded.expect("decodes"), data);
    }
}
