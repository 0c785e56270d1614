//! Builders for chunked transfer-encoded bodies.

/// Encode `data` as a chunked body whose chunk sizes cycle through `sizes`.
///
/// Zero sizes are skipped; an empty `sizes` produces a single chunk. The
/// body ends with the terminal `0` chunk and no trailers.
///
/// ```
/// use as2relay_testing::encode_chunked;
///
/// assert_eq!(encode_chunked(b"abcde", &[2]), b"2\r\nab\r\n2\r\ncd\r\n1\r\ne\r\n0\r\n");
/// ```
pub fn encode_chunked(data: &[u8], sizes: &[usize]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 16);
    let mut sizes = sizes.iter().copied().filter(|&n| n > 0).cycle();
    let mut rest = data;
    while !rest.is_empty() {
        let n = sizes.next().unwrap_or(rest.len()).min(rest.len());
        let (chunk, tail) = rest.split_at(n);
        out.extend_from_slice(format!("{n:x}\r\n").as_bytes());
        out.extend_from_slice(chunk);
        out.extend_from_slice(b"\r\n");
        rest = tail;
    }
    out.extend_from_slice(b"0\r\n");
    out
}

/// Sizes of the chunks [`encode_chunked`] produces for `len` bytes.
///
/// ```
/// use as2relay_testing::chunk_sizes;
///
/// assert_eq!(chunk_sizes(5, &[2]), [2, 2, 1]);
/// ```
pub fn chunk_sizes(len: usize, sizes: &[usize]) -> Vec<usize> {
    let mut out = Vec::new();
    let mut sizes = sizes.iter().copied().filter(|&n| n > 0).cycle();
    let mut rest = len;
    while rest > 0 {
        let n = sizes.next().unwrap_or(rest).min(rest);
        out.push(n);
        rest -= n;
    }
    out
}
