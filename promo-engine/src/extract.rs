use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};

use flate2::read::GzDecoder;
use tempfile::NamedTempFile;

use crate::error::SourceError;

pub(crate) const PROMO_CODE_MIN_LEN: usize = 8;
pub(crate) const PROMO_CODE_MAX_LEN: usize = 10;

/// Longest line the scanner will buffer. Anything longer can never be a
/// token, so the scanner skips it without materializing it.
const MAX_LINE_BYTES: usize = 64;

const COPY_BUF_BYTES: usize = 64 * 1024;

/// Run the full blocking extract stage for one source: decompress the gzip
/// stream to a capped scratch file, then scan it for distinct candidate
/// codes. The scratch file is deleted on every exit path.
pub(crate) fn extract_distinct_tokens(
    input: File,
    max_decompressed_bytes: u64,
) -> Result<HashSet<String>, SourceError> {
    let scratch = decompress_to_scratch(input, max_decompressed_bytes)?;
    let reader = scratch.reopen().map_err(SourceError::Scratch)?;
    scan_tokens(reader)
}

/// Copy the decompressed stream to a uniquely named scratch file, never
/// writing past the cap. Reaching the cap rejects the source: a stream that
/// fills it exactly is indistinguishable from one truncated mid-token.
fn decompress_to_scratch(
    input: File,
    max_decompressed_bytes: u64,
) -> Result<NamedTempFile, SourceError> {
    let scratch = NamedTempFile::new().map_err(SourceError::Scratch)?;
    let mut writer = BufWriter::new(scratch.reopen().map_err(SourceError::Scratch)?);
    let mut decoder = GzDecoder::new(BufReader::new(input));

    let mut buffer = [0u8; COPY_BUF_BYTES];
    let mut written: u64 = 0;
    loop {
        if written >= max_decompressed_bytes {
            return Err(SourceError::DecompressBomb {
                cap_bytes: max_decompressed_bytes,
            });
        }
        let budget = (max_decompressed_bytes - written).min(buffer.len() as u64) as usize;
        let read = decoder.read(&mut buffer[..budget]).map_err(SourceError::Gzip)?;
        if read == 0 {
            break;
        }
        writer.write_all(&buffer[..read]).map_err(SourceError::Scratch)?;
        written += read as u64;
    }
    writer.flush().map_err(SourceError::Scratch)?;

    Ok(scratch)
}

/// Scan the decompressed scratch file line by line and collect the distinct
/// tokens inside the length window. Duplicates within one source collapse
/// here, so one source can bump a token's count by at most 1.
fn scan_tokens(reader: File) -> Result<HashSet<String>, SourceError> {
    let mut reader = BufReader::with_capacity(COPY_BUF_BYTES, reader);
    let mut tokens = HashSet::new();
    let mut line: Vec<u8> = Vec::with_capacity(MAX_LINE_BYTES);
    let mut overlong = false;

    loop {
        let buffer = reader.fill_buf().map_err(SourceError::Scan)?;
        if buffer.is_empty() {
            if !overlong {
                collect_candidate(&mut tokens, &line);
            }
            break;
        }

        match buffer.iter().position(|&byte| byte == b'\n') {
            Some(newline) => {
                if !overlong && line.len() + newline <= MAX_LINE_BYTES {
                    line.extend_from_slice(&buffer[..newline]);
                    collect_candidate(&mut tokens, &line);
                }
                line.clear();
                overlong = false;
                reader.consume(newline + 1);
            }
            None => {
                if !overlong && line.len() + buffer.len() <= MAX_LINE_BYTES {
                    line.extend_from_slice(buffer);
                } else {
                    overlong = true;
                    line.clear();
                }
                let consumed = buffer.len();
                reader.consume(consumed);
            }
        }
    }

    Ok(tokens)
}

/// A line is a token iff its length sits inside the window after the line
/// terminator is stripped. No other trimming, no case folding.
fn collect_candidate(tokens: &mut HashSet<String>, line: &[u8]) {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if (PROMO_CODE_MIN_LEN..=PROMO_CODE_MAX_LEN).contains(&line.len()) {
        if let Ok(token) = std::str::from_utf8(line) {
            tokens.insert(token.to_string());
        }
    }
}
