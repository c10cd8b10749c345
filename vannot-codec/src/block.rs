//! Block-level interval encoding and decoding.
//!
//! Wire layout, little-endian throughout. A block starts with a header
//! record and continues with delta-coded records until the declared
//! payload length runs out:
//!
//! - header flag byte `0xF0 | nibble`, the nibble selecting the first
//!   record's width field (0 = implicit width 1, 1 = u8, 2 = u16,
//!   3 = u32); then the width field; then the 8-byte packed virtual
//!   pointer of the first record; then the block's average offset step
//!   as i16, a negative value escaping to a following u32.
//! - record flag bytes stay below 0x80: bits 0-2 select the begin
//!   delta (0-4 literal, 5 = u8, 6 = u16, 7 = u32), bits 3-4 the width
//!   field (0 = implicit 1, 1 = u8, 2 = u16, 3 = u32), bit 5 the
//!   offset-delta sign, bit 6 the offset-delta width (0 = u8, 1 = i16
//!   with `i16::MIN` escaping to u32).

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use vannot_core::models::GenomicInterval;
use vannot_core::{Result, VannotError};

use crate::vpos;

const HEADER_FLAG_BASE: u8 = 0xf0;
const HEADER_FLAG_MASK: u8 = 0xf0;

const BEGIN_LITERAL_MAX: u32 = 4;
const BEGIN_U8: u8 = 5;
const BEGIN_U16: u8 = 6;
const BEGIN_U32: u8 = 7;

const END_SHIFT: u8 = 3;
const OFFSET_SIGN_SHIFT: u8 = 5;
const OFFSET_WIDE_SHIFT: u8 = 6;

/// Escape value in a 16-bit offset field: the magnitude follows as u32.
const OFFSET_WIDE_SENTINEL: i16 = i16::MIN;
/// Escape value in the header's 16-bit avg-offset field.
const AVG_WIDE_SENTINEL: i16 = -1;

/// One decoded database interval, returned by value.
///
/// `block_offset` locates the record's raw line within the decompressed
/// data block the decoder session is bound to;
/// [`virtual_position`](BlockRecord::virtual_position) recombines it
/// with the session's block address into a seekable pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRecord {
    pub block_offset: u32,
    pub begin: u32,
    pub end: u32,
}

impl BlockRecord {
    pub fn new(block_offset: u32, begin: u32, end: u32) -> Self {
        BlockRecord {
            block_offset,
            begin,
            end,
        }
    }

    /// Packed virtual pointer to this record's raw line in the data
    /// file.
    pub fn virtual_position(&self, block_address: u64) -> Result<u64> {
        vpos::pack(block_address, self.block_offset)
    }
}

impl GenomicInterval for BlockRecord {
    #[inline]
    fn begin(&self) -> u32 {
        self.begin
    }

    #[inline]
    fn end(&self) -> u32 {
        self.end
    }
}

/// Decoder session for one block.
///
/// Holds the running accumulators the format deltas against. State is
/// owned and explicit: a session is created by
/// [`read_header`](BlockDecoder::read_header) and advanced by
/// [`next_record`](BlockDecoder::next_record); nothing is shared
/// between sessions.
#[derive(Debug)]
pub struct BlockDecoder {
    block_address: u64,
    running_begin: u32,
    running_offset: u32,
    avg_offset: u32,
    end_width: u32,
}

impl BlockDecoder {
    /// Consume a block header and seed a session from it.
    ///
    /// `flag` is the already-read header flag byte; `min` is the
    /// chromosome's minimum coordinate from the index provider, which
    /// the header does not repeat. Returns the session together with
    /// the block's first record, which the header itself describes.
    pub fn read_header<R: Read>(rdr: &mut R, flag: u8, min: u32) -> Result<(Self, BlockRecord)> {
        if flag & HEADER_FLAG_MASK != HEADER_FLAG_BASE {
            return Err(VannotError::CorruptData(format!(
                "flag {:#04x} is not a block header",
                flag
            )));
        }
        let nibble = flag & 0x0f;
        let end_width = match nibble {
            0 => 1,
            1 => rdr.read_u8()? as u32,
            2 => rdr.read_u16::<LittleEndian>()? as u32,
            3 => rdr.read_u32::<LittleEndian>()?,
            _ => {
                return Err(VannotError::CorruptData(format!(
                    "invalid width selector {} in block header",
                    nibble
                )));
            }
        };

        let pointer = rdr.read_u64::<LittleEndian>()?;
        let block_address = vpos::block_address(pointer);
        let running_offset = vpos::block_offset(pointer);
        let avg_offset = read_wide_short(rdr)?;

        let decoder = BlockDecoder {
            block_address,
            running_begin: min,
            running_offset,
            avg_offset,
            end_width,
        };
        let first = BlockRecord::new(running_offset, min, min.checked_add(end_width).ok_or_else(
            || VannotError::CorruptData("interval end overflows coordinate space".to_string()),
        )?);
        Ok((decoder, first))
    }

    /// Decode the next record from its flag byte and payload fields.
    pub fn next_record<R: Read>(&mut self, rdr: &mut R, flag: u8) -> Result<BlockRecord> {
        if flag & 0x80 != 0 {
            return Err(VannotError::CorruptData(format!(
                "record flag {:#04x} has the reserved bit set",
                flag
            )));
        }

        let begin_sel = flag & 0x07;
        let end_sel = (flag >> END_SHIFT) & 0x03;
        let offset_sign = (flag >> OFFSET_SIGN_SHIFT) & 0x01;
        let offset_wide = (flag >> OFFSET_WIDE_SHIFT) & 0x01;

        let begin_delta = match begin_sel {
            0..=4 => begin_sel as u32,
            BEGIN_U8 => rdr.read_u8()? as u32,
            BEGIN_U16 => rdr.read_u16::<LittleEndian>()? as u32,
            _ => rdr.read_u32::<LittleEndian>()?,
        };
        self.running_begin = self.running_begin.checked_add(begin_delta).ok_or_else(|| {
            VannotError::CorruptData("interval start overflows coordinate space".to_string())
        })?;

        self.end_width = match end_sel {
            0 => 1,
            1 => rdr.read_u8()? as u32,
            2 => rdr.read_u16::<LittleEndian>()? as u32,
            _ => rdr.read_u32::<LittleEndian>()?,
        };

        let magnitude = if offset_wide == 0 {
            rdr.read_u8()? as u32
        } else {
            let short = rdr.read_i16::<LittleEndian>()?;
            if short == OFFSET_WIDE_SENTINEL {
                rdr.read_u32::<LittleEndian>()?
            } else if short < 0 {
                return Err(VannotError::CorruptData(format!(
                    "negative offset magnitude {} in record",
                    short
                )));
            } else {
                short as u32
            }
        };

        let next_offset = if offset_sign == 0 {
            self.running_offset as i64 + self.avg_offset as i64 + magnitude as i64
        } else {
            self.running_offset as i64 + self.avg_offset as i64 - magnitude as i64
        };
        if next_offset < 0 || next_offset > u32::MAX as i64 {
            return Err(VannotError::CorruptData(format!(
                "block offset {} out of range after delta",
                next_offset
            )));
        }
        self.running_offset = next_offset as u32;

        let end = self.running_begin.checked_add(self.end_width).ok_or_else(|| {
            VannotError::CorruptData("interval end overflows coordinate space".to_string())
        })?;
        Ok(BlockRecord::new(
            self.running_offset,
            self.running_begin,
            end,
        ))
    }

    /// The compressed-block address this session is bound to.
    pub fn block_address(&self) -> u64 {
        self.block_address
    }
}

fn read_wide_short<R: Read>(rdr: &mut R) -> Result<u32> {
    let short = rdr.read_i16::<LittleEndian>()?;
    if short < 0 {
        Ok(rdr.read_u32::<LittleEndian>()?)
    } else {
        Ok(short as u32)
    }
}

/// Encoder for one block; the exact inverse of [`BlockDecoder`].
///
/// Always emits the narrowest field that holds each value and escapes
/// when a magnitude collides with a sentinel, so every ascending input
/// round-trips exactly.
pub struct BlockEncoder;

impl BlockEncoder {
    /// Encode `records` as one block bound to `block_address`.
    ///
    /// Records must be non-decreasing by `begin` and by `block_offset`,
    /// with `end >= begin`; violations are rejected as corrupt input
    /// rather than silently producing an undecodable block. The first
    /// record's `begin` is not written: the index stores it as the
    /// chromosome minimum and supplies it again at decode time.
    pub fn encode<W: Write>(wtr: &mut W, block_address: u64, records: &[BlockRecord]) -> Result<()> {
        let first = records.first().ok_or_else(|| {
            VannotError::Configuration("cannot encode an empty block".to_string())
        })?;

        for rec in records {
            if rec.end < rec.begin {
                return Err(VannotError::CorruptData(format!(
                    "interval end {} precedes start {}",
                    rec.end, rec.begin
                )));
            }
        }

        let avg_offset = average_offset_step(records)?;

        // header
        let first_width = first.end - first.begin;
        let nibble: u8 = match first_width {
            1 => 0,
            w if w <= 0xff => 1,
            w if w <= 0xffff => 2,
            _ => 3,
        };
        wtr.write_u8(HEADER_FLAG_BASE | nibble)?;
        match nibble {
            0 => {}
            1 => wtr.write_u8(first_width as u8)?,
            2 => wtr.write_u16::<LittleEndian>(first_width as u16)?,
            _ => wtr.write_u32::<LittleEndian>(first_width)?,
        }
        wtr.write_u64::<LittleEndian>(vpos::pack(block_address, first.block_offset)?)?;
        if avg_offset <= i16::MAX as u32 {
            wtr.write_i16::<LittleEndian>(avg_offset as i16)?;
        } else {
            wtr.write_i16::<LittleEndian>(AVG_WIDE_SENTINEL)?;
            wtr.write_u32::<LittleEndian>(avg_offset)?;
        }

        let mut running_begin = first.begin;
        let mut running_offset = first.block_offset;

        for rec in &records[1..] {
            if rec.begin < running_begin {
                return Err(VannotError::CorruptData(format!(
                    "intervals must be sorted by start; {} precedes {}",
                    rec.begin, running_begin
                )));
            }
            if rec.block_offset < running_offset {
                return Err(VannotError::CorruptData(format!(
                    "block offsets must be non-decreasing; {} precedes {}",
                    rec.block_offset, running_offset
                )));
            }

            let begin_delta = rec.begin - running_begin;
            let width = rec.end - rec.begin;
            let step = rec.block_offset - running_offset;
            let diff = step as i64 - avg_offset as i64;
            let sign: u8 = if diff < 0 { 1 } else { 0 };
            let magnitude = diff.unsigned_abs() as u32;

            let begin_sel: u8 = match begin_delta {
                d if d <= BEGIN_LITERAL_MAX => d as u8,
                d if d <= 0xff => BEGIN_U8,
                d if d <= 0xffff => BEGIN_U16,
                _ => BEGIN_U32,
            };
            let end_sel: u8 = match width {
                1 => 0,
                w if w <= 0xff => 1,
                w if w <= 0xffff => 2,
                _ => 3,
            };
            let offset_wide: u8 = if magnitude <= 0xff { 0 } else { 1 };

            let flag = begin_sel
                | (end_sel << END_SHIFT)
                | (sign << OFFSET_SIGN_SHIFT)
                | (offset_wide << OFFSET_WIDE_SHIFT);
            wtr.write_u8(flag)?;

            match begin_sel {
                BEGIN_U8 => wtr.write_u8(begin_delta as u8)?,
                BEGIN_U16 => wtr.write_u16::<LittleEndian>(begin_delta as u16)?,
                BEGIN_U32 => wtr.write_u32::<LittleEndian>(begin_delta)?,
                _ => {}
            }
            match end_sel {
                0 => {}
                1 => wtr.write_u8(width as u8)?,
                2 => wtr.write_u16::<LittleEndian>(width as u16)?,
                _ => wtr.write_u32::<LittleEndian>(width)?,
            }
            if offset_wide == 0 {
                wtr.write_u8(magnitude as u8)?;
            } else if magnitude <= i16::MAX as u32 {
                wtr.write_i16::<LittleEndian>(magnitude as i16)?;
            } else {
                wtr.write_i16::<LittleEndian>(OFFSET_WIDE_SENTINEL)?;
                wtr.write_u32::<LittleEndian>(magnitude)?;
            }

            running_begin = rec.begin;
            running_offset = rec.block_offset;
        }

        Ok(())
    }
}

/// Mean in-block offset step, so per-record offset deltas center on
/// zero.
fn average_offset_step(records: &[BlockRecord]) -> Result<u32> {
    if records.len() < 2 {
        return Ok(0);
    }
    let first = records[0].block_offset;
    let last = records[records.len() - 1].block_offset;
    if last < first {
        return Err(VannotError::CorruptData(
            "block offsets must be non-decreasing".to_string(),
        ));
    }
    Ok((last - first) / (records.len() as u32 - 1))
}

struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

/// Iterator over the records of one block.
///
/// Reads flag bytes, dispatches header vs record decoding, and checks
/// consumption against the declared payload length: a record that runs
/// past it means the block is corrupt, while a field truncated by
/// end-of-stream surfaces as an I/O error. Ends cleanly when the limit
/// or the stream is exhausted at a record boundary.
pub struct BlockRecordIter<R: Read> {
    rdr: CountingReader<R>,
    min: u32,
    limit: Option<u64>,
    decoder: Option<BlockDecoder>,
    done: bool,
}

impl<R: Read> BlockRecordIter<R> {
    pub fn new(rdr: R, min: u32) -> Self {
        BlockRecordIter {
            rdr: CountingReader {
                inner: rdr,
                count: 0,
            },
            min,
            limit: None,
            decoder: None,
            done: false,
        }
    }

    /// Bound decoding to `limit` bytes of payload.
    pub fn with_limit(rdr: R, min: u32, limit: u64) -> Self {
        let mut iter = Self::new(rdr, min);
        iter.limit = Some(limit);
        iter
    }

    /// Address of the block being decoded; `None` before the header has
    /// been read.
    pub fn block_address(&self) -> Option<u64> {
        self.decoder.as_ref().map(|d| d.block_address())
    }

    fn next_flag(&mut self) -> Result<Option<u8>> {
        if let Some(limit) = self.limit {
            if self.rdr.count >= limit {
                return Ok(None);
            }
        }
        match self.rdr.inner.read_u8() {
            Ok(flag) => {
                self.rdr.count += 1;
                Ok(Some(flag))
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn decode_next(&mut self) -> Result<Option<BlockRecord>> {
        let flag = match self.next_flag()? {
            Some(flag) => flag,
            None => return Ok(None),
        };

        let record = match self.decoder {
            None => {
                let (decoder, first) = BlockDecoder::read_header(&mut self.rdr, flag, self.min)?;
                self.decoder = Some(decoder);
                first
            }
            Some(ref mut decoder) => {
                if flag & HEADER_FLAG_MASK == HEADER_FLAG_BASE {
                    return Err(VannotError::CorruptData(
                        "unexpected block header inside block".to_string(),
                    ));
                }
                decoder.next_record(&mut self.rdr, flag)?
            }
        };

        if let Some(limit) = self.limit {
            if self.rdr.count > limit {
                return Err(VannotError::CorruptData(format!(
                    "record overruns declared block length of {} bytes",
                    limit
                )));
            }
        }
        Ok(Some(record))
    }
}

impl<R: Read> Iterator for BlockRecordIter<R> {
    type Item = Result<BlockRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.decode_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Decode a whole in-memory block.
pub fn decode_block(data: &[u8], min: u32) -> Result<Vec<BlockRecord>> {
    BlockRecordIter::with_limit(data, min, data.len() as u64).collect()
}
