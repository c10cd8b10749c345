use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use noodles::bgzf;

use vannot_core::{Result, VannotError};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const GZIP_FLG_FEXTRA: u8 = 0x04;
// BC subfield identifier in the gzip extra field marks a BGZF member
const BGZF_SI1: u8 = b'B';
const BGZF_SI2: u8 = b'C';
const SIGNATURE_LEN: usize = 18;

/// Physical container of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    BlockGzip,
    Gzip,
    Plain,
}

impl SourceKind {
    /// Detect the container from the file's leading bytes.
    pub fn sniff(path: &Path) -> Result<SourceKind> {
        let mut file = File::open(path)?;
        let mut sig = [0u8; SIGNATURE_LEN];
        let n = read_up_to(&mut file, &mut sig)?;
        Ok(Self::from_signature(&sig[..n]))
    }

    /// Classify a signature buffer of up to 18 leading bytes.
    pub fn from_signature(sig: &[u8]) -> SourceKind {
        if sig.len() < 2 || sig[..2] != GZIP_MAGIC {
            return SourceKind::Plain;
        }
        if sig.len() >= SIGNATURE_LEN
            && sig[3] & GZIP_FLG_FEXTRA != 0
            && sig[12] == BGZF_SI1
            && sig[13] == BGZF_SI2
        {
            return SourceKind::BlockGzip;
        }
        SourceKind::Gzip
    }
}

fn read_up_to<R: Read>(rdr: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = rdr.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// A line reader over one physical source, one variant per container.
///
/// Exactly one reader is created per [`open`](RawSource::open) call;
/// dropping it releases any held block buffers.
pub enum RawSource {
    BlockGzip(bgzf::Reader<File>),
    Gzip(BufReader<MultiGzDecoder<File>>),
    Plain(BufReader<File>),
}

impl RawSource {
    /// Sniff the signature and open the matching reader.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<RawSource> {
        let path = path.as_ref();
        let kind = SourceKind::sniff(path)?;
        let file = File::open(path)?;
        Ok(match kind {
            SourceKind::BlockGzip => RawSource::BlockGzip(bgzf::Reader::new(file)),
            SourceKind::Gzip => RawSource::Gzip(BufReader::new(MultiGzDecoder::new(file))),
            SourceKind::Plain => RawSource::Plain(BufReader::new(file)),
        })
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            RawSource::BlockGzip(_) => SourceKind::BlockGzip,
            RawSource::Gzip(_) => SourceKind::Gzip,
            RawSource::Plain(_) => SourceKind::Plain,
        }
    }

    fn buf_read(&mut self) -> &mut dyn BufRead {
        match self {
            RawSource::BlockGzip(r) => r,
            RawSource::Gzip(r) => r,
            RawSource::Plain(r) => r,
        }
    }

    /// Read the next line into `buf`, stripping the trailing newline.
    /// Returns `false` at end of stream.
    pub fn next_line(&mut self, buf: &mut String) -> Result<bool> {
        buf.clear();
        let n = self.buf_read().read_line(buf)?;
        if n == 0 {
            return Ok(false);
        }
        while buf.ends_with('\n') || buf.ends_with('\r') {
            buf.pop();
        }
        Ok(true)
    }

    /// Current packed virtual position; only block-gzip sources are
    /// addressable this way.
    pub fn virtual_position(&self) -> Option<u64> {
        match self {
            RawSource::BlockGzip(r) => Some(u64::from(r.virtual_position())),
            _ => None,
        }
    }

    /// Seek to a packed virtual position in a block-gzip source.
    pub fn seek_virtual(&mut self, vpos: u64) -> Result<()> {
        match self {
            RawSource::BlockGzip(r) => {
                r.seek(bgzf::VirtualPosition::from(vpos))?;
                Ok(())
            }
            _ => Err(VannotError::Configuration(
                "virtual-position seeking requires a block-gzip source".to_string(),
            )),
        }
    }
}
