use std::borrow::Cow;
use std::ops::Deref;

use anyhow::Context;

/// Upper bound on compression pointers followed while reading a single QNAME
const MAX_QNAME_JUMPS: usize = 16;
/// RFC1035: labels are limited to 63 octets
const MAX_LABEL_LENGTH: usize = 0x3f;

pub trait FromBuf: Sized {
    fn from_buf(buf: &mut ByteBuf) -> anyhow::Result<Self>;
}

pub trait EncodeToBuf {
    fn encode_to_buf(&self, buf: &mut ByteBuf) -> anyhow::Result<()>;
}

/// A byte buffer that is read from the front and written to the back.
pub struct ByteBuf<'a> {
    buf: Cow<'a, [u8]>,
    pos: usize,
}

impl Deref for ByteBuf<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.buf.as_ref()
    }
}

impl AsRef<[u8]> for ByteBuf<'_> {
    fn as_ref(&self) -> &[u8] {
        &self.buf
    }
}

impl<'a> ByteBuf<'a> {
    pub fn new(src: &'a impl AsRef<[u8]>) -> ByteBuf<'a> {
        ByteBuf {
            buf: Cow::Borrowed(src.as_ref()),
            pos: 0,
        }
    }

    pub fn new_empty(capacity: Option<usize>) -> ByteBuf<'static> {
        ByteBuf {
            buf: Cow::Owned(Vec::with_capacity(capacity.unwrap_or(512))),
            pos: 0,
        }
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.into_owned()
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn read_u8(&mut self) -> anyhow::Result<u8> {
        self.read_bytes(1)
            .and_then(|bytes| bytes.first().copied().context("bug: should be present"))
    }

    pub fn write_u8(&mut self, data: u8) {
        self.buf.to_mut().push(data);
    }

    pub fn read_u16(&mut self) -> anyhow::Result<u16> {
        self.read_bytes(2)
            .and_then(|bytes| TryInto::<[u8; 2]>::try_into(bytes).context("bug: should be exactly two bytes in length"))
            .map(u16::from_be_bytes)
    }

    pub fn write_u16(&mut self, data: u16) {
        self.write_bytes(&data.to_be_bytes());
    }

    pub fn read_bytes(&mut self, n: usize) -> anyhow::Result<&[u8]> {
        self.ensure_length(n, None)?;
        let pos = self.pos;
        self.pos += n;
        self.buf
            .get(pos..pos + n)
            .context("bug: should be present")
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buf.to_mut().extend_from_slice(data);
    }

    /// Reads a (possibly compressed) QNAME. The result has no trailing dot, the root name is `""`.
    pub fn read_qname(&mut self) -> anyhow::Result<String> {
        let mut jumps = 0;
        let mut pos = self.pos;
        let mut labels = Vec::new();
        loop {
            self.ensure_length(1, Some(pos))
                .context("malformed packet: expected QNAME label length")?;
            let label_length = self.buf[pos];
            if label_length & 0xC0 == 0xC0 {
                // Jump directive consists of two bytes
                self.ensure_length(2, Some(pos))
                    .context("malformed packet: expected second jump ptr byte in QNAME")?;
                if jumps == MAX_QNAME_JUMPS {
                    anyhow::bail!("malformed packet: too many compression pointers in QNAME");
                }
                if jumps == 0 {
                    // Continue parsing right after the first pointer once the QNAME is read
                    self.pos = pos + 2;
                }
                jumps += 1;

                // Construct a jump offset by clearing two MSB bits and joining two bytes
                pos = (((label_length as usize) & 0x3F) << 8) | self.buf[pos + 1] as usize;
                continue;
            }

            pos += 1;
            if label_length == 0 {
                break;
            }

            let label = self.buf.get(pos..pos + label_length as usize).with_context(|| {
                format!(
                    "malformed packet: expected label of length {} at byte {}",
                    label_length, pos
                )
            })?;
            labels.push(String::from_utf8_lossy(label));
            pos += label_length as usize;
        }

        if jumps == 0 {
            self.pos = pos;
        }

        Ok(labels.join("."))
    }

    pub fn write_qname(&mut self, qname: &str) -> anyhow::Result<()> {
        for label in qname.split('.').filter(|label| !label.is_empty()) {
            if label.len() > MAX_LABEL_LENGTH {
                anyhow::bail!("label is too long ({}): {}", label.len(), label);
            }
            self.write_u8(label.len() as u8);
            self.write_bytes(label.as_bytes());
        }
        self.write_u8(0);

        Ok(())
    }

    fn ensure_length(&self, n: usize, pos: Option<usize>) -> anyhow::Result<()> {
        if self.buf.len() < pos.unwrap_or(self.pos) + n {
            anyhow::bail!("underlying buffer is too small")
        }
        Ok(())
    }
}
