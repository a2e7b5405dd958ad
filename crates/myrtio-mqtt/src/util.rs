//! Low-level encoding helpers shared by the packet codec

use crate::error::PacketError;

/// Largest value representable by the remaining-length field
pub const MAX_REMAINING_LENGTH: usize = 268_435_455;

/// Bounded writer over a byte slice
pub(crate) struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn put_u8(&mut self, value: u8) -> Result<(), PacketError> {
        let slot = self.buf.get_mut(self.pos).ok_or(PacketError::BufferTooSmall)?;
        *slot = value;
        self.pos += 1;
        Ok(())
    }

    pub(crate) fn put_u16(&mut self, value: u16) -> Result<(), PacketError> {
        self.put_bytes(&value.to_be_bytes())
    }

    pub(crate) fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), PacketError> {
        let end = self.pos + bytes.len();
        let dst = self
            .buf
            .get_mut(self.pos..end)
            .ok_or(PacketError::BufferTooSmall)?;
        dst.copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    /// Length-prefixed UTF-8 string
    pub(crate) fn put_str(&mut self, value: &str) -> Result<(), PacketError> {
        self.put_binary(value.as_bytes())
    }

    /// Length-prefixed binary data
    pub(crate) fn put_binary(&mut self, value: &[u8]) -> Result<(), PacketError> {
        let len = u16::try_from(value.len()).map_err(|_| PacketError::FieldTooLong)?;
        self.put_u16(len)?;
        self.put_bytes(value)
    }

    pub(crate) fn put_remaining_length(&mut self, len: usize) -> Result<(), PacketError> {
        let mut encoded = [0u8; 4];
        let size = encode_remaining_length(len, &mut encoded)?;
        self.put_bytes(&encoded[..size])
    }
}

/// Cursor over a received packet body
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn u8(&mut self) -> Result<u8, PacketError> {
        let value = *self.buf.get(self.pos).ok_or(PacketError::Malformed)?;
        self.pos += 1;
        Ok(value)
    }

    pub(crate) fn u16(&mut self) -> Result<u16, PacketError> {
        let bytes = self.bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn bytes(&mut self, len: usize) -> Result<&'a [u8], PacketError> {
        let end = self.pos + len;
        let bytes = self.buf.get(self.pos..end).ok_or(PacketError::Malformed)?;
        self.pos = end;
        Ok(bytes)
    }

    pub(crate) fn str(&mut self) -> Result<&'a str, PacketError> {
        let len = usize::from(self.u16()?);
        let bytes = self.bytes(len)?;
        core::str::from_utf8(bytes).map_err(|_| PacketError::InvalidUtf8)
    }

    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let rest = &self.buf[self.pos.min(self.buf.len())..];
        self.pos = self.buf.len();
        rest
    }
}

/// Encode `len` as an MQTT variable byte integer.
///
/// Returns the number of bytes written into `out`.
pub fn encode_remaining_length(mut len: usize, out: &mut [u8; 4]) -> Result<usize, PacketError> {
    if len > MAX_REMAINING_LENGTH {
        return Err(PacketError::PayloadTooLarge);
    }
    let mut i = 0;
    loop {
        #[allow(clippy::cast_possible_truncation)]
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        out[i] = byte;
        i += 1;
        if len == 0 {
            return Ok(i);
        }
    }
}

/// Decode a variable byte integer from the start of `buf`.
///
/// Returns `(value, encoded_size)`, or `None` while more bytes are needed.
pub fn decode_remaining_length(buf: &[u8]) -> Result<Option<(usize, usize)>, PacketError> {
    let mut value = 0usize;
    let mut multiplier = 1usize;
    for (i, byte) in buf.iter().enumerate() {
        if i >= 4 {
            return Err(PacketError::Malformed);
        }
        value += usize::from(byte & 0x7F) * multiplier;
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
        multiplier *= 128;
    }
    if buf.len() >= 4 {
        return Err(PacketError::Malformed);
    }
    Ok(None)
}

/// Next packet identifier after `current`, skipping the reserved zero
pub fn next_packet_id(current: u16) -> u16 {
    match current.wrapping_add(1) {
        0 => 1,
        id => id,
    }
}
