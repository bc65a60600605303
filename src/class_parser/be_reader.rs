use crate::class_parser::{ParseError, ParseErrorType};

/// Forward-only reader over a class file buffer. Every read is bounds checked and
/// multi-byte values are big-endian.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ByteCursor { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        if self.remaining() < n {
            return Err(ParseError::new(
                ParseErrorType::UnexpectedEndOfData,
                format!("needed {} bytes, {} left", n, self.remaining()),
            )
            .at(self.pos));
        }

        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;

        Ok(slice)
    }

    pub fn read_u1(&mut self) -> Result<u8, ParseError> {
        u8::read(self)
    }

    pub fn read_u2(&mut self) -> Result<u16, ParseError> {
        u16::read(self)
    }

    pub fn read_u4(&mut self) -> Result<u32, ParseError> {
        u32::read(self)
    }
}

pub trait BEReader<const N: usize>: Sized {
    fn from_byte_array(buf: [u8; N]) -> Self;

    fn read(cursor: &mut ByteCursor) -> Result<Self, ParseError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(cursor.read_bytes(N)?);

        Ok(Self::from_byte_array(buf))
    }
}

// We can't abstract over from_be_bytes, because no specific trait implements it, so we have to resort to macros
macro_rules! be_reader {
    ($t: ty, $n: expr) => {
        impl BEReader<$n> for $t {
            fn from_byte_array(buf: [u8; $n]) -> Self {
                <$t>::from_be_bytes(buf)
            }
        }
    }
}

be_reader!(u8, 1);
be_reader!(u16, 2);
be_reader!(u32, 4);
be_reader!(u64, 8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian() {
        let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34, 0x07];
        let mut cursor = ByteCursor::new(&data);

        assert_eq!(cursor.read_u4().unwrap(), 0xCAFEBABE);
        assert_eq!(cursor.read_u2().unwrap(), 0x34);
        assert_eq!(cursor.read_u1().unwrap(), 7);
        assert!(cursor.is_empty());
    }

    #[test]
    fn short_read_fails_without_advancing() {
        let data = [0x01, 0x02, 0x03];
        let mut cursor = ByteCursor::new(&data);
        cursor.read_u1().unwrap();

        let err = cursor.read_u4().unwrap_err();
        assert_eq!(err.kind, ParseErrorType::UnexpectedEndOfData);
        assert_eq!(err.offset, Some(1));
        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.read_bytes(2).unwrap(), &[0x02, 0x03]);
    }
}
