use crate::error::{HotfixError, Result};

/// Little-endian reader over a borrowed byte slice.
///
/// Every successful read advances the position by exactly the number of
/// bytes consumed. A read that would run past the end fails with
/// [`HotfixError::OutOfData`] and leaves the position untouched.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(HotfixError::OutOfData {
                offset: self.pos,
                wanted: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(i8::from_le_bytes(self.read_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Read a `width`-byte little-endian integer (1..=8 bytes).
    ///
    /// Returns the raw bits widened to 64; when `signed` the value is
    /// sign-extended from its top bit so `as i64` yields the signed value.
    pub fn read_uint(&mut self, width: usize, signed: bool) -> Result<u64> {
        debug_assert!((1..=8).contains(&width));
        let bytes = self.read_bytes(width)?;
        let mut buf = [0u8; 8];
        buf[..width].copy_from_slice(bytes);
        let raw = u64::from_le_bytes(buf);
        if signed && width < 8 {
            let shift = 64 - (width as u32 * 8);
            Ok((((raw << shift) as i64) >> shift) as u64)
        } else {
            Ok(raw)
        }
    }

    /// Read a float stored in exactly `width` bytes.
    ///
    /// Returns `Ok(None)` for widths with no IEEE-754 interchange format
    /// (anything but 2, 4 or 8); nothing is consumed in that case.
    pub fn read_float(&mut self, width: usize) -> Result<Option<f64>> {
        let value = match width {
            2 => f16_to_f64(u16::from_le_bytes(self.read_array()?)),
            4 => f64::from(f32::from_le_bytes(self.read_array()?)),
            8 => f64::from_le_bytes(self.read_array()?),
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    /// Bytes up to and including the first zero byte, or everything left
    /// when there is no terminator.
    pub fn read_terminated(&mut self) -> Result<&'a [u8]> {
        let rest = &self.data[self.pos..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .map_or(rest.len(), |i| i + 1);
        self.read_bytes(len)
    }

    /// Null-terminated string with the terminator stripped.
    pub fn read_cstr(&mut self) -> Result<String> {
        let raw = self.read_terminated()?;
        let text = raw.strip_suffix(&[0]).unwrap_or(raw);
        Ok(String::from_utf8_lossy(text).into_owned())
    }
}

fn f16_to_f64(bits: u16) -> f64 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exp = i32::from((bits >> 10) & 0x1f);
    let frac = f64::from(bits & 0x03ff);
    match exp {
        0 => sign * frac * 2f64.powi(-24),
        0x1f if frac == 0.0 => sign * f64::INFINITY,
        0x1f => f64::NAN,
        _ => sign * (1.0 + frac / 1024.0) * 2f64.powi(exp - 15),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_integers() {
        let data = [0x01, 0x02, 0x03, 0x04, 0xff, 0xff];
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_u32().unwrap(), 0x0403_0201);
        assert_eq!(c.read_i16().unwrap(), -1);
        assert!(c.is_empty());
    }

    #[test]
    fn short_read_leaves_position() {
        let data = [0u8; 3];
        let mut c = ByteCursor::new(&data);
        c.read_u8().unwrap();
        let err = c.read_u32().unwrap_err();
        assert!(matches!(
            err,
            HotfixError::OutOfData {
                offset: 1,
                wanted: 4,
                remaining: 2
            }
        ));
        assert_eq!(c.position(), 1);
    }

    #[test]
    fn zero_length_read_does_not_advance() {
        let mut c = ByteCursor::new(&[]);
        assert!(c.read_bytes(0).unwrap().is_empty());
        assert_eq!(c.position(), 0);
        assert_eq!(c.read_cstr().unwrap(), "");
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn cstr_consumes_terminator_only() {
        let data = [0x41, 0x42, 0x00, 0xff];
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_cstr().unwrap(), "AB");
        assert_eq!(c.position(), 3);
        assert_eq!(c.read_u8().unwrap(), 0xff);
    }

    #[test]
    fn cstr_without_terminator_takes_rest() {
        let mut c = ByteCursor::new(b"abc");
        assert_eq!(c.read_cstr().unwrap(), "abc");
        assert!(c.is_empty());
    }

    #[test]
    fn odd_width_integers_sign_extend() {
        let data = [0xff, 0xff, 0xff];
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_uint(3, true).unwrap() as i64, -1);
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_uint(3, false).unwrap(), 0x00ff_ffff);
    }

    #[test]
    fn floats_follow_declared_width() {
        let mut data = Vec::new();
        data.extend_from_slice(&1.5f32.to_le_bytes());
        data.extend_from_slice(&(-2.25f64).to_le_bytes());
        data.extend_from_slice(&0x3c00u16.to_le_bytes());
        let mut c = ByteCursor::new(&data);
        assert_eq!(c.read_float(4).unwrap(), Some(1.5));
        assert_eq!(c.read_float(8).unwrap(), Some(-2.25));
        assert_eq!(c.read_float(2).unwrap(), Some(1.0));
        assert_eq!(c.read_float(3).unwrap(), None);
        assert!(c.is_empty());
    }
}
