use crate::error::{Error, Result};
use crate::ident::ModIdent;
use crate::version::Version;

/// Reader for the game's binary settings and save-header format: little-endian
/// fixed-width fields plus "optimized" variable-width integers. One cursor is
/// exclusively owned by the call that created it.
pub struct DatReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> DatReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(Error::TruncatedInput)?;
        if end > self.buf.len() {
            return Err(Error::TruncatedInput);
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::InvalidBool(other)),
        }
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(raw))
    }

    /// One byte below 255; otherwise a 0xFF sentinel followed by a full u16.
    pub fn read_u16_optimized(&mut self) -> Result<u16> {
        let first = self.read_u8()?;
        if first < 0xFF {
            Ok(u16::from(first))
        } else {
            self.read_u16()
        }
    }

    /// One byte below 255; otherwise a 0xFF sentinel followed by a full u32.
    pub fn read_u32_optimized(&mut self) -> Result<u32> {
        let first = self.read_u8()?;
        if first < 0xFF {
            Ok(u32::from(first))
        } else {
            self.read_u32()
        }
    }

    /// A u32-optimized length prefix followed by that many raw bytes. The
    /// bytes are not guaranteed to be UTF-8; invalid sequences are replaced.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32_optimized()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// One empty-flag bool, then a string when the flag is unset.
    pub fn read_optional_string(&mut self) -> Result<Option<String>> {
        if self.read_bool()? {
            Ok(None)
        } else {
            self.read_string().map(Some)
        }
    }

    /// Three (or four, with build) u16-optimized components.
    pub fn read_version_optimized(&mut self, with_build: bool) -> Result<Version> {
        let major = self.read_u16_optimized()?;
        let minor = self.read_u16_optimized()?;
        let patch = self.read_u16_optimized()?;
        let build = if with_build {
            self.read_u16_optimized()?
        } else {
            0
        };
        Ok(Version::new(major, minor, patch, build))
    }

    /// Four raw u16 fields; used for the top-level map version only.
    pub fn read_version_unoptimized(&mut self) -> Result<Version> {
        Ok(Version::new(
            self.read_u16()?,
            self.read_u16()?,
            self.read_u16()?,
            self.read_u16()?,
        ))
    }

    /// A save-header mod record: name, 3-component optimized version, and a
    /// CRC which is consumed to keep the cursor aligned but not returned.
    pub fn read_mod_with_crc(&mut self) -> Result<ModIdent> {
        let name = self.read_string()?;
        let version = self.read_version_optimized(false)?;
        self.read_u32()?; // CRC
        Ok(ModIdent::new(name, Some(version)))
    }
}

/// Writer counterpart to [`DatReader`]. Writes into an owned buffer and never
/// fails; the caller takes the bytes at the end.
#[derive(Default)]
pub struct DatWriter {
    buf: Vec<u8>,
}

impl DatWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u16_optimized(&mut self, value: u16) {
        if value < 0xFF {
            self.write_u8(value as u8);
        } else {
            self.write_u8(0xFF);
            self.write_u16(value);
        }
    }

    pub fn write_u32_optimized(&mut self, value: u32) {
        if value < 0xFF {
            self.write_u8(value as u8);
        } else {
            self.write_u8(0xFF);
            self.write_u32(value);
        }
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_u32_optimized(value.len() as u32);
        self.buf.extend_from_slice(value.as_bytes());
    }

    pub fn write_optional_string(&mut self, value: Option<&str>) {
        match value {
            Some(value) => {
                self.write_bool(false);
                self.write_string(value);
            }
            None => self.write_bool(true),
        }
    }

    pub fn write_version_optimized(&mut self, version: &Version, with_build: bool) {
        let components = version.components();
        let count = if with_build { 4 } else { 3 };
        for component in &components[..count] {
            self.write_u16_optimized(*component);
        }
    }

    pub fn write_version_unoptimized(&mut self, version: &Version) {
        for component in version.components() {
            self.write_u16(component);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn optimized_integers_round_trip() {
        for value in [0u32, 1, 200, 254, 255, 256, 65535, 65536, 4_000_000] {
            let mut w = DatWriter::new();
            w.write_u32_optimized(value);
            let bytes = w.into_bytes();
            let expected_len = if value < 255 { 1 } else { 5 };
            assert_eq!(bytes.len(), expected_len, "width of {value}");
            let mut r = DatReader::new(&bytes);
            assert_eq!(r.read_u32_optimized().unwrap(), value);
        }
        for value in [0u16, 254, 255, 256, 65535] {
            let mut w = DatWriter::new();
            w.write_u16_optimized(value);
            let bytes = w.into_bytes();
            let expected_len = if value < 255 { 1 } else { 3 };
            assert_eq!(bytes.len(), expected_len, "width of {value}");
            let mut r = DatReader::new(&bytes);
            assert_eq!(r.read_u16_optimized().unwrap(), value);
        }
    }

    #[test]
    fn strings_round_trip() {
        let mut w = DatWriter::new();
        w.write_string("space-exploration");
        w.write_optional_string(None);
        w.write_optional_string(Some("flib"));
        let bytes = w.into_bytes();

        let mut r = DatReader::new(&bytes);
        assert_eq!(r.read_string().unwrap(), "space-exploration");
        assert_eq!(r.read_optional_string().unwrap(), None);
        assert_eq!(r.read_optional_string().unwrap(), Some("flib".to_string()));
    }

    #[test]
    fn versions_round_trip() {
        let version: Version = "1.1.87.3".parse().unwrap();

        let mut w = DatWriter::new();
        w.write_version_unoptimized(&version);
        w.write_version_optimized(&version, true);
        w.write_version_optimized(&version, false);
        let bytes = w.into_bytes();

        let mut r = DatReader::new(&bytes);
        assert_eq!(r.read_version_unoptimized().unwrap(), version);
        assert_eq!(r.read_version_optimized(true).unwrap(), version);
        assert_eq!(
            r.read_version_optimized(false).unwrap(),
            "1.1.87".parse().unwrap()
        );
    }

    #[test]
    fn mod_with_crc_consumes_crc() {
        let mut w = DatWriter::new();
        w.write_string("flib");
        w.write_version_optimized(&"0.12.9".parse().unwrap(), false);
        w.write_u32(0xDEAD_BEEF);
        w.write_u8(7); // trailing data the CRC read must not eat
        let bytes = w.into_bytes();

        let mut r = DatReader::new(&bytes);
        let ident = r.read_mod_with_crc().unwrap();
        assert_eq!(ident.to_string(), "flib 0.12.9");
        assert_eq!(r.read_u8().unwrap(), 7);
    }

    #[test]
    fn truncated_input_is_an_error() {
        let mut r = DatReader::new(&[0x05, b'a', b'b']);
        assert!(matches!(r.read_string(), Err(Error::TruncatedInput)));

        let mut r = DatReader::new(&[0xFF, 0x01]);
        assert!(matches!(r.read_u32_optimized(), Err(Error::TruncatedInput)));

        let mut r = DatReader::new(&[]);
        assert!(matches!(r.read_u8(), Err(Error::TruncatedInput)));
    }
}
