//! EXIF tag parsing over the TIFF structure.
//!
//! Walks IFD0 and the IFD1 thumbnail directory, following the Exif, GPS
//! and Interoperability sub-IFD pointers. Every offset is bounds-checked
//! and each directory is visited at most once.

use crate::error::ParseError;
use crate::segment::EXIF_IDENTIFIER;
use crate::tags::tag_name;
use serde::{Serialize, Serializer};
use std::collections::{HashSet, VecDeque};
use std::fmt;

const EXIF_IFD_POINTER: u16 = 0x8769;
const GPS_IFD_POINTER: u16 = 0x8825;
const INTEROP_IFD_POINTER: u16 = 0xA005;

/// Size of one IFD entry.
const ENTRY_LEN: usize = 12;

/// Image file directory a tag was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Ifd {
    /// IFD0, the main image
    Primary,
    /// IFD1, the embedded thumbnail
    Thumbnail,
    /// Exif sub-IFD
    Exif,
    /// GPS sub-IFD
    Gps,
    /// Interoperability sub-IFD
    Interop,
}

impl Ifd {
    /// Short display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Ifd::Primary => "IFD0",
            Ifd::Thumbnail => "IFD1",
            Ifd::Exif => "Exif",
            Ifd::Gps => "GPS",
            Ifd::Interop => "Interop",
        }
    }
}

impl fmt::Display for Ifd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Little,
    Big,
}

/// Decoded value of an IFD entry.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// BYTE
    Byte(Vec<u8>),
    /// ASCII, without trailing NULs
    Ascii(String),
    /// SHORT
    Short(Vec<u16>),
    /// LONG
    Long(Vec<u32>),
    /// RATIONAL as numerator/denominator
    Rational(Vec<(u32, u32)>),
    /// SBYTE
    SByte(Vec<i8>),
    /// UNDEFINED
    Undefined(Vec<u8>),
    /// SSHORT
    SShort(Vec<i16>),
    /// SLONG
    SLong(Vec<i32>),
    /// SRATIONAL as numerator/denominator
    SRational(Vec<(i32, i32)>),
    /// FLOAT
    Float(Vec<f32>),
    /// DOUBLE
    Double(Vec<f64>),
}

impl TagValue {
    /// First value as an offset, for SHORT and LONG entries.
    pub fn as_offset(&self) -> Option<u32> {
        match self {
            TagValue::Short(v) => v.first().map(|&x| u32::from(x)),
            TagValue::Long(v) => v.first().copied(),
            _ => None,
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Ascii(s) => f.write_str(s),
            TagValue::Byte(b) | TagValue::Undefined(b) => write_bytes(f, b),
            TagValue::Short(v) => write_list(f, v),
            TagValue::Long(v) => write_list(f, v),
            TagValue::SByte(v) => write_list(f, v),
            TagValue::SShort(v) => write_list(f, v),
            TagValue::SLong(v) => write_list(f, v),
            TagValue::Float(v) => write_list(f, v),
            TagValue::Double(v) => write_list(f, v),
            TagValue::Rational(v) => {
                let parts: Vec<_> = v.iter().map(|(n, d)| format!("{}/{}", n, d)).collect();
                write_list(f, &parts)
            }
            TagValue::SRational(v) => {
                let parts: Vec<_> = v.iter().map(|(n, d)| format!("{}/{}", n, d)).collect();
                write_list(f, &parts)
            }
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_bytes(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    if !bytes.is_empty() && bytes.iter().all(|b| (0x20..0x7F).contains(b)) {
        return f.write_str(&String::from_utf8_lossy(bytes));
    }
    if bytes.len() > 16 {
        return write!(f, "<{} bytes>", bytes.len());
    }
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{:02x}", b)?;
    }
    Ok(())
}

/// One parsed EXIF entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExifTag {
    /// Directory the entry came from
    pub ifd: Ifd,
    /// Numeric tag id
    pub id: u16,
    /// Well-known name or `Tag_0x%04x`
    pub name: String,
    /// Decoded value
    #[serde(serialize_with = "serialize_display")]
    pub value: TagValue,
}

fn serialize_display<S: Serializer>(value: &TagValue, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn is_tiff_header(data: &[u8]) -> bool {
    data.len() >= 8 && (data.starts_with(b"II*\0") || data.starts_with(b"MM\0*"))
}

/// Locate the TIFF header inside a raw EXIF block.
///
/// Accepts a JPEG-style `Exif\0\0` prefix, the HEIF layout (a big-endian
/// offset to the header in the first four bytes), a bare header, or as a
/// last resort the first `II*\0` / `MM\0*` anywhere in the block.
pub fn find_tiff_header(data: &[u8]) -> Option<&[u8]> {
    if let Some(rest) = data.strip_prefix(EXIF_IDENTIFIER.as_slice()) {
        if is_tiff_header(rest) {
            return Some(rest);
        }
    }
    if is_tiff_header(data) {
        return Some(data);
    }
    if data.len() >= 4 {
        let offset = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if let Some(rest) = offset.checked_add(4).and_then(|start| data.get(start..)) {
            if is_tiff_header(rest) {
                return Some(rest);
            }
        }
    }
    (0..data.len().saturating_sub(7))
        .find(|&i| is_tiff_header(&data[i..]))
        .map(|i| &data[i..])
}

struct Reader<'a> {
    data: &'a [u8],
    order: ByteOrder,
}

impl<'a> Reader<'a> {
    fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], ParseError> {
        offset
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .map(|end| &self.data[offset..end])
            .ok_or_else(|| {
                ParseError::InvalidExif(format!(
                    "{} bytes at offset {} exceed the {}-byte block",
                    len,
                    offset,
                    self.data.len()
                ))
            })
    }

    fn u16(&self, offset: usize) -> Result<u16, ParseError> {
        let b = self.bytes(offset, 2)?;
        Ok(self.u16_from([b[0], b[1]]))
    }

    fn u32(&self, offset: usize) -> Result<u32, ParseError> {
        let b = self.bytes(offset, 4)?;
        Ok(self.u32_from([b[0], b[1], b[2], b[3]]))
    }

    fn u16_from(&self, b: [u8; 2]) -> u16 {
        match self.order {
            ByteOrder::Little => u16::from_le_bytes(b),
            ByteOrder::Big => u16::from_be_bytes(b),
        }
    }

    fn u32_from(&self, b: [u8; 4]) -> u32 {
        match self.order {
            ByteOrder::Little => u32::from_le_bytes(b),
            ByteOrder::Big => u32::from_be_bytes(b),
        }
    }

    fn u64_from(&self, b: [u8; 8]) -> u64 {
        match self.order {
            ByteOrder::Little => u64::from_le_bytes(b),
            ByteOrder::Big => u64::from_be_bytes(b),
        }
    }

    fn decode(&self, field_type: u16, raw: &[u8]) -> TagValue {
        let u16s = || raw.chunks_exact(2).map(move |c| self.u16_from([c[0], c[1]]));
        let u32s = || {
            raw.chunks_exact(4)
                .map(move |c| self.u32_from([c[0], c[1], c[2], c[3]]))
        };
        let pairs = || {
            raw.chunks_exact(8).map(move |c| {
                (
                    self.u32_from([c[0], c[1], c[2], c[3]]),
                    self.u32_from([c[4], c[5], c[6], c[7]]),
                )
            })
        };

        match field_type {
            1 => TagValue::Byte(raw.to_vec()),
            2 => {
                let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                TagValue::Ascii(String::from_utf8_lossy(&raw[..end]).into_owned())
            }
            3 => TagValue::Short(u16s().collect()),
            4 => TagValue::Long(u32s().collect()),
            5 => TagValue::Rational(pairs().collect()),
            6 => TagValue::SByte(raw.iter().map(|&b| b as i8).collect()),
            8 => TagValue::SShort(u16s().map(|v| v as i16).collect()),
            9 => TagValue::SLong(u32s().map(|v| v as i32).collect()),
            10 => TagValue::SRational(pairs().map(|(n, d)| (n as i32, d as i32)).collect()),
            11 => TagValue::Float(u32s().map(f32::from_bits).collect()),
            12 => TagValue::Double(
                raw.chunks_exact(8)
                    .map(|c| f64::from_bits(self.u64_from([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])))
                    .collect(),
            ),
            _ => TagValue::Undefined(raw.to_vec()),
        }
    }
}

fn type_size(field_type: u16) -> Option<usize> {
    match field_type {
        1 | 2 | 6 | 7 => Some(1),
        3 | 8 => Some(2),
        4 | 9 | 11 => Some(4),
        5 | 10 | 12 => Some(8),
        _ => None,
    }
}

/// Parse every tag of a raw EXIF block.
pub fn parse_exif(data: &[u8]) -> Result<Vec<ExifTag>, ParseError> {
    let tiff = find_tiff_header(data)
        .ok_or_else(|| ParseError::InvalidExif("no TIFF header found".to_string()))?;
    let order = if tiff.starts_with(b"II") {
        ByteOrder::Little
    } else {
        ByteOrder::Big
    };
    let reader = Reader { data: tiff, order };

    let mut tags = Vec::new();
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from([(Ifd::Primary, reader.u32(4)? as usize)]);

    while let Some((ifd, offset)) = queue.pop_front() {
        if !visited.insert(offset) {
            return Err(ParseError::InvalidExif(format!(
                "IFD at offset {} is referenced twice",
                offset
            )));
        }

        let count = usize::from(reader.u16(offset)?);
        for i in 0..count {
            let entry = offset + 2 + i * ENTRY_LEN;
            let id = reader.u16(entry)?;
            let field_type = reader.u16(entry + 2)?;
            let n = reader.u32(entry + 4)? as usize;

            let size = type_size(field_type).ok_or_else(|| {
                ParseError::InvalidExif(format!(
                    "unknown field type {} for tag 0x{:04x}",
                    field_type, id
                ))
            })?;
            let len = size.checked_mul(n).ok_or_else(|| {
                ParseError::InvalidExif(format!("value count {} for tag 0x{:04x} overflows", n, id))
            })?;
            let value_offset = if len <= 4 {
                entry + 8
            } else {
                reader.u32(entry + 8)? as usize
            };
            let value = reader.decode(field_type, reader.bytes(value_offset, len)?);

            let sub_ifd = match (ifd, id) {
                (Ifd::Primary, EXIF_IFD_POINTER) => Some(Ifd::Exif),
                (Ifd::Primary, GPS_IFD_POINTER) => Some(Ifd::Gps),
                (Ifd::Exif, INTEROP_IFD_POINTER) => Some(Ifd::Interop),
                _ => None,
            };
            if let Some(sub_ifd) = sub_ifd {
                match value.as_offset() {
                    Some(0) => {}
                    Some(target) => queue.push_back((sub_ifd, target as usize)),
                    None => {
                        return Err(ParseError::InvalidExif(format!(
                            "{} pointer has a non-integer value",
                            sub_ifd
                        )))
                    }
                }
            }

            tags.push(ExifTag {
                ifd,
                id,
                name: tag_name(ifd, id),
                value,
            });
        }

        if ifd == Ifd::Primary {
            let next = reader.u32(offset + 2 + count * ENTRY_LEN)? as usize;
            if next != 0 {
                queue.push_back((Ifd::Thumbnail, next));
            }
        }
    }

    Ok(tags)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn entry(out: &mut Vec<u8>, id: u16, field_type: u16, count: u32, value: [u8; 4]) {
        out.extend_from_slice(&id.to_be_bytes());
        out.extend_from_slice(&field_type.to_be_bytes());
        out.extend_from_slice(&count.to_be_bytes());
        out.extend_from_slice(&value);
    }

    /// Big-endian TIFF with Make, Orientation and an Exif sub-IFD holding
    /// ExposureTime and ExifVersion.
    pub(crate) fn sample_tiff() -> Vec<u8> {
        let mut out = b"MM\0*".to_vec();
        out.extend_from_slice(&8u32.to_be_bytes());

        // IFD0 at 8, data from 50
        out.extend_from_slice(&3u16.to_be_bytes());
        entry(&mut out, 0x010F, 2, 6, 50u32.to_be_bytes());
        entry(&mut out, 0x0112, 3, 1, [0, 1, 0, 0]);
        entry(&mut out, EXIF_IFD_POINTER, 4, 1, 56u32.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(b"Canon\0");

        // Exif IFD at 56, data from 86
        out.extend_from_slice(&2u16.to_be_bytes());
        entry(&mut out, 0x829A, 5, 1, 86u32.to_be_bytes());
        entry(&mut out, 0x9000, 7, 4, *b"0232");
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&1u32.to_be_bytes());
        out.extend_from_slice(&125u32.to_be_bytes());

        assert_eq!(out.len(), 94);
        out
    }

    #[test]
    fn test_parse_sample() {
        let tags = parse_exif(&sample_tiff()).unwrap();
        let names: Vec<_> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Make", "Orientation", "ExifTag", "ExposureTime", "ExifVersion"]
        );

        let shown: Vec<_> = tags.iter().map(|t| t.value.to_string()).collect();
        assert_eq!(shown, vec!["Canon", "1", "56", "1/125", "0232"]);
        assert_eq!(tags[3].ifd, Ifd::Exif);
    }

    #[test]
    fn test_parse_little_endian_with_thumbnail() {
        let mut out = b"II*\0".to_vec();
        out.extend_from_slice(&8u32.to_le_bytes());
        // IFD0: one SHORT, next IFD at 26
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&0x0128u16.to_le_bytes());
        out.extend_from_slice(&3u16.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&[2, 0, 0, 0]);
        out.extend_from_slice(&26u32.to_le_bytes());
        // IFD1: one LONG
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&0x0202u16.to_le_bytes());
        out.extend_from_slice(&4u16.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&4096u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());

        let tags = parse_exif(&out).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "ResolutionUnit");
        assert_eq!(tags[0].value, TagValue::Short(vec![2]));
        assert_eq!(tags[1].ifd, Ifd::Thumbnail);
        assert_eq!(tags[1].value, TagValue::Long(vec![4096]));
    }

    #[test]
    fn test_find_tiff_header_layouts() {
        let tiff = sample_tiff();

        let mut jpeg_style = EXIF_IDENTIFIER.to_vec();
        jpeg_style.extend_from_slice(&tiff);
        assert_eq!(find_tiff_header(&jpeg_style), Some(tiff.as_slice()));

        let mut heif_style = 6u32.to_be_bytes().to_vec();
        heif_style.extend_from_slice(EXIF_IDENTIFIER);
        heif_style.extend_from_slice(&tiff);
        assert_eq!(find_tiff_header(&heif_style), Some(tiff.as_slice()));

        let mut junk = b"garbage".to_vec();
        junk.extend_from_slice(&tiff);
        assert_eq!(find_tiff_header(&junk), Some(tiff.as_slice()));

        assert_eq!(find_tiff_header(&tiff), Some(tiff.as_slice()));
        assert_eq!(find_tiff_header(b"nothing here"), None);
    }

    #[test]
    fn test_rejects_missing_header() {
        assert!(matches!(
            parse_exif(b"no tiff").unwrap_err(),
            ParseError::InvalidExif(_)
        ));
    }

    #[test]
    fn test_rejects_out_of_range_value() {
        let mut tiff = sample_tiff();
        // Make's value offset
        tiff[18..22].copy_from_slice(&200u32.to_be_bytes());
        assert!(matches!(parse_exif(&tiff).unwrap_err(), ParseError::InvalidExif(_)));
    }

    #[test]
    fn test_rejects_unknown_field_type() {
        let mut tiff = sample_tiff();
        // Orientation's type
        tiff[24..26].copy_from_slice(&13u16.to_be_bytes());
        let err = parse_exif(&tiff).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidExif("unknown field type 13 for tag 0x0112".to_string())
        );
    }

    #[test]
    fn test_rejects_ifd_cycle() {
        let mut tiff = sample_tiff();
        // IFD0's next-IFD pointer back to itself
        tiff[46..50].copy_from_slice(&8u32.to_be_bytes());
        assert!(matches!(parse_exif(&tiff).unwrap_err(), ParseError::InvalidExif(_)));
    }

    #[test]
    fn test_truncated_directory() {
        let tiff = sample_tiff();
        assert!(parse_exif(&tiff[..40]).is_err());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(TagValue::Undefined(vec![0, 1, 0xFF]).to_string(), "00 01 ff");
        assert_eq!(TagValue::Undefined(vec![0; 40]).to_string(), "<40 bytes>");
        assert_eq!(TagValue::SRational(vec![(-1, 3), (2, 5)]).to_string(), "-1/3, 2/5");
        assert_eq!(TagValue::Short(vec![8, 8, 8]).to_string(), "8, 8, 8");
    }

    #[test]
    fn test_tag_serializes_value_as_text() {
        let tags = parse_exif(&sample_tiff()).unwrap();
        let json = serde_json::to_value(&tags[3]).unwrap();
        assert_eq!(json["name"], "ExposureTime");
        assert_eq!(json["ifd"], "exif");
        assert_eq!(json["value"], "1/125");
    }
}
