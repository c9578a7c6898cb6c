//! NRRD 体数据读取.
//!
//! 仅支持数据附着在文件头之后的单文件格式 (`.nrrd`), 编码为 `raw` 或 `gzip`.

// ref: http://teem.sourceforge.net/nrrd/format.html

use super::LoadError;
use flate2::read::GzDecoder;
use ndarray::Array3;
use std::io::Read;
use std::path::Path;

/// 体素类型.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Kind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl Kind {
    fn parse(s: &str) -> Result<Self, LoadError> {
        let kind = match s {
            "signed char" | "int8" | "int8_t" | "char" => Self::I8,
            "uchar" | "unsigned char" | "uint8" | "uint8_t" => Self::U8,
            "short" | "short int" | "signed short" | "signed short int" | "int16" | "int16_t" => {
                Self::I16
            }
            "ushort" | "unsigned short" | "unsigned short int" | "uint16" | "uint16_t" => {
                Self::U16
            }
            "int" | "signed int" | "int32" | "int32_t" => Self::I32,
            "uint" | "unsigned int" | "uint32" | "uint32_t" => Self::U32,
            "float" => Self::F32,
            "double" => Self::F64,
            other => return Err(LoadError::Unsupported(format!("type `{other}`"))),
        };
        Ok(kind)
    }

    #[inline]
    const fn bytes(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Encoding {
    Raw,
    Gzip,
}

/// 已解析的文件头.
#[derive(Debug)]
struct Header {
    kind: Kind,
    /// 快轴在前: `[x, y, z]`.
    sizes: [usize; 3],
    big_endian: bool,
    encoding: Encoding,
    /// 快轴在前: `[x, y, z]`.
    spacings: [f64; 3],
}

/// 读取 NRRD 文件, 返回 `(z, y, x)` 组织的数据与 `[z, y, x]` 体素间距.
pub(super) fn read_file(path: &Path) -> Result<(Array3<f32>, [f64; 3]), LoadError> {
    let bytes = std::fs::read(path)?;
    read_bytes(&bytes)
}

pub(super) fn read_bytes(bytes: &[u8]) -> Result<(Array3<f32>, [f64; 3]), LoadError> {
    let split = header_end(bytes)
        .ok_or_else(|| LoadError::Header("missing blank line after header".to_string()))?;
    let text = std::str::from_utf8(&bytes[..split.0])
        .map_err(|_| LoadError::Header("header is not valid UTF-8".to_string()))?;
    let header = parse_header(text)?;

    let payload = &bytes[split.1..];
    let raw = match header.encoding {
        Encoding::Raw => payload.to_vec(),
        Encoding::Gzip => {
            let mut buf = Vec::new();
            GzDecoder::new(payload).read_to_end(&mut buf)?;
            buf
        }
    };

    let [x, y, z] = header.sizes;
    let expected = [y, z, header.kind.bytes()]
        .into_iter()
        .try_fold(x, usize::checked_mul)
        .ok_or_else(|| LoadError::Header(format!("sizes {x} x {y} x {z} overflow")))?;
    if raw.len() != expected {
        return Err(LoadError::Length {
            expected,
            found: raw.len(),
        });
    }

    let values = decode(&raw, header.kind, header.big_endian);
    // 快轴在后即为行优先.
    let data = Array3::from_shape_vec((z, y, x), values)
        .map_err(|e| LoadError::Header(e.to_string()))?;
    let [sx, sy, sz] = header.spacings;
    Ok((data, [sz, sy, sx]))
}

/// 返回 (文件头结束位置, 数据开始位置).
fn header_end(bytes: &[u8]) -> Option<(usize, usize)> {
    let lf = bytes.windows(2).position(|w| w == b"\n\n").map(|i| (i, i + 2));
    let crlf = bytes
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|i| (i, i + 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 < b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn parse_header(text: &str) -> Result<Header, LoadError> {
    let mut lines = text.lines();
    let magic = lines.next().unwrap_or_default();
    if !magic.starts_with("NRRD000") {
        return Err(LoadError::Header(format!("bad magic `{magic}`")));
    }

    let mut kind = None;
    let mut dimension = None;
    let mut sizes: Option<Vec<usize>> = None;
    let mut big_endian = false;
    let mut encoding = None;
    let mut spacings = [1.0; 3];

    for line in lines.map(str::trim).filter(|l| !l.is_empty()) {
        // 注释与 `key:=value` 键值对
        if line.starts_with('#') || line.contains(":=") {
            continue;
        }
        let Some((field, value)) = line.split_once(':') else {
            return Err(LoadError::Header(format!("bad line `{line}`")));
        };
        let value = value.trim();
        match field.trim() {
            "type" => kind = Some(Kind::parse(value)?),
            "dimension" => {
                let d = value
                    .parse::<usize>()
                    .map_err(|_| LoadError::Header(format!("bad dimension `{value}`")))?;
                dimension = Some(d);
            }
            "sizes" => {
                let v = value
                    .split_whitespace()
                    .map(str::parse::<usize>)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| LoadError::Header(format!("bad sizes `{value}`")))?;
                sizes = Some(v);
            }
            "endian" => big_endian = value == "big",
            "encoding" => {
                encoding = Some(match value {
                    "raw" => Encoding::Raw,
                    "gzip" | "gz" => Encoding::Gzip,
                    other => return Err(LoadError::Unsupported(format!("encoding `{other}`"))),
                })
            }
            "spacings" => {
                for (slot, s) in spacings.iter_mut().zip(value.split_whitespace()) {
                    *slot = s.parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(1.0);
                }
            }
            "data file" | "datafile" => {
                return Err(LoadError::Unsupported("detached data file".to_string()))
            }
            "byte skip" | "byteskip" | "line skip" | "lineskip" if value != "0" => {
                return Err(LoadError::Unsupported(format!("{field} {value}")))
            }
            _ => {}
        }
    }

    let kind = kind.ok_or_else(|| LoadError::Header("missing `type`".to_string()))?;
    let dimension = dimension.ok_or_else(|| LoadError::Header("missing `dimension`".to_string()))?;
    if dimension != 3 {
        return Err(LoadError::Dimension(dimension));
    }
    let sizes = sizes.ok_or_else(|| LoadError::Header("missing `sizes`".to_string()))?;
    let sizes: [usize; 3] = sizes
        .try_into()
        .map_err(|v: Vec<usize>| LoadError::Dimension(v.len()))?;
    let encoding = encoding.ok_or_else(|| LoadError::Header("missing `encoding`".to_string()))?;

    Ok(Header {
        kind,
        sizes,
        big_endian,
        encoding,
        spacings,
    })
}

macro_rules! decode_as {
    ($raw: expr, $big: expr, $t: ty) => {
        $raw.chunks_exact(std::mem::size_of::<$t>())
            .map(|c| {
                // `chunks_exact` 保证长度一致.
                let mut b = [0u8; std::mem::size_of::<$t>()];
                b.copy_from_slice(c);
                let v = if $big {
                    <$t>::from_be_bytes(b)
                } else {
                    <$t>::from_le_bytes(b)
                };
                v as f32
            })
            .collect()
    };
}

fn decode(raw: &[u8], kind: Kind, big: bool) -> Vec<f32> {
    match kind {
        Kind::I8 => raw.iter().map(|&b| b as i8 as f32).collect(),
        Kind::U8 => raw.iter().map(|&b| b as f32).collect(),
        Kind::I16 => decode_as!(raw, big, i16),
        Kind::U16 => decode_as!(raw, big, u16),
        Kind::I32 => decode_as!(raw, big, i32),
        Kind::U32 => decode_as!(raw, big, u32),
        Kind::F32 => decode_as!(raw, big, f32),
        Kind::F64 => decode_as!(raw, big, f64),
    }
}
