//! アリーナ内のブロック(ヘッダ + ペイロード)関連の構成要素.
//!
//! アリーナは、以下のようにブロックが隙間なく並んだバイト列として表現される:
//!
//! ```text
//! [header][payload][header][payload]...[header][payload]
//! ```
//!
//! ブロック同士の連結はポインタとしては保持されておらず、
//! 「次のブロック」の位置は常に`offset + HEADER_SIZE + payload_size`の計算によって導出される.
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

pub use self::offset::Offset;

use crate::{ErrorKind, Result};

mod offset;

/// ブロックヘッダのサイズ(バイト単位).
///
/// 占有フラグ(4バイト)とペイロードサイズ(4バイト)から構成される.
pub const HEADER_SIZE: u32 = 8;

/// 空きブロックを示す占有フラグの値.
const FLAG_FREE: i32 = 1;

/// 使用中ブロックを示す占有フラグの値.
const FLAG_OCCUPIED: i32 = -1;

/// 各ブロックの先頭に埋め込まれるヘッダ.
///
/// # フォーマット
///
/// ```text
/// 0        4              8
/// +--------+--------------+
/// |  flag  | payload_size |
/// +--------+--------------+
/// ```
///
/// - `flag`: `i32`(ビッグエンディアン). `1`なら空き、`-1`なら使用中
/// - `payload_size`: `u32`(ビッグエンディアン). ヘッダ自体のサイズは含まない
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// ブロックが使用中かどうか.
    pub occupied: bool,

    /// ペイロード部のサイズ(バイト単位).
    pub payload_size: u32,
}
impl BlockHeader {
    /// 空きブロック用のヘッダを生成する.
    pub fn free(payload_size: u32) -> Self {
        BlockHeader {
            occupied: false,
            payload_size,
        }
    }

    /// 使用中ブロック用のヘッダを生成する.
    pub fn occupied(payload_size: u32) -> Self {
        BlockHeader {
            occupied: true,
            payload_size,
        }
    }

    /// ヘッダを書き込む.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let flag = if self.occupied {
            FLAG_OCCUPIED
        } else {
            FLAG_FREE
        };
        track_io!(writer.write_i32::<BigEndian>(flag))?;
        track_io!(writer.write_u32::<BigEndian>(self.payload_size))?;
        Ok(())
    }

    /// ヘッダを読み込む.
    ///
    /// # Errors
    ///
    /// 占有フラグが未知の値の場合には、種類が`ErrorKind::InconsistentState`のエラーが返される.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let flag = track_io!(reader.read_i32::<BigEndian>())?;
        let payload_size = track_io!(reader.read_u32::<BigEndian>())?;
        let occupied = match flag {
            FLAG_FREE => false,
            FLAG_OCCUPIED => true,
            _ => track_panic!(ErrorKind::InconsistentState, "Unknown block flag: {}", flag),
        };
        Ok(BlockHeader {
            occupied,
            payload_size,
        })
    }
}

/// アリーナ内の一つのブロックの情報.
///
/// アリーナから読み出した時点のスナップショットであり、
/// 割当や解放の後には古い情報となっている可能性がある.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// ブロック(ヘッダ)の開始位置.
    pub offset: Offset,

    /// ブロックが使用中かどうか.
    pub occupied: bool,

    /// ペイロード部のサイズ(バイト単位).
    pub payload_size: u32,
}
impl BlockInfo {
    pub(crate) fn new(offset: Offset, header: BlockHeader) -> Self {
        BlockInfo {
            offset,
            occupied: header.occupied,
            payload_size: header.payload_size,
        }
    }

    /// ブロックが空きかどうか.
    pub fn is_free(&self) -> bool {
        !self.occupied
    }

    /// ペイロードの開始位置を返す.
    pub fn payload_offset(&self) -> u64 {
        self.offset.as_u64() + u64::from(HEADER_SIZE)
    }

    /// ブロックの終端位置を返す.
    ///
    /// **注意**: [offset, end) の範囲がブロックとなるため、
    /// 終端位置は次のブロックの開始位置と等しい.
    pub fn end(&self) -> u64 {
        self.payload_offset() + u64::from(self.payload_size)
    }

    /// ヘッダを含めたブロック全体のサイズを返す.
    pub fn len(&self) -> u64 {
        u64::from(HEADER_SIZE) + u64::from(self.payload_size)
    }

    /// ヘッダ部分を返す.
    pub fn header(&self) -> BlockHeader {
        BlockHeader {
            occupied: self.occupied,
            payload_size: self.payload_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use trackable::result::TestResult;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn header_layout() -> TestResult {
        let mut buf = Vec::new();
        track!(BlockHeader::occupied(0x0102).write_to(&mut buf))?;
        assert_eq!(buf, [0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x01, 0x02]);

        let mut buf = Vec::new();
        track!(BlockHeader::free(3).write_to(&mut buf))?;
        assert_eq!(buf, [0, 0, 0, 1, 0, 0, 0, 3]);
        assert_eq!(buf.len() as u32, HEADER_SIZE);

        let header = track!(BlockHeader::read_from(&buf[..]))?;
        assert_eq!(header, BlockHeader::free(3));
        Ok(())
    }

    #[test]
    fn unknown_flag() {
        let buf = [0, 0, 0, 0, 0, 0, 0, 3];
        let e = BlockHeader::read_from(&buf[..]).err();
        assert_eq!(e.map(|e| *e.kind()), Some(ErrorKind::InconsistentState));
    }

    #[test]
    fn truncated_header() {
        let buf = [0, 0, 0, 1, 0];
        let e = BlockHeader::read_from(&buf[..]).err();
        assert_eq!(e.map(|e| *e.kind()), Some(ErrorKind::InconsistentState));
    }

    #[test]
    fn block_info_works() {
        let info = BlockInfo::new(Offset::from(16), BlockHeader::free(24));
        assert!(info.is_free());
        assert_eq!(info.payload_offset(), 24);
        assert_eq!(info.end(), 48);
        assert_eq!(info.len(), 32);
        assert_eq!(info.header(), BlockHeader::free(24));
    }
}
