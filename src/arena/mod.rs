//! プールが使用するバイト列(アリーナ)と、その確保元となるホスト環境のインタフェース.
//!
//! アリーナは初期化時に一度だけホスト環境から確保され、以後サイズが変わることはない.
pub use self::host::{HostMemory, SystemMemory};

use crate::block::{BlockHeader, Offset, HEADER_SIZE};
use crate::{ErrorKind, Result};

mod host;

/// 固定長のバイト列.
///
/// ブロックヘッダやペイロードへのアクセスは全てオフセット経由で行われ、
/// 実際にメモリに触れる前に、必ずアリーナの範囲内に収まっているかが検査される.
///
/// インスタンスが破棄されると、その領域はホスト環境に返却される.
#[derive(Debug)]
pub struct Arena {
    bytes: Vec<u8>,
}
impl Arena {
    /// `host`から`capacity`バイトのアリーナを確保する.
    pub fn acquire<H: HostMemory>(host: &mut H, capacity: u32) -> Result<Self> {
        let bytes = track!(host.acquire(capacity as usize))?;
        track_assert_eq!(bytes.len(), capacity as usize, ErrorKind::Other);
        Ok(Arena { bytes })
    }

    /// アリーナの容量(バイト単位)を返す.
    pub fn capacity(&self) -> u32 {
        self.bytes.len() as u32
    }

    /// 指定位置のブロックヘッダを読み込む.
    pub fn read_header(&self, offset: Offset) -> Result<BlockHeader> {
        let buf = track!(self.bytes(offset, HEADER_SIZE))?;
        track!(BlockHeader::read_from(buf); offset)
    }

    /// 指定位置にブロックヘッダを書き込む.
    pub fn write_header(&mut self, offset: Offset, header: &BlockHeader) -> Result<()> {
        let buf = track!(self.bytes_mut(offset, HEADER_SIZE))?;
        track!(header.write_to(buf); offset)
    }

    /// `[offset, offset + len)`の範囲のバイト列を返す.
    ///
    /// # Errors
    ///
    /// 範囲がアリーナを超えている場合には、種類が`ErrorKind::InconsistentState`のエラーが返される.
    pub fn bytes(&self, offset: Offset, len: u32) -> Result<&[u8]> {
        let end = track!(self.checked_end(offset, len))?;
        Ok(&self.bytes[offset.as_usize()..end])
    }

    /// `[offset, offset + len)`の範囲の可変なバイト列を返す.
    ///
    /// # Errors
    ///
    /// 範囲がアリーナを超えている場合には、種類が`ErrorKind::InconsistentState`のエラーが返される.
    pub fn bytes_mut(&mut self, offset: Offset, len: u32) -> Result<&mut [u8]> {
        let end = track!(self.checked_end(offset, len))?;
        Ok(&mut self.bytes[offset.as_usize()..end])
    }

    fn checked_end(&self, offset: Offset, len: u32) -> Result<usize> {
        let end = offset.as_u64() + u64::from(len);
        track_assert!(
            end <= self.bytes.len() as u64,
            ErrorKind::InconsistentState,
            "Out of arena: offset={}, len={}, capacity={}",
            offset,
            len,
            self.bytes.len()
        );
        Ok(end as usize)
    }
}

#[cfg(test)]
mod tests {
    use trackable::result::TestResult;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn it_works() -> TestResult {
        let mut arena = track!(Arena::acquire(&mut SystemMemory::new(), 64))?;
        assert_eq!(arena.capacity(), 64);

        track!(arena.write_header(Offset::from(0), &BlockHeader::free(56)))?;
        assert_eq!(
            track!(arena.read_header(Offset::from(0)))?,
            BlockHeader::free(56)
        );

        track!(arena.bytes_mut(Offset::from(8), 4))?.copy_from_slice(b"abcd");
        assert_eq!(track!(arena.bytes(Offset::from(8), 4))?, b"abcd");

        // ペイロードの書き込みはヘッダを壊さない
        assert_eq!(
            track!(arena.read_header(Offset::from(0)))?,
            BlockHeader::free(56)
        );
        Ok(())
    }

    #[test]
    fn out_of_range() -> TestResult {
        let mut arena = track!(Arena::acquire(&mut SystemMemory::new(), 16))?;
        assert!(arena.bytes(Offset::from(0), 16).is_ok());
        assert_eq!(
            arena.bytes(Offset::from(1), 16).err().map(|e| *e.kind()),
            Some(ErrorKind::InconsistentState)
        );
        assert_eq!(
            arena.read_header(Offset::from(12)).err().map(|e| *e.kind()),
            Some(ErrorKind::InconsistentState)
        );
        assert_eq!(
            arena
                .write_header(Offset::from(Offset::MAX), &BlockHeader::free(0))
                .err()
                .map(|e| *e.kind()),
            Some(ErrorKind::InconsistentState)
        );
        Ok(())
    }
}
