use crate::arena::Arena;
use crate::block::{BlockInfo, Offset};
use crate::{ErrorKind, Result};

/// アリーナ内のブロック列を先頭から順に辿るイテレータ.
///
/// 要素は読み出し時点のスナップショットで、アリーナへの参照は保持しない.
/// ヘッダの連鎖が壊れている箇所に達した場合には、エラーを一度だけ返して走査を終了する.
#[derive(Debug)]
pub struct Blocks<'a> {
    arena: &'a Arena,
    next: Option<Offset>,
}
impl<'a> Blocks<'a> {
    pub(crate) fn new(arena: &'a Arena) -> Self {
        Blocks {
            arena,
            next: Some(Offset::ZERO),
        }
    }
}
impl<'a> Iterator for Blocks<'a> {
    type Item = Result<BlockInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.next.take()?;
        let result = track!(read_block(self.arena, offset));
        if let Ok(ref block) = result {
            self.next = next_offset(self.arena, block);
        }
        Some(result)
    }
}

/// `offset`位置のブロックを読み込む.
///
/// ブロックの終端がアリーナを超えている場合には`ErrorKind::InconsistentState`のエラーが返される.
pub(crate) fn read_block(arena: &Arena, offset: Offset) -> Result<BlockInfo> {
    let header = track!(arena.read_header(offset))?;
    let block = BlockInfo::new(offset, header);
    track_assert!(
        block.end() <= u64::from(arena.capacity()),
        ErrorKind::InconsistentState,
        "Block overruns the arena: block={:?}, capacity={}",
        block,
        arena.capacity()
    );
    Ok(block)
}

/// `block`の直後のブロックの位置を返す.
///
/// `block`がアリーナの末尾に達している場合には`None`が返される.
pub(crate) fn next_offset(arena: &Arena, block: &BlockInfo) -> Option<Offset> {
    if block.end() < u64::from(arena.capacity()) {
        Offset::from_u64(block.end())
    } else {
        None
    }
}
