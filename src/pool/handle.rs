use uuid::Uuid;

use crate::block::Offset;

/// [`PoolAllocator::allocate`]が返すペイロードへのハンドル.
///
/// ハンドル自体はアリーナへの参照を保持しておらず、ペイロードの位置と、
/// それを発行したプールの識別子のみを持つ.
/// 実際のバイト列には[`PoolAllocator::payload`]等を経由してアクセスする.
///
/// [`PoolAllocator::allocate`]: ./struct.PoolAllocator.html#method.allocate
/// [`PoolAllocator::payload`]: ./struct.PoolAllocator.html#method.payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PayloadHandle {
    pool: Uuid,
    offset: Offset,
}
impl PayloadHandle {
    pub(crate) fn new(pool: Uuid, offset: Offset) -> Self {
        PayloadHandle { pool, offset }
    }

    /// ハンドルを発行したプールの識別子を返す.
    pub fn pool(&self) -> Uuid {
        self.pool
    }

    /// ペイロードの開始位置を返す.
    pub fn offset(&self) -> Offset {
        self.offset
    }
}
