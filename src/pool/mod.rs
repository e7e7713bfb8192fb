//! 固定長のアリーナ上で動作するアロケータ.
//!
//! アリーナは、先頭にヘッダを持つ可変長ブロックの列として管理される.
//! 空きリスト等の補助的なデータ構造は持たず、ブロックの連鎖はアリーナ内のヘッダのみで表現されている.
//!
//! # 割当
//!
//! 割当要求の度にアリーナ全体を先頭から走査し、[`Placement`]と[`FitPolicy`]に従って
//! 対象となる空きブロックを選択する.
//! 選択されたブロックは要求サイズ分の使用中ブロックと、残りの空きブロックに分割される.
//!
//! # 解放
//!
//! 解放されたブロックを空きに戻した後、再びアリーナ全体を走査して、
//! 隣接する空きブロック同士を一つに結合する.
//! そのため、解放処理直後には隣接する空きブロックの組は存在しない.
//!
//! # スレッド安全性
//!
//! 内部で排他制御は行っていない.
//! 複数スレッドから利用する場合には、インスタンス全体を`Mutex`等で保護する必要がある.
//!
//! [`Placement`]: ./enum.Placement.html
//! [`FitPolicy`]: ./enum.FitPolicy.html
use slog::Logger;
use uuid::Uuid;

pub use self::blocks::Blocks;
pub use self::builder::PoolBuilder;
pub use self::handle::PayloadHandle;
pub use self::policy::{FitPolicy, Placement};

use self::blocks::{next_offset, read_block};
use self::policy::{Selection, Split};
use crate::arena::Arena;
use crate::block::{BlockHeader, BlockInfo, Offset, HEADER_SIZE};
use crate::metrics::PoolMetrics;
use crate::{ErrorKind, Result};

mod blocks;
mod builder;
mod handle;
mod policy;

/// 単一のアリーナからペイロードの割当と解放を行うアロケータ.
///
/// インスタンスの生成が初期化に、破棄([`teardown`](#method.teardown))が後始末に相当する.
/// 破棄後のプールに対する操作は型レベルで禁止されている.
///
/// # Examples
///
/// ```
/// use poolalloc::pool::PoolAllocator;
///
/// let mut pool = PoolAllocator::new(1024).unwrap();
/// let handle = pool.allocate(100).unwrap().expect("enough space");
/// pool.payload_mut(&handle).unwrap()[..5].copy_from_slice(b"hello");
/// assert_eq!(&pool.payload(&handle).unwrap()[..5], b"hello");
///
/// pool.free(handle).unwrap();
/// assert_eq!(pool.stats().unwrap().blocks, 1);
/// pool.teardown();
/// ```
#[derive(Debug)]
pub struct PoolAllocator {
    id: Uuid,
    arena: Arena,
    placement: Placement,
    fit_policy: FitPolicy,
    logger: Logger,
    metrics: PoolMetrics,
}
impl PoolAllocator {
    pub(crate) fn new_inner(
        id: Uuid,
        arena: Arena,
        placement: Placement,
        fit_policy: FitPolicy,
        logger: Logger,
        metrics: PoolMetrics,
    ) -> Self {
        PoolAllocator {
            id,
            arena,
            placement,
            fit_policy,
            logger,
            metrics,
        }
    }

    /// デフォルト設定で、`pool_size`バイトのアリーナを持つプールを生成する.
    pub fn new(pool_size: u32) -> Result<Self> {
        track!(PoolBuilder::new().create(pool_size))
    }

    /// プールの識別子を返す.
    pub fn instance_id(&self) -> Uuid {
        self.id
    }

    /// アリーナの容量(ヘッダ領域を含むバイト数)を返す.
    pub fn capacity(&self) -> u32 {
        self.arena.capacity()
    }

    /// 割当対象ブロックの選択戦略を返す.
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// 空きブロックを割当候補とみなす条件を返す.
    pub fn fit_policy(&self) -> FitPolicy {
        self.fit_policy
    }

    /// プールのメトリクスを返す.
    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }

    /// `size`バイトのペイロードを割り当てる.
    ///
    /// 割り当てられるペイロードのサイズは`size`以上となる
    /// (`FitPolicy::AllowExact`の場合には、分割できなかった余りの分だけ大きくなることがある).
    ///
    /// 十分な空きブロックが存在しない場合には`Ok(None)`が返され、アリーナは一切変更されない.
    ///
    /// # Errors
    ///
    /// ヘッダの連鎖が壊れている場合には、種類が`ErrorKind::InconsistentState`のエラーが返される.
    pub fn allocate(&mut self, size: u32) -> Result<Option<PayloadHandle>> {
        let mut selection = Selection::new(self.placement, self.fit_policy, size);
        for block in self.blocks() {
            let block = track!(block)?;
            if !selection.offer(block) {
                break;
            }
        }
        let block = match selection.finish() {
            Some(block) => block,
            None => {
                self.metrics.nospace_failures.increment();
                warn!(self.logger, "No free block can hold the request"; "size" => size);
                return Ok(None);
            }
        };

        let split = track!(Split::plan(&block, size))?;
        if let Some((offset, ref remainder)) = split.remainder {
            track!(self.arena.write_header(offset, remainder))?;
        }
        track!(self.arena.write_header(block.offset, &split.occupied))?;

        let payload = match Offset::from_u64(block.payload_offset()) {
            Some(offset) => offset,
            None => track_panic!(ErrorKind::InconsistentState, "block={:?}", block),
        };
        self.metrics.count_allocation(split.occupied.payload_size);
        debug!(self.logger, "Allocated";
               "size" => size,
               "offset" => payload.as_u32(),
               "payload_size" => split.occupied.payload_size,
               "split" => split.remainder.is_some());
        Ok(Some(PayloadHandle::new(self.id, payload)))
    }

    /// `handle`が指すペイロードを解放する.
    ///
    /// 解放後には、隣接する空きブロックが全て結合される.
    ///
    /// # Errors
    ///
    /// 以下の場合には、種類が`ErrorKind::InvalidInput`のエラーが返され、アリーナは一切変更されない:
    ///
    /// - `handle`が別のプールによって発行されたものである
    /// - `handle`がブロックのペイロードの先頭を指していない
    /// - `handle`が指すブロックが既に解放されている
    ///
    /// ヘッダの連鎖が壊れている場合には、種類が`ErrorKind::InconsistentState`のエラーが返される.
    pub fn free(&mut self, handle: PayloadHandle) -> Result<()> {
        let block = match self.occupied_block(&handle) {
            Ok(block) => block,
            Err(e) => {
                if *e.kind() == ErrorKind::InvalidInput {
                    self.metrics.invalid_frees.increment();
                    warn!(self.logger, "Rejected free"; "offset" => handle.offset().as_u32(),
                          "reason" => e.to_string());
                }
                return Err(track!(e));
            }
        };
        let header = BlockHeader::free(block.payload_size);
        track!(self.arena.write_header(block.offset, &header))?;
        self.metrics.count_free(block.payload_size);

        let merged = track!(self.coalesce())?;
        debug!(self.logger, "Freed";
               "offset" => handle.offset().as_u32(),
               "payload_size" => block.payload_size,
               "merged_blocks" => merged);
        Ok(())
    }

    /// プールを破棄し、アリーナをホスト環境に返却する.
    ///
    /// 未解放のハンドルは、以後全て無効となる.
    pub fn teardown(self) {
        info!(self.logger, "Pool teardown";
              "live_allocations" => self.metrics.live_allocations(),
              "usage_bytes" => self.metrics.usage_bytes());
    }

    /// `handle`が指すペイロードを返す.
    ///
    /// 返されるバイト列の長さは、ブロックのペイロードサイズ(割当時の要求サイズ以上)となる.
    ///
    /// # Errors
    ///
    /// `handle`が無効な場合(別プールのもの、解放済み、等)には、種類が`ErrorKind::InvalidInput`のエラーが返される.
    pub fn payload(&self, handle: &PayloadHandle) -> Result<&[u8]> {
        let block = track!(self.occupied_block(handle))?;
        track!(self.arena.bytes(handle.offset(), block.payload_size))
    }

    /// `handle`が指すペイロードを可変な形で返す.
    ///
    /// # Errors
    ///
    /// `handle`が無効な場合(別プールのもの、解放済み、等)には、種類が`ErrorKind::InvalidInput`のエラーが返される.
    pub fn payload_mut(&mut self, handle: &PayloadHandle) -> Result<&mut [u8]> {
        let block = track!(self.occupied_block(handle))?;
        track!(self.arena.bytes_mut(handle.offset(), block.payload_size))
    }

    /// アリーナ内のブロック列を先頭から辿るイテレータを返す.
    pub fn blocks(&self) -> Blocks {
        Blocks::new(&self.arena)
    }

    /// ブロック列の整合性を検査する.
    ///
    /// 以下が満たされていない場合には、種類が`ErrorKind::InconsistentState`のエラーが返される:
    ///
    /// - ブロック列が隙間や重なり無くアリーナ全体を覆っている
    /// - 隣接する二つのブロックが共に空き、という箇所が存在しない
    pub fn check_consistency(&self) -> Result<()> {
        let mut end = 0;
        let mut prev_is_free = false;
        for block in self.blocks() {
            let block = track!(block)?;
            track_assert_eq!(block.offset.as_u64(), end, ErrorKind::InconsistentState);
            track_assert!(
                !(prev_is_free && block.is_free()),
                ErrorKind::InconsistentState,
                "Adjacent free blocks: offset={}",
                block.offset
            );
            prev_is_free = block.is_free();
            end = block.end();
        }
        track_assert_eq!(
            end,
            u64::from(self.arena.capacity()),
            ErrorKind::InconsistentState
        );
        Ok(())
    }

    /// アリーナの使用状況を集計する.
    pub fn stats(&self) -> Result<PoolStats> {
        let mut stats = PoolStats::default();
        for block in self.blocks() {
            let block = track!(block)?;
            stats.blocks += 1;
            if block.occupied {
                stats.occupied_blocks += 1;
                stats.occupied_bytes += u64::from(block.payload_size);
            } else {
                stats.free_blocks += 1;
                stats.free_bytes += u64::from(block.payload_size);
                stats.largest_free_payload = stats.largest_free_payload.max(block.payload_size);
            }
        }
        Ok(stats)
    }

    fn occupied_block(&self, handle: &PayloadHandle) -> Result<BlockInfo> {
        track_assert_eq!(handle.pool(), self.id, ErrorKind::InvalidInput);
        let offset = match handle.offset().checked_sub(HEADER_SIZE) {
            Some(offset) => offset,
            None => track_panic!(
                ErrorKind::InvalidInput,
                "Not a payload offset: {}",
                handle.offset()
            ),
        };
        for block in self.blocks() {
            let block = track!(block)?;
            if block.offset == offset {
                track_assert!(
                    block.occupied,
                    ErrorKind::InvalidInput,
                    "Block is not in use (double free?): offset={}",
                    handle.offset()
                );
                return Ok(block);
            }
            if block.offset > offset {
                break;
            }
        }
        track_panic!(
            ErrorKind::InvalidInput,
            "No block starts at payload offset {}",
            handle.offset()
        )
    }

    // 先頭から走査し、隣接する空きブロックを結合する.
    //
    // 結合した場合には同じ位置に留まるので、連続する空きブロック群は一回の走査で一つにまとめられる.
    fn coalesce(&mut self) -> Result<usize> {
        let mut merged = 0;
        let mut offset = Offset::ZERO;
        loop {
            let current = track!(read_block(&self.arena, offset))?;
            let next = match next_offset(&self.arena, &current) {
                Some(next) => next,
                None => break,
            };
            let following = track!(read_block(&self.arena, next))?;
            if current.is_free() && following.is_free() {
                // `following`の終端はアリーナ内なので、結合後のサイズも32bitに収まる
                let payload_size = following.end() - current.payload_offset();
                track_assert!(
                    payload_size <= u64::from(Offset::MAX),
                    ErrorKind::InconsistentState
                );
                let header = BlockHeader::free(payload_size as u32);
                track!(self.arena.write_header(offset, &header))?;
                merged += 1;
            } else {
                offset = next;
            }
        }
        self.metrics.coalesced_blocks.add_u64(merged as u64);
        Ok(merged)
    }
}

/// アリーナの使用状況.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// ブロックの総数.
    pub blocks: usize,

    /// 空きブロックの数.
    pub free_blocks: usize,

    /// 使用中ブロックの数.
    pub occupied_blocks: usize,

    /// 空きブロックのペイロードの合計バイト数.
    pub free_bytes: u64,

    /// 使用中ブロックのペイロードの合計バイト数.
    pub occupied_bytes: u64,

    /// 最大の空きブロックのペイロードサイズ.
    pub largest_free_payload: u32,
}
impl PoolStats {
    /// ヘッダ領域の合計バイト数.
    pub fn header_bytes(&self) -> u64 {
        self.blocks as u64 * u64::from(HEADER_SIZE)
    }
}
