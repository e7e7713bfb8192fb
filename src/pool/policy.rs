//! 割当対象ブロックの選択方針.
use crate::block::{BlockHeader, BlockInfo, Offset, HEADER_SIZE};
use crate::{ErrorKind, Result};

/// 候補ブロック群の中から、どれを割当に使用するかの戦略.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// アリーナ全体を走査し、余剰(slack)が最小となる候補を選択する.
    ///
    /// 余剰が等しい候補が複数ある場合には、先頭に近いものが優先される.
    BestFit,

    /// 先頭から走査し、最初に見つかった候補を選択する.
    FirstFit,
}
impl Default for Placement {
    fn default() -> Self {
        Placement::BestFit
    }
}

/// どの空きブロックを割当の候補とみなすか、の方針.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitPolicy {
    /// 分割後の残り領域にヘッダと一バイト以上のペイロードが収まるブロックのみを候補とする.
    ///
    /// すなわち`payload_size > size + HEADER_SIZE`を満たす空きブロックが対象となり、
    /// 要求サイズとちょうど同じ大きさの空きブロックは選択されない.
    RequireSplit,

    /// `payload_size >= size`を満たす全ての空きブロックを候補とする.
    ///
    /// 残り領域にヘッダが収まらない場合には、分割を行わずにブロック全体を割り当てる.
    AllowExact,
}
impl Default for FitPolicy {
    fn default() -> Self {
        FitPolicy::RequireSplit
    }
}
impl FitPolicy {
    /// `block`が`size`バイトの要求の候補になるなら、その余剰を返す.
    pub fn slack(self, block: &BlockInfo, size: u32) -> Option<u32> {
        if block.occupied {
            return None;
        }
        let fits = match self {
            FitPolicy::RequireSplit => {
                u64::from(block.payload_size) > u64::from(size) + u64::from(HEADER_SIZE)
            }
            FitPolicy::AllowExact => block.payload_size >= size,
        };
        if fits {
            Some(block.payload_size - size)
        } else {
            None
        }
    }
}

/// 一回の走査における候補の選択状態.
#[derive(Debug)]
pub(crate) struct Selection {
    placement: Placement,
    fit_policy: FitPolicy,
    size: u32,
    best: Option<(BlockInfo, u32)>,
}
impl Selection {
    pub fn new(placement: Placement, fit_policy: FitPolicy, size: u32) -> Self {
        Selection {
            placement,
            fit_policy,
            size,
            best: None,
        }
    }

    /// 走査中のブロックを候補として提示する.
    ///
    /// これ以上走査を続ける必要がない場合には`false`が返される.
    pub fn offer(&mut self, block: BlockInfo) -> bool {
        if let Some(slack) = self.fit_policy.slack(&block, self.size) {
            if self.best.map_or(true, |(_, best)| slack < best) {
                self.best = Some((block, slack));
            }
        }
        match self.placement {
            Placement::BestFit => true,
            Placement::FirstFit => self.best.is_none(),
        }
    }

    pub fn finish(self) -> Option<BlockInfo> {
        self.best.map(|(block, _)| block)
    }
}

/// 空きブロック`block`から`size`バイトを切り出した結果.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Split {
    pub occupied: BlockHeader,
    pub remainder: Option<(Offset, BlockHeader)>,
}
impl Split {
    /// `block`の先頭から`size`バイトを割り当てる.
    ///
    /// 残り領域がヘッダ一つ分以上あれば、そこに新しい空きブロックが作られる.
    /// そうでなければブロック全体が割り当てられる.
    ///
    /// # Panics
    ///
    /// `size`が`block.payload_size`を超えている場合には、現在のスレッドがパニックする.
    pub fn plan(block: &BlockInfo, size: u32) -> Result<Self> {
        assert!(size <= block.payload_size);
        let leftover = block.payload_size - size;
        if leftover < HEADER_SIZE {
            return Ok(Split {
                occupied: BlockHeader::occupied(block.payload_size),
                remainder: None,
            });
        }

        let remainder_offset = match Offset::from_u64(block.payload_offset() + u64::from(size)) {
            Some(offset) => offset,
            None => track_panic!(
                ErrorKind::InconsistentState,
                "Remainder offset overflows: block={:?}, size={}",
                block,
                size
            ),
        };
        Ok(Split {
            occupied: BlockHeader::occupied(size),
            remainder: Some((remainder_offset, BlockHeader::free(leftover - HEADER_SIZE))),
        })
    }
}

#[cfg(test)]
mod tests {
    use trackable::result::TestResult;

    use super::*;
    use crate::block::BlockHeader;

    fn free(offset: u32, payload_size: u32) -> BlockInfo {
        BlockInfo::new(Offset::from(offset), BlockHeader::free(payload_size))
    }

    #[test]
    fn require_split_slack() {
        let p = FitPolicy::RequireSplit;
        assert_eq!(p.slack(&free(0, 100), 8), Some(92));
        assert_eq!(p.slack(&free(0, 17), 8), Some(9));
        assert_eq!(p.slack(&free(0, 16), 8), None);
        assert_eq!(p.slack(&free(0, 8), 8), None);
        assert_eq!(p.slack(&free(0, 100), std::u32::MAX), None);

        let occupied = BlockInfo::new(Offset::from(0), BlockHeader::occupied(100));
        assert_eq!(p.slack(&occupied, 8), None);
    }

    #[test]
    fn allow_exact_slack() {
        let p = FitPolicy::AllowExact;
        assert_eq!(p.slack(&free(0, 8), 8), Some(0));
        assert_eq!(p.slack(&free(0, 16), 8), Some(8));
        assert_eq!(p.slack(&free(0, 7), 8), None);
    }

    #[test]
    fn best_fit_selection() {
        // `10`は分割用のヘッダ領域を確保できないので候補にならない
        let mut s = Selection::new(Placement::BestFit, FitPolicy::RequireSplit, 8);
        assert!(s.offer(free(0, 100)));
        assert!(s.offer(free(108, 10)));
        assert!(s.offer(free(126, 50)));
        assert_eq!(s.finish(), Some(free(126, 50)));

        let mut s = Selection::new(Placement::BestFit, FitPolicy::AllowExact, 8);
        assert!(s.offer(free(0, 100)));
        assert!(s.offer(free(108, 10)));
        assert!(s.offer(free(126, 50)));
        assert_eq!(s.finish(), Some(free(108, 10)));

        let mut s = Selection::new(Placement::BestFit, FitPolicy::RequireSplit, 8);
        for block in vec![free(0, 100), free(108, 20), free(136, 50), free(194, 20)] {
            assert!(s.offer(block));
        }
        assert_eq!(s.finish(), Some(free(108, 20)));
    }

    #[test]
    fn first_fit_selection() {
        let mut s = Selection::new(Placement::FirstFit, FitPolicy::RequireSplit, 8);
        assert!(s.offer(free(0, 10)));
        assert!(!s.offer(free(18, 100)));
        assert_eq!(s.finish(), Some(free(18, 100)));
    }

    #[test]
    fn split_plan() -> TestResult {
        let plan = track!(Split::plan(&free(0, 100), 10))?;
        assert_eq!(plan.occupied, BlockHeader::occupied(10));
        assert_eq!(
            plan.remainder,
            Some((Offset::from(18), BlockHeader::free(82)))
        );

        // 残り領域にヘッダがちょうど収まる
        let plan = track!(Split::plan(&free(32, 18), 10))?;
        assert_eq!(plan.occupied, BlockHeader::occupied(10));
        assert_eq!(plan.remainder, Some((Offset::from(50), BlockHeader::free(0))));

        // ヘッダが収まらないので丸ごと割り当てる
        let plan = track!(Split::plan(&free(0, 17), 10))?;
        assert_eq!(plan.occupied, BlockHeader::occupied(17));
        assert_eq!(plan.remainder, None);
        Ok(())
    }

    #[test]
    #[should_panic]
    fn split_underflow() {
        let _ = Split::plan(&free(0, 10), 11);
    }
}
