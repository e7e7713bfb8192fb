use prometrics::metrics::MetricBuilder;
use slog::{Discard, Logger};
use uuid::Uuid;

use super::policy::{FitPolicy, Placement};
use super::PoolAllocator;
use crate::arena::{Arena, HostMemory, SystemMemory};
use crate::block::{BlockHeader, Offset, HEADER_SIZE};
use crate::metrics::PoolMetrics;
use crate::{ErrorKind, Result};

/// `PoolAllocator`のビルダ.
#[derive(Debug, Clone)]
pub struct PoolBuilder {
    placement: Placement,
    fit_policy: FitPolicy,
    instance_id: Option<Uuid>,
    logger: Logger,
    metrics: MetricBuilder,
}
impl PoolBuilder {
    /// デフォルト設定で`PoolBuilder`インスタンスを生成する.
    pub fn new() -> Self {
        PoolBuilder {
            placement: Placement::default(),
            fit_policy: FitPolicy::default(),
            instance_id: None,
            logger: Logger::root(Discard, o!()),
            metrics: MetricBuilder::new(),
        }
    }

    /// 割当対象ブロックの選択戦略を設定する.
    ///
    /// デフォルト値は`Placement::BestFit`.
    pub fn placement(&mut self, placement: Placement) -> &mut Self {
        self.placement = placement;
        self
    }

    /// 空きブロックを割当候補とみなす条件を設定する.
    ///
    /// デフォルト値は`FitPolicy::RequireSplit`.
    pub fn fit_policy(&mut self, fit_policy: FitPolicy) -> &mut Self {
        self.fit_policy = fit_policy;
        self
    }

    /// プールインスタンスを識別するためのUUIDを設定する.
    ///
    /// 発行されるハンドルには、この識別子が埋め込まれ、
    /// 別のプールのハンドルが渡された場合の検出に使われる.
    ///
    /// 本メソッドが呼ばれていない場合は、ランダムなUUIDが割り当てられる.
    pub fn instance_id(&mut self, id: Uuid) -> &mut Self {
        self.instance_id = Some(id);
        self
    }

    /// プール用の logger を登録する.
    pub fn logger(&mut self, logger: Logger) -> &mut Self {
        self.logger = logger;
        self
    }

    /// メトリクス用の共通設定を登録する.
    ///
    /// デフォルト値は`MetricBuilder::new()`.
    pub fn metrics(&mut self, metrics: MetricBuilder) -> &mut Self {
        self.metrics = metrics;
        self
    }

    /// プロセスのヒープから`pool_size`バイトのアリーナを確保して、プールを生成する.
    ///
    /// 詳細は[`create_with_host`](#method.create_with_host)を参照のこと.
    pub fn create(&self, pool_size: u32) -> Result<PoolAllocator> {
        track!(self.create_with_host(&mut SystemMemory::new(), pool_size))
    }

    /// `host`から`pool_size`バイトのアリーナを確保して、プールを生成する.
    ///
    /// 生成直後のアリーナは、全体を覆う一つの空きブロックから構成される.
    ///
    /// # Errors
    ///
    /// `pool_size`がヘッダサイズ以下の場合には、種類が`ErrorKind::InvalidInput`のエラーが返される.
    ///
    /// # Panics
    ///
    /// `host`がアリーナを供給できなかった場合には、現在のスレッドがパニックする.
    /// バックエンドとなる領域が無ければプールは一切機能しないため、これは回復不能な失敗として扱われる.
    pub fn create_with_host<H>(&self, host: &mut H, pool_size: u32) -> Result<PoolAllocator>
    where
        H: HostMemory,
    {
        track_assert!(
            pool_size > HEADER_SIZE,
            ErrorKind::InvalidInput; pool_size, HEADER_SIZE
        );

        let id = self.instance_id.unwrap_or_else(Uuid::new_v4);
        let logger = self.logger.new(o!("pool" => id.to_string()));
        let mut arena = match Arena::acquire(host, pool_size) {
            Ok(arena) => arena,
            Err(e) => {
                crit!(logger, "Cannot acquire the arena from the host";
                      "pool_size" => pool_size, "error" => e.to_string());
                panic!(
                    "poolalloc: could not get {} bytes from the host: {}",
                    pool_size, e
                );
            }
        };
        let header = BlockHeader::free(pool_size - HEADER_SIZE);
        track!(arena.write_header(Offset::ZERO, &header))?;

        let metrics = PoolMetrics::new(&self.metrics);
        metrics.capacity_bytes.set(f64::from(pool_size));
        info!(logger, "Pool created";
              "capacity" => pool_size,
              "placement" => format!("{:?}", self.placement),
              "fit_policy" => format!("{:?}", self.fit_policy));

        Ok(PoolAllocator::new_inner(
            id,
            arena,
            self.placement,
            self.fit_policy,
            logger,
            metrics,
        ))
    }
}
impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use trackable::result::TestResult;

    use super::*;
    use crate::block::BlockInfo;

    struct RefusingHost;
    impl HostMemory for RefusingHost {
        fn acquire(&mut self, size: usize) -> Result<Vec<u8>> {
            track_panic!(ErrorKind::Other, "No memory for {} bytes", size)
        }
    }

    struct ShortHost;
    impl HostMemory for ShortHost {
        fn acquire(&mut self, size: usize) -> Result<Vec<u8>> {
            Ok(vec![0; size / 2])
        }
    }

    #[test]
    fn create_works() -> TestResult {
        let pool = track!(PoolBuilder::new().create(64))?;
        assert_eq!(pool.capacity(), 64);

        let blocks = track!(pool.blocks().collect::<Result<Vec<_>>>())?;
        assert_eq!(
            blocks,
            vec![BlockInfo::new(Offset::ZERO, BlockHeader::free(56))]
        );
        assert_eq!(pool.metrics().capacity_bytes(), 64);
        Ok(())
    }

    #[test]
    fn instance_id_works() -> TestResult {
        let id = Uuid::new_v4();
        let pool = track!(PoolBuilder::new().instance_id(id).create(64))?;
        assert_eq!(pool.instance_id(), id);
        Ok(())
    }

    #[test]
    fn too_small_pool() {
        for &size in &[0, 1, HEADER_SIZE] {
            let e = PoolBuilder::new().create(size).err();
            assert_eq!(e.map(|e| *e.kind()), Some(ErrorKind::InvalidInput));
        }
        assert!(PoolBuilder::new().create(HEADER_SIZE + 1).is_ok());
    }

    #[test]
    fn too_small_pool_never_contacts_host() {
        // ホストに問い合わせる前に拒否されるので、パニックしない
        let e = PoolBuilder::new()
            .create_with_host(&mut RefusingHost, HEADER_SIZE)
            .err();
        assert_eq!(e.map(|e| *e.kind()), Some(ErrorKind::InvalidInput));
    }

    #[test]
    #[should_panic(expected = "could not get 1024 bytes from the host")]
    fn bootstrap_failure_is_fatal() {
        let _ = PoolBuilder::new().create_with_host(&mut RefusingHost, 1024);
    }

    #[test]
    #[should_panic(expected = "could not get 1024 bytes from the host")]
    fn short_region_is_fatal() {
        let _ = PoolBuilder::new().create_with_host(&mut ShortHost, 1024);
    }
}
