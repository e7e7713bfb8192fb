//! [Prometheus][prometheus]用のメトリクス.
//!
//! [prometheus]: https://prometheus.io/
use prometrics::metrics::{Counter, Gauge, MetricBuilder};

/// [`PoolAllocator`]のメトリクス.
///
/// [`PoolAllocator`]: ../pool/struct.PoolAllocator.html
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub(crate) capacity_bytes: Gauge,
    pub(crate) allocations: Counter,
    pub(crate) allocated_bytes: Counter,
    pub(crate) frees: Counter,
    pub(crate) freed_bytes: Counter,
    pub(crate) nospace_failures: Counter,
    pub(crate) coalesced_blocks: Counter,
    pub(crate) invalid_frees: Counter,
}
impl PoolMetrics {
    /// アリーナの容量(ヘッダ領域を含む).
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// poolalloc_pool_capacity_bytes <GAUGE>
    /// ```
    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes.value() as u64
    }

    /// 割当に成功した回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// poolalloc_pool_allocations_total <COUNTER>
    /// ```
    pub fn allocations(&self) -> u64 {
        self.allocations.value() as u64
    }

    /// これまでに割り当てたペイロードのバイト数.
    ///
    /// 要求サイズではなく、実際に割り当てられたブロックのペイロードサイズで計上される.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// poolalloc_pool_allocated_bytes_total <COUNTER>
    /// ```
    pub fn allocated_bytes(&self) -> u64 {
        self.allocated_bytes.value() as u64
    }

    /// 解放に成功した回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// poolalloc_pool_frees_total <COUNTER>
    /// ```
    pub fn frees(&self) -> u64 {
        self.frees.value() as u64
    }

    /// これまでに解放されたペイロードのバイト数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// poolalloc_pool_freed_bytes_total <COUNTER>
    /// ```
    pub fn freed_bytes(&self) -> u64 {
        self.freed_bytes.value() as u64
    }

    /// 使用中のペイロードのバイト数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// poolalloc_pool_allocated_bytes_total - poolalloc_pool_freed_bytes_total
    /// ```
    pub fn usage_bytes(&self) -> u64 {
        // NOTE: 以下の順番で値を取得しないとアンダーフローする可能性がある
        let dec = self.freed_bytes();
        let inc = self.allocated_bytes();
        inc - dec
    }

    /// 現在使用中のブロック数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// poolalloc_pool_allocations_total - poolalloc_pool_frees_total
    /// ```
    pub fn live_allocations(&self) -> u64 {
        let dec = self.frees();
        let inc = self.allocations();
        inc - dec
    }

    /// 空き領域不足による割当失敗回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// poolalloc_pool_nospace_failures_total <COUNTER>
    /// ```
    pub fn nospace_failures(&self) -> u64 {
        self.nospace_failures.value() as u64
    }

    /// 結合によって消滅したブロックの数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// poolalloc_pool_coalesced_blocks_total <COUNTER>
    /// ```
    pub fn coalesced_blocks(&self) -> u64 {
        self.coalesced_blocks.value() as u64
    }

    /// 不正なハンドル(解放済み、別プールのもの、等)による解放要求の回数.
    ///
    /// # Prometheus
    ///
    /// ```prometheus
    /// poolalloc_pool_invalid_frees_total <COUNTER>
    /// ```
    pub fn invalid_frees(&self) -> u64 {
        self.invalid_frees.value() as u64
    }

    pub(crate) fn new(builder: &MetricBuilder) -> Self {
        let mut builder = builder.clone();
        builder.namespace("poolalloc").subsystem("pool");
        PoolMetrics {
            capacity_bytes: builder
                .gauge("capacity_bytes")
                .help("Capacity of the arena")
                .finish()
                .expect("Never fails"),
            allocations: builder
                .counter("allocations_total")
                .help("Number of successful allocations")
                .finish()
                .expect("Never fails"),
            allocated_bytes: builder
                .counter("allocated_bytes_total")
                .help("Number of allocated payload bytes")
                .finish()
                .expect("Never fails"),
            frees: builder
                .counter("frees_total")
                .help("Number of successful frees")
                .finish()
                .expect("Never fails"),
            freed_bytes: builder
                .counter("freed_bytes_total")
                .help("Number of freed payload bytes")
                .finish()
                .expect("Never fails"),
            nospace_failures: builder
                .counter("nospace_failures_total")
                .help("Number of allocation failures caused by no available space")
                .finish()
                .expect("Never fails"),
            coalesced_blocks: builder
                .counter("coalesced_blocks_total")
                .help("Number of blocks absorbed by coalescing")
                .finish()
                .expect("Never fails"),
            invalid_frees: builder
                .counter("invalid_frees_total")
                .help("Number of rejected frees")
                .finish()
                .expect("Never fails"),
        }
    }

    pub(crate) fn count_allocation(&self, payload_size: u32) {
        self.allocations.increment();
        self.allocated_bytes.add_u64(u64::from(payload_size));
    }

    pub(crate) fn count_free(&self, payload_size: u32) {
        self.frees.increment();
        self.freed_bytes.add_u64(u64::from(payload_size));
    }
}
