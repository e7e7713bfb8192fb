//! Pool Allocator.
//!
//! `poolalloc`は、ホスト環境から一度だけ確保した固定長のバイト列(アリーナ)上で、
//! 可変長の領域の割当と解放を行うアロケータ.
//!
//! # 特徴
//!
//! - アリーナは「ヘッダ + ペイロード」からなるブロックの列として管理される
//!   - ヘッダは占有フラグとペイロードサイズのみを持ち、ブロックの連結はオフセット計算で導出される
//!   - 空きリスト等の補助的なデータ構造は持たない
//! - 割当はデフォルトで"BestFit"戦略(余剰が最小の空きブロックを選択)
//! - 解放の度にアリーナ全体を走査し、隣接する空きブロックを結合する
//! - アリーナへのアクセスは全て範囲検査付きのオフセット経由で行われる
//! - 二重解放や別プールのハンドルによる解放は検出されてエラーとなる
//! - スレッド安全ではない (必要なら利用者側でインスタンス全体を排他制御すること)
//!
//! # モジュールの依存関係
//!
//! ```text
//! pool => arena => block
//! ```
//!
//! - [pool]モジュール:
//!   - 主に[PoolAllocator]構造体を提供
//!   - `poolalloc`の利用者が直接触るのはこの構造体
//! - [arena]モジュール:
//!   - アリーナ本体と、その確保元となる[HostMemory]トレイトを提供
//! - [block]モジュール:
//!   - ブロックヘッダのフォーマットと、アリーナ内の位置を表す[Offset]を提供
//!
//! [pool]: ./pool/index.html
//! [PoolAllocator]: ./pool/struct.PoolAllocator.html
//! [arena]: ./arena/index.html
//! [HostMemory]: ./arena/trait.HostMemory.html
//! [block]: ./block/index.html
//! [Offset]: ./block/struct.Offset.html
#![warn(missing_docs)]
extern crate byteorder;
extern crate prometrics;
#[macro_use]
extern crate trackable;
extern crate uuid;
#[macro_use]
extern crate slog;

pub use crate::error::{Error, ErrorKind};
pub use crate::pool::{PayloadHandle, PoolAllocator, PoolBuilder};

macro_rules! track_io {
    ($expr:expr) => {
        $expr.map_err(|e: ::std::io::Error| track!(crate::Error::from(e)))
    };
}

pub mod arena;
pub mod block;
pub mod metrics;
pub mod pool;

mod error;

/// crate固有の`Result`型.
pub type Result<T> = std::result::Result<T, Error>;
