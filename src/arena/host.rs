use trackable::error::ErrorKindExt;

use crate::{ErrorKind, Result};

/// アリーナの確保元となるホスト環境を表すトレイト.
///
/// プールの初期化時に一度だけ呼び出される.
/// 返却は、確保されたバイト列を破棄することで行われる.
pub trait HostMemory {
    /// `size`バイトのゼロ初期化されたバイト列を確保する.
    ///
    /// # Errors
    ///
    /// ホスト環境が要求サイズのメモリを供給できない場合にはエラーを返す.
    fn acquire(&mut self, size: usize) -> Result<Vec<u8>>;
}

/// プロセスのヒープからアリーナを確保する`HostMemory`の実装.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMemory {
    _private: (),
}
impl SystemMemory {
    /// 新しい`SystemMemory`インスタンスを生成する.
    pub fn new() -> Self {
        SystemMemory { _private: () }
    }
}
impl HostMemory for SystemMemory {
    fn acquire(&mut self, size: usize) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        // 確保失敗時にプロセスを即座に終了させずに済むよう`try_reserve_exact`を使う
        if let Err(e) = bytes.try_reserve_exact(size) {
            return Err(ErrorKind::Other
                .cause(format!("Cannot get {} bytes from the system: {}", size, e))
                .into());
        }
        bytes.resize(size, 0);
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use trackable::result::TestResult;

    use super::*;

    #[test]
    fn it_works() -> TestResult {
        let bytes = track!(SystemMemory::new().acquire(100))?;
        assert_eq!(bytes.len(), 100);
        assert!(bytes.iter().all(|&b| b == 0));
        Ok(())
    }

    #[test]
    fn capacity_overflow() {
        let e = SystemMemory::new().acquire(std::usize::MAX).err();
        assert_eq!(e.map(|e| *e.kind()), Some(ErrorKind::Other));
    }
}
