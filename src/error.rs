use trackable::error::ErrorKindExt;

/// crate固有のエラー型.
#[derive(Debug, Clone, TrackableError)]
pub struct Error(trackable::error::TrackableError<ErrorKind>);
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        if let Some(e) = e.get_ref().and_then(|e| e.downcast_ref::<Error>()).cloned() {
            e
        } else if e.kind() == std::io::ErrorKind::InvalidInput {
            ErrorKind::InvalidInput.cause(e).into()
        } else if e.kind() == std::io::ErrorKind::UnexpectedEof {
            // ヘッダの読み込み途中でアリーナの終端に達した
            ErrorKind::InconsistentState.cause(e).into()
        } else {
            ErrorKind::Other.cause(e).into()
        }
    }
}
impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        if *e.kind() == ErrorKind::InvalidInput {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
        } else {
            std::io::Error::new(std::io::ErrorKind::Other, e)
        }
    }
}

/// 発生し得るエラーの種別.
///
/// なお、空き領域不足による割当失敗はエラーとしては扱われない.
/// その場合には[`PoolAllocator::allocate`]が`Ok(None)`を返す.
///
/// [`PoolAllocator::allocate`]: ./pool/struct.PoolAllocator.html#method.allocate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 入力が不正.
    ///
    /// 以下のような場合に、このエラーが返される:
    ///
    /// - ヘッダ一つ分も収まらないサイズでプールを作成しようとした
    /// - 別のプールが発行したハンドルが渡された
    /// - ブロックの先頭を指していないハンドルが渡された
    /// - 解放済みのハンドルが再度解放された、あるいは参照された
    ///
    /// # 典型的な対応策
    ///
    /// - 利用者側のプログラムを修正して入力を正しくする
    InvalidInput,

    /// 内部状態が不整合に陥っている.
    ///
    /// ヘッダの連鎖がアリーナをちょうど覆っていない、未知の占有フラグが書き込まれている、等.
    /// プログラムにバグがあることを示している.
    ///
    /// # 典型的な対応策
    ///
    /// - 以後はそのプールインスタンスの使用を中止する
    /// - バグ修正を行ってプログラムを更新する
    InconsistentState,

    /// その他エラー.
    ///
    /// E.g., ホスト環境からメモリを確保できなかった
    Other,
}
impl trackable::error::ErrorKind for ErrorKind {}
