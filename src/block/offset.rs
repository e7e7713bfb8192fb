use std::fmt;

/// アリーナ内の位置を表すバイト単位のオフセット.
///
/// アリーナの容量は[`BlockHeader`]のサイズフィールドと同じ32bit幅に制限されているため、
/// オフセットも32bit幅で表現される.
///
/// 算術演算は全て検査付きで、範囲外となる場合には`None`が返される.
///
/// [`BlockHeader`]: ./struct.BlockHeader.html
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Default)]
pub struct Offset(u32);
impl Offset {
    /// 取り得るオフセットの最大値.
    pub const MAX: u32 = std::u32::MAX;

    /// アリーナの先頭位置.
    pub const ZERO: Offset = Offset(0);

    /// オフセットの値を返す.
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// オフセットの値を`u64`に変換して返す.
    pub fn as_u64(self) -> u64 {
        u64::from(self.0)
    }

    /// オフセットの値を`usize`に変換して返す.
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// `value`を対応するオフセットに変換する.
    ///
    /// `value`の値が32bit以内に収まらない場合には`None`が返される.
    pub fn from_u64(value: u64) -> Option<Self> {
        if value <= u64::from(Self::MAX) {
            Some(Offset(value as u32))
        } else {
            None
        }
    }

    /// `delta`バイト後方のオフセットを返す.
    pub fn checked_add(self, delta: u32) -> Option<Self> {
        self.0.checked_add(delta).map(Offset)
    }

    /// `delta`バイト前方のオフセットを返す.
    pub fn checked_sub(self, delta: u32) -> Option<Self> {
        self.0.checked_sub(delta).map(Offset)
    }
}
impl From<u32> for Offset {
    fn from(from: u32) -> Self {
        Offset(from)
    }
}
impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        assert_eq!(Offset::from_u64(0).map(|a| a.as_u32()), Some(0));
        assert_eq!(
            Offset::from_u64(u64::from(Offset::MAX)).map(|a| a.as_u32()),
            Some(Offset::MAX)
        );
        assert_eq!(Offset::from_u64(u64::from(Offset::MAX) + 1), None);

        assert_eq!(Offset::from(10).checked_add(2), Some(Offset::from(12)));
        assert_eq!(Offset::from(10).checked_sub(2), Some(Offset::from(8)));
        assert_eq!(Offset::from(10).as_usize(), 10);
        assert_eq!(Offset::ZERO.to_string(), "0");
    }

    #[test]
    fn overflow() {
        assert_eq!(Offset::from(Offset::MAX).checked_add(1), None);
        assert_eq!(Offset::from(0).checked_sub(1), None);
    }
}
