/// A 32 bit quantity that can be moved over the register interface.
///
/// Words always travel little-endian on the wire. Both signed and unsigned
/// registers are supported; the conversion is a plain bit cast.
pub trait Word: Copy + Send + 'static {
    fn to_raw(self) -> u32;
    fn from_raw(raw: u32) -> Self;
}

macro_rules! impl_word {
    ($num:ty) => {
        impl Word for $num {
            #[inline]
            fn to_raw(self) -> u32 {
                u32::from_le_bytes(self.to_le_bytes())
            }

            #[inline]
            fn from_raw(raw: u32) -> Self {
                <$num>::from_le_bytes(raw.to_le_bytes())
            }
        }
    };
}

impl_word!(u32);
impl_word!(i32);

#[test]
fn signed_words_keep_their_bits() {
    assert_eq!((-1_i32).to_raw(), 0xFFFF_FFFF);
    assert_eq!(i32::from_raw(0x8000_0000), i32::MIN);
    assert_eq!(u32::from_raw(42), 42);
}
