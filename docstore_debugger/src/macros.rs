/// Generate typed accessors for a fixed struct layout read out of the
/// inspected process.  The backing `bytes` field is always read with
/// the struct's full size, so the byte ranges are in-bounds by
/// construction.
#[macro_export]
macro_rules! unpack_fields {
    (
        $name:ident: {$ty:ty, $byte_range:expr}
    ) => {
        ::paste::paste! {
            pub fn [< $name _unpacked >](
                &self,
            ) -> ::memory_probe::UnpackedValue<$ty> {
                self.bytes
                    .subrange($byte_range)
                    .unwrap()
                    .unpack()
                    .unwrap()
            }

            pub fn $name(&self) -> $ty {
                self.bytes
                    .subrange($byte_range)
                    .unwrap()
                    .unpack()
                    .unwrap()
            }
        }
    };

    (
        $(
            $name:ident: {$ty:ty, $byte_range:expr}
        ),* $(,)?
    ) => {
        $(
            unpack_fields!{$name: {$ty, $byte_range} }
        )*
    };
}
