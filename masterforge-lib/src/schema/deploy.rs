//! Deploy-target filtering.
//!
//! A deploy mask is a small bitmask declaring which build targets a table or
//! field belongs to. A mask of `0` means "every target".

/// Mask value meaning "every target".
pub const ALL_TARGETS: u32 = 0;

/// Query bit that selects everything regardless of mask, used for whole-schema work.
pub const EVERY_TARGET: u32 = u32::MAX;

/// Returns `true` if something declared with `mask` belongs in the build for `target_bit`.
///
/// `target_bit` may itself be a combination of bits, in which case any overlap counts.
#[must_use]
pub const fn should_include(mask: u32, target_bit: u32) -> bool {
    mask == ALL_TARGETS || (mask & target_bit) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_mask_includes_every_target() {
        for bit in [0, 1, 2, 4, 3, 7, u32::MAX] {
            assert!(should_include(0, bit));
        }
    }

    #[test]
    fn test_nonzero_mask_is_bitwise_overlap() {
        for mask in 1..16u32 {
            for bit in [1u32, 2, 4, 8, 3, 6] {
                assert_eq!(should_include(mask, bit), (mask & bit) != 0, "mask={mask} bit={bit}");
            }
        }
    }

    #[test]
    fn test_composite_mask() {
        // client + server, but not tools
        let mask = 1 | 2;
        assert!(should_include(mask, 1));
        assert!(should_include(mask, 2));
        assert!(!should_include(mask, 4));
    }

    #[test]
    fn test_every_target_query_bit() {
        for mask in [0, 1, 2, 4, 6, 0x8000_0000] {
            assert!(should_include(mask, EVERY_TARGET));
        }
    }
}
