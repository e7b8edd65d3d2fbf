//! Spatial tags for the proxy sweep.
//!
//! A particle's grid cell is packed into one 32-bit tag, y-cell in the high
//! bits and x-cell in the low bits, both biased so that unsigned ordering of
//! tags equals row-major ordering of cells. Sorting proxies by tag therefore
//! turns "enumerate neighboring cells" into a handful of range scans.

/// Bits of the x cell coordinate kept in a tag.
pub const X_TRUNC_BITS: u32 = 12;
/// Bits of the y cell coordinate kept in a tag.
pub const Y_TRUNC_BITS: u32 = 12;
const TAG_BITS: u32 = 32;
/// Signed bias added to the y cell.
pub const Y_OFFSET: u32 = 1 << (Y_TRUNC_BITS - 1);
/// Shift that positions the y cell in the high bits.
pub const Y_SHIFT: u32 = TAG_BITS - Y_TRUNC_BITS;
/// Shift that positions the x cell above its sub-cell fraction bits.
pub const X_SHIFT: u32 = TAG_BITS - Y_TRUNC_BITS - X_TRUNC_BITS;
/// Scale applied to the x coordinate before truncation.
pub const X_SCALE: u32 = 1 << X_SHIFT;
/// Signed bias added to the scaled x cell.
pub const X_OFFSET: u32 = X_SCALE * (1 << (X_TRUNC_BITS - 1));

/// Sortable (index, tag) pair; the proxy array sorted by tag is the entire
/// spatial index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Proxy {
    pub index: usize,
    pub tag: u32,
}

/// Pack a position, given in units of the particle diameter, into a tag.
#[inline]
pub fn compute_tag(x: f32, y: f32) -> u32 {
    (((y + Y_OFFSET as f32) as u32) << Y_SHIFT).wrapping_add((X_SCALE as f32 * x + X_OFFSET as f32) as u32)
}

/// Tag of the cell `(x, y)` cells away from `tag`'s cell.
#[inline]
pub fn compute_relative_tag(tag: u32, x: i32, y: i32) -> u32 {
    tag.wrapping_add((y << Y_SHIFT) as u32)
        .wrapping_add((x << X_SHIFT) as u32)
}

/// First position in the sorted proxy array whose tag is >= `tag`.
#[inline]
pub fn lower_bound(proxies: &[Proxy], tag: u32) -> usize {
    proxies.partition_point(|p| p.tag < tag)
}

/// First position in the sorted proxy array whose tag is > `tag`.
#[inline]
pub fn upper_bound(proxies: &[Proxy], tag: u32) -> usize {
    proxies.partition_point(|p| p.tag <= tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_order_row_major() {
        let origin = compute_tag(0.25, 0.25);
        assert!(compute_tag(1.25, 0.25) > origin, "right neighbor sorts after");
        assert!(compute_tag(-0.75, 0.25) < origin, "left neighbor sorts before");
        assert!(compute_tag(0.25, 1.25) > origin, "row below sorts after");
        assert!(
            compute_tag(100.25, 0.25) < compute_tag(-100.75, 1.25),
            "any cell in a row sorts before any cell in the next row"
        );
    }

    #[test]
    fn relative_tag_matches_direct_computation() {
        // Quarter-cell positions make the float-to-int truncation exact.
        for &(x, y) in &[(0.25, 0.25), (-3.75, 2.25), (17.25, -8.75)] {
            let tag = compute_tag(x, y);
            for &(dx, dy) in &[(1, 0), (-1, 1), (1, 1), (0, -1)] {
                assert_eq!(
                    compute_relative_tag(tag, dx, dy),
                    compute_tag(x + dx as f32, y + dy as f32),
                    "offset ({dx},{dy}) from ({x},{y})"
                );
            }
        }
    }

    #[test]
    fn bounds_bracket_equal_tags() {
        let proxies: Vec<Proxy> = [1u32, 3, 3, 3, 7]
            .iter()
            .enumerate()
            .map(|(index, &tag)| Proxy { index, tag })
            .collect();
        assert_eq!(lower_bound(&proxies, 3), 1);
        assert_eq!(upper_bound(&proxies, 3), 4);
        assert_eq!(lower_bound(&proxies, 0), 0);
        assert_eq!(upper_bound(&proxies, 9), 5);
    }
}
