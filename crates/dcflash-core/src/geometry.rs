//! Flash geometry and page framing
//!
//! The phone stores everything on an AT45 DataFlash organised as
//! [`PAGE_COUNT`] pages of [`PAGE_SIZE`] bytes. Every unit written to flash
//! or stored in an image file is a whole page; short data is padded with
//! [`FILLER`], the erased-flash value.

use alloc::vec::Vec;

/// Bytes per flash page
pub const PAGE_SIZE: usize = 1056;

/// Number of addressable flash pages
pub const PAGE_COUNT: usize = 8192;

/// Padding byte for partially filled pages
pub const FILLER: u8 = 0xFF;

/// How to pad data up to a page boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddingPolicy {
    /// Pad only if the length is not already a page multiple
    #[default]
    Exact,
    /// Always append `PAGE_SIZE - len % PAGE_SIZE` filler bytes, so an
    /// exact multiple (including empty data) gains one whole filler page
    AlwaysFill,
}

impl PaddingPolicy {
    /// Number of filler bytes this policy appends to `len` bytes of data
    pub fn padding_for(self, len: usize) -> usize {
        let rem = len % PAGE_SIZE;
        match self {
            Self::Exact if rem == 0 => 0,
            _ => PAGE_SIZE - rem,
        }
    }
}

/// Pad `data` with [`FILLER`] up to the next page boundary
///
/// Data that already ends on a page boundary is returned unchanged.
pub fn pad_to_page(data: &[u8]) -> Vec<u8> {
    pad_with(data, PaddingPolicy::Exact)
}

/// Pad `data` with [`FILLER`] according to `policy`
pub fn pad_with(data: &[u8], policy: PaddingPolicy) -> Vec<u8> {
    let padn = policy.padding_for(data.len());
    let mut out = Vec::with_capacity(data.len() + padn);
    out.extend_from_slice(data);
    out.resize(data.len() + padn, FILLER);
    out
}

/// Number of complete pages in `len` bytes
pub const fn page_count_floor(len: usize) -> usize {
    len / PAGE_SIZE
}

/// Bytes used in the last, partial page of `len` bytes
pub const fn tail_length(len: usize) -> usize {
    len % PAGE_SIZE
}

/// Pages reserved for a payload of `len` bytes
///
/// This is `len / PAGE_SIZE + 1`: a payload always owns at least one page,
/// and one that ends exactly on a page boundary is followed by a whole
/// filler page. It matches [`PaddingPolicy::AlwaysFill`].
pub const fn page_span(len: usize) -> usize {
    (len + PAGE_SIZE) / PAGE_SIZE
}

/// Split `data` into page-sized chunks; the last one may be shorter
pub fn pages(data: &[u8]) -> core::slice::Chunks<'_, u8> {
    data.chunks(PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    const EDGE_LENGTHS: [usize; 6] = [0, 1, PAGE_SIZE - 1, PAGE_SIZE, PAGE_SIZE + 1, 3 * PAGE_SIZE];

    #[test]
    fn test_pad_is_page_aligned() {
        for len in EDGE_LENGTHS {
            let padded = pad_to_page(&vec![0x55; len]);
            assert_eq!(padded.len() % PAGE_SIZE, 0, "len {}", len);
        }
    }

    #[test]
    fn test_pad_exact_multiple_unchanged() {
        assert!(pad_to_page(&[]).is_empty());
        assert_eq!(pad_to_page(&vec![1; PAGE_SIZE]).len(), PAGE_SIZE);
        assert_eq!(pad_to_page(&vec![1; 3 * PAGE_SIZE]).len(), 3 * PAGE_SIZE);
    }

    #[test]
    fn test_pad_only_appends() {
        for len in EDGE_LENGTHS.into_iter().chain([PAGE_SIZE + 17]) {
            let data: Vec<u8> = (0..len).map(|i| (i * 7) as u8).collect();
            for policy in [PaddingPolicy::Exact, PaddingPolicy::AlwaysFill] {
                let padded = pad_with(&data, policy);
                assert_eq!(&padded[..len], &data[..], "len {} {:?}", len, policy);
                assert!(
                    padded[len..].iter().all(|&b| b == FILLER),
                    "len {} {:?}",
                    len,
                    policy
                );
            }
        }
        assert_eq!(pad_to_page(&[0; PAGE_SIZE + 17]).len(), 2 * PAGE_SIZE);
    }

    #[test]
    fn test_always_fill_adds_whole_page_on_boundary() {
        assert_eq!(pad_with(&[], PaddingPolicy::AlwaysFill).len(), PAGE_SIZE);
        assert_eq!(
            pad_with(&vec![0; PAGE_SIZE], PaddingPolicy::AlwaysFill).len(),
            2 * PAGE_SIZE
        );
        assert_eq!(pad_with(&[0; 10], PaddingPolicy::AlwaysFill).len(), PAGE_SIZE);
    }

    #[test]
    fn test_always_fill_matches_page_span() {
        for len in EDGE_LENGTHS {
            let padded = pad_with(&vec![0; len], PaddingPolicy::AlwaysFill);
            assert_eq!(padded.len(), page_span(len) * PAGE_SIZE, "len {}", len);
        }
    }

    #[test]
    fn test_page_counts() {
        assert_eq!((page_count_floor(0), tail_length(0), page_span(0)), (0, 0, 1));
        assert_eq!((page_count_floor(1), tail_length(1), page_span(1)), (0, 1, 1));
        assert_eq!(
            (page_count_floor(PAGE_SIZE - 1), tail_length(PAGE_SIZE - 1), page_span(PAGE_SIZE - 1)),
            (0, PAGE_SIZE - 1, 1)
        );
        assert_eq!(
            (page_count_floor(PAGE_SIZE), tail_length(PAGE_SIZE), page_span(PAGE_SIZE)),
            (1, 0, 2)
        );
        assert_eq!(
            (page_count_floor(PAGE_SIZE + 1), tail_length(PAGE_SIZE + 1), page_span(PAGE_SIZE + 1)),
            (1, 1, 2)
        );
    }

    #[test]
    fn test_pages_chunks() {
        let data = vec![0u8; 2 * PAGE_SIZE + 5];
        let sizes: Vec<usize> = pages(&data).map(|p| p.len()).collect();
        assert_eq!(sizes, vec![PAGE_SIZE, PAGE_SIZE, 5]);
    }
}
