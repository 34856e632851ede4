//! Whole-image transfers
//!
//! These functions stream an image to or from the device one page at a
//! time. They stop at the first failure and leave the device as it is;
//! there is no rollback.

use dcflash_core::geometry::{pages, PAGE_COUNT, PAGE_SIZE};

use crate::device::Loader;
use crate::error::{LoaderError, Result};
use crate::transport::Transport;

/// Progress callbacks for page transfers
///
/// All methods have empty default implementations.
pub trait FlashProgress {
    /// A transfer of `total_pages` pages is starting
    fn start(&mut self, _phase: Phase, _total_pages: usize) {}

    /// One page was transferred; `done` pages so far
    fn page_done(&mut self, _page: u16, _done: usize) {}

    /// The transfer finished successfully
    fn finish(&mut self, _phase: Phase) {}
}

/// Kind of transfer being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Writing pages
    Writing,
    /// Reading pages back for comparison
    Verifying,
    /// Reading pages
    Reading,
}

/// Progress reporter that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl FlashProgress for NoProgress {}

/// Statistics about a completed transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashStats {
    /// First page touched
    pub start_page: u16,
    /// Number of pages transferred
    pub pages: usize,
    /// Number of bytes transferred
    pub bytes: usize,
}

/// Check that `count` pages starting at `start_page` exist on the device
fn check_range(start_page: u16, count: usize) -> Result<()> {
    let start = start_page as usize;
    match start.checked_add(count) {
        Some(end) if end <= PAGE_COUNT => Ok(()),
        _ => Err(LoaderError::OutOfRange {
            start,
            end: start.saturating_add(count),
            limit: PAGE_COUNT,
        }),
    }
}

/// Write `image` to consecutive pages starting at `start_page`
///
/// The image is cut into `PAGE_SIZE` chunks; a trailing partial chunk is
/// written as a short page. The first failing page aborts the transfer.
pub fn flash_image<T: Transport>(
    loader: &mut Loader<T>,
    image: &[u8],
    start_page: u16,
    progress: &mut dyn FlashProgress,
) -> Result<FlashStats> {
    let total = image.len().div_ceil(PAGE_SIZE);
    check_range(start_page, total)?;

    if image.len() % PAGE_SIZE != 0 {
        log::warn!(
            "Image size {} is not a multiple of the page size, last page is partial",
            image.len()
        );
    }

    log::info!("Writing {} pages starting at page {}", total, start_page);
    progress.start(Phase::Writing, total);

    for (i, chunk) in pages(image).enumerate() {
        // Range already checked against PAGE_COUNT
        let page = start_page + i as u16;
        loader.write_page(page, chunk)?;
        progress.page_done(page, i + 1);
    }

    progress.finish(Phase::Writing);

    Ok(FlashStats {
        start_page,
        pages: total,
        bytes: image.len(),
    })
}

/// Read back the pages covered by `image` and compare them
///
/// A trailing partial chunk is compared against the start of its page.
pub fn verify_image<T: Transport>(
    loader: &mut Loader<T>,
    image: &[u8],
    start_page: u16,
    progress: &mut dyn FlashProgress,
) -> Result<FlashStats> {
    let total = image.len().div_ceil(PAGE_SIZE);
    check_range(start_page, total)?;

    log::info!("Verifying {} pages starting at page {}", total, start_page);
    progress.start(Phase::Verifying, total);

    for (i, chunk) in pages(image).enumerate() {
        let page = start_page + i as u16;
        let data = loader.read_page(page)?;
        if data[..chunk.len()] != *chunk {
            return Err(LoaderError::VerifyMismatch { page });
        }
        progress.page_done(page, i + 1);
    }

    progress.finish(Phase::Verifying);

    Ok(FlashStats {
        start_page,
        pages: total,
        bytes: image.len(),
    })
}

/// Read `count` consecutive pages starting at `start_page`
pub fn read_pages<T: Transport>(
    loader: &mut Loader<T>,
    start_page: u16,
    count: usize,
    progress: &mut dyn FlashProgress,
) -> Result<Vec<u8>> {
    check_range(start_page, count)?;

    log::info!("Reading {} pages starting at page {}", count, start_page);
    progress.start(Phase::Reading, count);

    let mut out = Vec::with_capacity(count * PAGE_SIZE);
    for i in 0..count {
        let page = start_page + i as u16;
        out.extend_from_slice(&loader.read_page(page)?);
        progress.page_done(page, i + 1);
    }

    progress.finish(Phase::Reading);
    Ok(out)
}
