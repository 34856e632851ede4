//! Image assembly

use alloc::vec::Vec;

use super::{Asset, AssetDescriptor, FormatVersion, Image, ImageHeader};
use crate::error::{Error, Result};
use crate::geometry::{
    page_count_floor, page_span, pad_with, tail_length, PaddingPolicy, PAGE_SIZE,
};

/// First page available to asset payloads (page 0 holds the header)
pub const FIRST_ASSET_PAGE: usize = 1;

/// Compute the descriptor table for `assets` without copying payloads
///
/// Assets are placed in declaration order starting at
/// [`FIRST_ASSET_PAGE`]. Each descriptor records the floor page count and
/// the tail length, while the placement cursor advances by the page span
/// (`len / PAGE_SIZE + 1`).
pub fn layout(assets: &[Asset], format: FormatVersion) -> Result<ImageHeader> {
    let max = format.max_assets();
    if assets.len() > max {
        return Err(Error::TooManyAssets {
            count: assets.len(),
            max,
        });
    }

    let mut descriptors = Vec::with_capacity(assets.len());
    let mut page = FIRST_ASSET_PAGE;

    for (index, asset) in assets.iter().enumerate() {
        let len = asset.payload.len();
        let too_large = Error::AssetTooLarge { index, len };

        let start_page = u16::try_from(page).map_err(|_| too_large)?;
        let pages = u16::try_from(page_count_floor(len)).map_err(|_| too_large)?;

        descriptors.push(AssetDescriptor {
            role: asset.role,
            weight: asset.weight,
            repeat: asset.repeat,
            start_page,
            pages,
            // Always < PAGE_SIZE
            tail_length: tail_length(len) as u16,
        });

        log::debug!(
            "asset #{}: {} bytes, role {}, start page {}, {} full page(s) + {} bytes",
            index,
            len,
            asset.role,
            start_page,
            pages,
            tail_length(len)
        );

        page += page_span(len);
    }

    Ok(ImageHeader::new(format, descriptors))
}

/// Build a complete flash image from `assets`
///
/// The output is the header page followed by every payload padded to its
/// page span, so each payload starts exactly at its descriptor's
/// `start_page`. Device capacity is not checked here; see
/// [`Image::check_capacity`].
pub fn build(assets: &[Asset], format: FormatVersion) -> Result<Image> {
    let header = layout(assets, format)?;

    let payload_pages: usize = header.descriptors.iter().map(|d| d.page_span()).sum();
    let mut data = Vec::with_capacity((1 + payload_pages) * PAGE_SIZE);
    data.extend_from_slice(&header.to_page());

    for asset in assets {
        data.extend_from_slice(&pad_with(&asset.payload, PaddingPolicy::AlwaysFill));
    }

    log::info!(
        "Built {} image: {} asset(s), {} pages ({} bytes)",
        format,
        header.asset_count(),
        data.len() / PAGE_SIZE,
        data.len()
    );

    Ok(Image { header, data })
}
