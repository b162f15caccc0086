// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Sound index table at the start of the flash.
//!
//! ```text
//! 0x000000  0xFE                       header
//! 0x000001  00 04 00                   entry 0: start of clip 1
//! 0x000004  hi mid lo                  entry 1: end of clip 1
//! ...                                  entry k: end of clip k
//!           FF FF FF                   first unwritten entry
//! ```
//!
//! Clip `n` spans from entry `n - 1` (moved to the next block boundary for `n > 1`) up to, but
//! not including, entry `n`.

use crate::config::store::{BASE, INDEX_MARKER, TOP};
use crate::drivers::{Address, SerialFlash};

const ENTRY_SIZE: u32 = 3;
const ERASED: u8 = 0xFF;

/// Flash address of index entry `n`.
#[inline]
pub fn entry_address(n: u8) -> Address {
    Address::new(n as u32 * ENTRY_SIZE + 1)
}

pub fn read_entry<F: SerialFlash>(flash: &mut F, n: u8) -> Result<Address, F::Error> {
    let mut bytes = [0u8; 3];
    flash.read(entry_address(n), &mut bytes)?;
    Ok(Address::from_bytes(bytes))
}

pub fn write_entry<F: SerialFlash>(flash: &mut F, n: u8, addr: Address) -> Result<(), F::Error> {
    let at = entry_address(n);
    for (i, b) in addr.to_bytes().into_iter().enumerate() {
        flash.program_byte(at.offset(i as u32), b)?;
    }
    Ok(())
}

/// Number of clips: written entries minus the base entry.
pub fn count_clips<F: SerialFlash>(flash: &mut F) -> Result<u8, F::Error> {
    let mut entries: u16 = 0;
    while entries <= u8::MAX as u16 {
        if flash.read_byte(entry_address(entries as u8))? == ERASED {
            break;
        }
        entries += 1;
    }
    Ok(entries.saturating_sub(1).min(u8::MAX as u16) as u8)
}

/// Write the header and base entry of an empty table. The flash must be erased.
pub fn format<F: SerialFlash>(flash: &mut F) -> Result<(), F::Error> {
    flash.program_byte(Address::new(0), INDEX_MARKER)?;
    write_entry(flash, 0, Address::new(BASE))
}

/// Address range `[start, end)` of clip `n`, or `None` if the clip does not exist or its
/// entries are inconsistent.
pub fn clip_range<F: SerialFlash>(
    flash: &mut F,
    clips: u8,
    n: u8,
) -> Result<Option<(Address, Address)>, F::Error> {
    if clips == 0 || n == 0 || n > clips {
        return Ok(None);
    }

    let mut raw = [0u8; 6];
    flash.read(entry_address(n - 1), &mut raw)?;
    let mut start = Address::from_bytes([raw[0], raw[1], raw[2]]);
    let end = Address::from_bytes([raw[3], raw[4], raw[5]]);
    if n > 1 {
        start = start.next_block();
    }

    let valid = start.value() <= TOP
        && end.value() <= TOP
        && start.value() >= BASE
        && end.value() >= BASE
        && end > start;
    Ok(valid.then_some((start, end)))
}

/// Clip count and last used block, as reported in `SOUND_VAR`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Catalog {
    pub clips: u8,
    pub last_block: u8,
}

impl Catalog {
    /// Read the catalog from the table.
    pub fn load<F: SerialFlash>(flash: &mut F) -> Result<Self, F::Error> {
        let clips = count_clips(flash)?;
        let last_block = if clips == 0 {
            0
        } else {
            read_entry(flash, clips)?.block()
        };
        Ok(Self { clips, last_block })
    }
}
