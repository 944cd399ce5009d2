//! Page management for the memory engine
//!
//! Table rows and long values are packed into fixed-size slotted pages, the
//! way the Jet format lays them out on disk:
//!
//! ```text
//! +--------+-----------+------------+----------------------+-----------+
//! | header | slot[0..] | free space | ... long value data  | row data  |
//! +--------+-----------+------------+----------------------+-----------+
//! ```
//!
//! Slots grow forward from the header, record data grows backward from the
//! end of the page.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Page size in bytes (4KB)
pub const PAGE_SIZE: usize = 4096;

/// Page header size
pub const PAGE_HEADER_SIZE: usize = 8;

/// Size of one slot entry (u16 offset, u16 length)
const SLOT_SIZE: usize = 4;

/// Most records one page can address; row pointers keep the slot in one byte
pub const MAX_SLOTS: usize = 255;

/// Largest record that fits on an empty page
pub const MAX_RECORD_SIZE: usize = PAGE_SIZE - PAGE_HEADER_SIZE - SLOT_SIZE;

/// Page ID type
pub type PageId = u32;

/// Kind of records a page holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Table rows
    Data,
    /// Out-of-row OLE and memo chunks
    LongValue,
}

impl PageType {
    fn code(self) -> u8 {
        match self {
            PageType::Data => 0x01,
            PageType::LongValue => 0x02,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(PageType::Data),
            0x02 => Some(PageType::LongValue),
            _ => None,
        }
    }
}

/// Location of a record: page and slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordPointer {
    pub page_id: PageId,
    pub slot: u8,
}

impl RecordPointer {
    /// Pack as `page << 8 | slot`
    pub fn to_u32(self) -> u32 {
        (self.page_id << 8) | self.slot as u32
    }

    /// Unpack from `page << 8 | slot`
    pub fn from_u32(raw: u32) -> Self {
        Self {
            page_id: raw >> 8,
            slot: (raw & 0xff) as u8,
        }
    }
}

/// A database page
///
/// Header layout: `u32 page id`, `u8 page type`, `u8 reserved`,
/// `u16 free space offset`. The record count is the number of slots.
#[derive(Debug, Clone)]
pub struct Page {
    page_id: PageId,
    page_type: PageType,
    record_count: u16,
    free_space_offset: u16,
    data: Vec<u8>,
}

impl Page {
    /// Create a new empty page
    pub fn new(page_id: PageId, page_type: PageType) -> Self {
        let mut page = Self {
            page_id,
            page_type,
            record_count: 0,
            free_space_offset: PAGE_SIZE as u16,
            data: vec![0u8; PAGE_SIZE],
        };
        page.write_header();
        page
    }

    /// Write header to the data buffer
    fn write_header(&mut self) {
        LittleEndian::write_u32(&mut self.data[0..4], self.page_id);
        self.data[4] = self.page_type.code();
        self.data[5] = self.record_count as u8;
        LittleEndian::write_u16(&mut self.data[6..8], self.free_space_offset);
    }

    /// Parse a page from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PAGE_SIZE {
            return Err(Error::InvalidDatabase(format!(
                "page is {} bytes, expected {}",
                bytes.len(),
                PAGE_SIZE
            )));
        }

        let page_id = LittleEndian::read_u32(&bytes[0..4]);
        let page_type = PageType::from_code(bytes[4]).ok_or(Error::CorruptedPage(page_id))?;
        let record_count = bytes[5] as u16;
        let free_space_offset = LittleEndian::read_u16(&bytes[6..8]);

        let slots_end = PAGE_HEADER_SIZE + record_count as usize * SLOT_SIZE;
        if (free_space_offset as usize) < slots_end || free_space_offset as usize > PAGE_SIZE {
            return Err(Error::CorruptedPage(page_id));
        }

        Ok(Self {
            page_id,
            page_type,
            record_count,
            free_space_offset,
            data: bytes.to_vec(),
        })
    }

    /// Get page ID
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Get page type
    pub fn page_type(&self) -> PageType {
        self.page_type
    }

    /// Get record count
    pub fn record_count(&self) -> usize {
        self.record_count as usize
    }

    /// Get free space
    pub fn free_space(&self) -> usize {
        self.free_space_offset as usize - PAGE_HEADER_SIZE - self.record_count as usize * SLOT_SIZE
    }

    /// Get raw data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Insert a record into the page
    /// Returns the slot index if successful
    pub fn insert_record(&mut self, record: &[u8]) -> Option<u8> {
        let size = record.len();
        if self.record_count as usize >= MAX_SLOTS || self.free_space() < size + SLOT_SIZE {
            return None;
        }

        let slot = self.record_count;
        let offset = self.free_space_offset as usize - size;

        let slot_offset = PAGE_HEADER_SIZE + slot as usize * SLOT_SIZE;
        LittleEndian::write_u16(&mut self.data[slot_offset..slot_offset + 2], offset as u16);
        LittleEndian::write_u16(&mut self.data[slot_offset + 2..slot_offset + 4], size as u16);
        self.data[offset..offset + size].copy_from_slice(record);

        self.record_count += 1;
        self.free_space_offset = offset as u16;
        self.write_header();
        Some(slot as u8)
    }

    /// Get a record from the page by slot index
    pub fn get_record(&self, slot: u8) -> Option<&[u8]> {
        if slot as u16 >= self.record_count {
            return None;
        }

        let slot_offset = PAGE_HEADER_SIZE + slot as usize * SLOT_SIZE;
        let offset = LittleEndian::read_u16(&self.data[slot_offset..slot_offset + 2]) as usize;
        let size = LittleEndian::read_u16(&self.data[slot_offset + 2..slot_offset + 4]) as usize;

        self.data.get(offset..offset + size)
    }
}

/// All pages of one database
#[derive(Debug, Default)]
pub struct PageStore {
    pages: Vec<Page>,
}

impl PageStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record to the last page of the given type, allocating a new
    /// page when it does not fit
    pub fn append(&mut self, page_type: PageType, record: &[u8]) -> Result<RecordPointer> {
        if record.len() > MAX_RECORD_SIZE {
            return Err(Error::PageFull(self.pages.len() as PageId));
        }

        if let Some(page) = self.pages.iter_mut().rev().find(|p| p.page_type() == page_type) {
            if let Some(slot) = page.insert_record(record) {
                return Ok(RecordPointer {
                    page_id: page.page_id(),
                    slot,
                });
            }
        }

        let page_id = self.allocate_page(page_type);
        let page = &mut self.pages[page_id as usize];
        let slot = page.insert_record(record).ok_or(Error::PageFull(page_id))?;
        Ok(RecordPointer { page_id, slot })
    }

    /// Allocate a new page
    pub fn allocate_page(&mut self, page_type: PageType) -> PageId {
        let page_id = self.pages.len() as PageId;
        self.pages.push(Page::new(page_id, page_type));
        page_id
    }

    /// Get a page by ID
    pub fn get_page(&self, page_id: PageId) -> Option<&Page> {
        self.pages.get(page_id as usize)
    }

    /// Read the record a pointer refers to
    pub fn record(&self, pointer: RecordPointer) -> Option<&[u8]> {
        self.get_page(pointer.page_id)?.get_record(pointer.slot)
    }

    /// Get number of pages
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}
