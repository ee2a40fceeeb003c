use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use shared_memory::{Shmem, ShmemConf, ShmemError};

use crate::error::ChannelError;

/// The chunk header prefixing the shared data window: a byte count, a
/// completion flag, and a reserved byte repurposed here to carry the abort
/// signal (see `DESIGN.md`). `repr(C)` rounds this up to 8 bytes to keep
/// `bytes_written` naturally aligned for atomic access — the window still
/// starts immediately after whatever `HEADER_SIZE` actually is, so the
/// `W = page - header` invariant holds exactly regardless.
#[repr(C)]
struct Header {
    bytes_written: AtomicU32,
    message_completed: AtomicU8,
    aborted: AtomicU8,
}

const HEADER_SIZE: usize = std::mem::size_of::<Header>();

/// One system page of shared memory: a fixed header followed by a data
/// window sized to fill the remainder of the page.
pub(crate) struct SharedRegion {
    shmem: Shmem,
    window_len: usize,
}

unsafe impl Send for SharedRegion {}
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    pub fn create_or_open(channel_name: &str) -> Result<Self, ChannelError> {
        let page = msgchan_utils::page::page_size();
        if page <= HEADER_SIZE {
            return Err(ChannelError::InvalidArgument(format!(
                "system page size {page} is too small to hold a {HEADER_SIZE}-byte chunk header"
            )));
        }

        // Per spec.md §6, the region is keyed on the bare channel name; only
        // the four named events add a suffix.
        let shmem = match ShmemConf::new().size(page).os_id(channel_name).create() {
            Ok(shmem) => shmem,
            Err(ShmemError::MappingIdExists) => {
                let shmem = ShmemConf::new().os_id(channel_name).open()?;
                if shmem.len() != page {
                    return Err(ChannelError::FramingMismatch(format!(
                        "shared region {channel_name:?} is {} bytes, expected {page} \
                         (system page size mismatch between peers)",
                        shmem.len()
                    )));
                }
                shmem
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self { window_len: page - HEADER_SIZE, shmem })
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    fn header(&self) -> &Header {
        unsafe { &*self.shmem.as_ptr().cast::<Header>() }
    }

    /// Raw pointer to the start of the data window. Callers are responsible
    /// for honoring the hand-off protocol before reading or writing through
    /// it; this is shared memory, not a value this process exclusively owns.
    fn window_ptr(&self) -> *mut u8 {
        unsafe { self.shmem.as_ptr().add(HEADER_SIZE) }
    }

    pub fn read_window(&self, len: usize, out: &mut [u8]) {
        msgchan_utils::safe_assert!(len <= self.window_len);
        let src = unsafe { std::slice::from_raw_parts(self.window_ptr(), len) };
        out[..len].copy_from_slice(src);
    }

    /// Writes `data` into the window starting at byte offset `at`. Used to
    /// stage bytes into a chunk across several `Write::write` calls before
    /// the chunk is full enough to publish.
    pub fn write_window_at(&self, at: usize, data: &[u8]) {
        msgchan_utils::safe_assert!(at + data.len() <= self.window_len);
        let dst = unsafe { std::slice::from_raw_parts_mut(self.window_ptr().add(at), data.len()) };
        dst.copy_from_slice(data);
    }

    pub fn bytes_written(&self) -> u32 {
        self.header().bytes_written.load(Ordering::Acquire)
    }

    pub fn message_completed(&self) -> bool {
        self.header().message_completed.load(Ordering::Acquire) != 0
    }

    pub fn aborted(&self) -> bool {
        self.header().aborted.load(Ordering::Acquire) != 0
    }

    /// Publishes a chunk header. Must be called only after the chunk's bytes
    /// have been written into the window: the Release store makes those
    /// bytes visible to a peer that observes the new header with Acquire.
    pub fn publish(&self, bytes_written: u32, completed: bool, aborted: bool) {
        msgchan_utils::safe_assert!(bytes_written as usize <= self.window_len);
        let header = self.header();
        header.bytes_written.store(bytes_written, Ordering::Release);
        header.aborted.store(aborted as u8, Ordering::Release);
        header.message_completed.store(completed as u8, Ordering::Release);
    }
}
