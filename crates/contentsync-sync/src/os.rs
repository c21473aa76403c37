//! Platform hints for one-pass sequential reads
//!
//! Comparison reads every byte of a file exactly once, so the page cache
//! gains nothing from keeping those pages around. Each platform gets the
//! closest hint it offers; where none exists the file is opened normally.

use std::fs::File;
use std::io;
use std::path::Path;

/// Open a file for a single front-to-back read
pub fn open_sequential(path: &Path) -> io::Result<File> {
    #[cfg(windows)]
    {
        use std::os::windows::fs::OpenOptionsExt;
        const FILE_FLAG_SEQUENTIAL_SCAN: u32 = 0x0800_0000;
        std::fs::OpenOptions::new()
            .read(true)
            .custom_flags(FILE_FLAG_SEQUENTIAL_SCAN)
            .open(path)
    }
    #[cfg(not(windows))]
    {
        let file = File::open(path)?;
        advise(&file, Advice::Sequential);
        Ok(file)
    }
}

/// Tell the OS the pages read from `file` will not be needed again
pub fn release_cached_pages(file: &File) {
    #[cfg(not(windows))]
    advise(file, Advice::DontNeed);
    #[cfg(windows)]
    let _ = file;
}

#[cfg(not(windows))]
#[derive(Clone, Copy)]
enum Advice {
    Sequential,
    DontNeed,
}

#[cfg(target_os = "linux")]
fn advise(file: &File, advice: Advice) {
    use std::os::unix::io::AsRawFd;

    let advice = match advice {
        Advice::Sequential => libc::POSIX_FADV_SEQUENTIAL,
        Advice::DontNeed => libc::POSIX_FADV_DONTNEED,
    };
    // SAFETY: the descriptor is owned by `file` and stays open for the call
    let result = unsafe { libc::posix_fadvise(file.as_raw_fd(), 0, 0, advice) };
    if result != 0 {
        tracing::trace!("posix_fadvise failed with code {}", result);
    }
}

#[cfg(all(not(windows), not(target_os = "linux")))]
fn advise(_file: &File, _advice: Advice) {}
