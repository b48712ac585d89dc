use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::LrtError;

const READ_CHUNK: usize = 64 * 1024;

pub fn md5_hex(path: &Path) -> Result<String, LrtError> {
    let mut file = File::open(path)
        .map_err(|err| LrtError::Filesystem(format!("open {}: {err}", path.display())))?;
    let mut context = md5::Context::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let read = file
            .read(&mut buf)
            .map_err(|err| LrtError::Filesystem(format!("read {}: {err}", path.display())))?;
        if read == 0 {
            break;
        }
        context.consume(&buf[..read]);
    }
    Ok(format!("{:x}", context.compute()))
}

pub fn matches(computed: &str, expected: &str) -> bool {
    computed.eq_ignore_ascii_case(expected.trim())
}
