use std::fs;
use std::io::{Read, Write};

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::{RemoteResource, Source, Species};
use crate::error::LrtError;

pub trait CdsPortal: Send + Sync {
    fn source(&self) -> Source;

    fn list_resources(
        &self,
        suffix: &str,
        allow_list: &[Species],
    ) -> Result<Vec<RemoteResource>, LrtError>;

    fn fetch_to_file(&self, url: &str, dest: &Utf8Path) -> Result<(), LrtError>;
}

const STREAM_CHUNK: usize = 8 * 1024;

// Streams the body to `<dest>.part` and renames only once the stream is
// complete, so a crash mid-transfer never leaves a finished-looking file.
pub(crate) fn stream_to_file(mut body: impl Read, dest: &Utf8Path) -> Result<(), LrtError> {
    let part = Utf8PathBuf::from(format!("{dest}.part"));
    let mut file = fs::File::create(part.as_std_path())
        .map_err(|err| LrtError::Filesystem(format!("create {part}: {err}")))?;
    let mut buf = vec![0u8; STREAM_CHUNK];
    loop {
        let read = body
            .read(&mut buf)
            .map_err(|err| LrtError::Filesystem(format!("stream to {part}: {err}")))?;
        if read == 0 {
            break;
        }
        file.write_all(&buf[..read])
            .map_err(|err| LrtError::Filesystem(format!("write {part}: {err}")))?;
    }
    file.flush()
        .map_err(|err| LrtError::Filesystem(format!("flush {part}: {err}")))?;
    drop(file);
    fs::rename(part.as_std_path(), dest.as_std_path())
        .map_err(|err| LrtError::Filesystem(format!("rename {part} -> {dest}: {err}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_replaces_existing_file_and_leaves_no_part() {
        let temp = tempfile::tempdir().unwrap();
        let dest = Utf8PathBuf::from_path_buf(temp.path().join("archive.fa.gz")).unwrap();
        fs::write(dest.as_std_path(), b"stale").unwrap();

        stream_to_file(&b"fresh bytes"[..], &dest).unwrap();

        assert_eq!(fs::read(dest.as_std_path()).unwrap(), b"fresh bytes");
        assert!(!temp.path().join("archive.fa.gz.part").exists());
    }
}
