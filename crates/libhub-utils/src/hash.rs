use std::{fs::File, io, path::Path};

use sha2::{Digest, Sha256};

use crate::error::{HashError, HashResult};

/// Prefix carried by every checksum written to the catalog and the index.
pub const CHECKSUM_PREFIX: &str = "SHA-256:";

/// Calculates the SHA-256 checksum of a file.
///
/// The file is streamed through the hasher, so archives of any size are handled without
/// loading them into memory. The result is formatted as `SHA-256:<lowercase hex>`.
///
/// # Errors
///
/// * [`HashError::ReadFailed`] if the file cannot be opened or read.
///
/// # Example
///
/// ```no_run
/// use libhub_utils::error::HashResult;
/// use libhub_utils::hash::calculate_checksum;
///
/// fn main() -> HashResult<()> {
///     let checksum = calculate_checksum("/path/to/archive.zip")?;
///     println!("Checksum is {}", checksum);
///     Ok(())
/// }
/// ```
pub fn calculate_checksum<P: AsRef<Path>>(file_path: P) -> HashResult<String> {
    let file_path = file_path.as_ref();
    let read_failed = |err| {
        HashError::ReadFailed {
            path: file_path.to_path_buf(),
            source: err,
        }
    };

    let mut file = File::open(file_path).map_err(read_failed)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(read_failed)?;

    Ok(format!("{CHECKSUM_PREFIX}{}", hex::encode(hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    const HELLO_SHA256: &str =
        "SHA-256:a948904f2f0f479b8f8197694b30184b0d2ed1c1cd2a1ec0fb85d299a192a447";

    #[test]
    fn test_calculate_checksum() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("hello.txt");
        fs::write(&file, "hello world\n").unwrap();

        assert_eq!(calculate_checksum(&file).unwrap(), HELLO_SHA256);
    }

    #[test]
    fn test_calculate_checksum_empty_file() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("empty");
        fs::write(&file, "").unwrap();

        assert_eq!(
            calculate_checksum(&file).unwrap(),
            "SHA-256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_calculate_checksum_missing_file() {
        let result = calculate_checksum("/this/path/does/not/exist");
        assert!(matches!(result, Err(HashError::ReadFailed { .. })));
    }
}
